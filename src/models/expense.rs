use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Expense {
    pub id: i64,
    pub date: NaiveDate,
    pub amount: Decimal,
    pub category: String,
    pub note: String,
}

/// Field values for creating or editing an expense.
#[derive(Debug, Clone, PartialEq)]
pub struct NewExpense {
    pub date: NaiveDate,
    pub amount: Decimal,
    pub category: String,
    pub note: String,
}

impl NewExpense {
    pub fn new(date: NaiveDate, amount: Decimal, category: &str, note: &str) -> Self {
        Self {
            date,
            amount,
            category: category.to_string(),
            note: note.to_string(),
        }
    }
}
