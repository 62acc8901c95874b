use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Income {
    pub id: i64,
    pub date: NaiveDate,
    pub amount: Decimal,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewIncome {
    pub date: NaiveDate,
    pub amount: Decimal,
    pub source: String,
}

impl NewIncome {
    pub fn new(date: NaiveDate, amount: Decimal, source: &str) -> Self {
        Self {
            date,
            amount,
            source: source.to_string(),
        }
    }
}
