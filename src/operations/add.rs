use crate::db::store::{AMOUNT_INTEGER_DIGITS, AMOUNT_SCALE};
use crate::db::LedgerStore;
use crate::error::{LedgerError, LedgerResult};
use crate::models::expense::NewExpense;
use crate::models::income::NewIncome;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::str::FromStr;

const MAX_CATEGORY_LEN: usize = 50;
const MAX_NOTE_LEN: usize = 255;

pub fn parse_date(input: &str) -> LedgerResult<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").map_err(|_| {
        LedgerError::Validation(format!(
            "Invalid date '{}'. Please use YYYY-MM-DD.",
            input.trim()
        ))
    })
}

/// Parses a non-negative amount with at most four fractional digits and ten
/// integer digits, the range both backends store exactly.
pub fn parse_amount(input: &str) -> LedgerResult<Decimal> {
    let amount = Decimal::from_str(input.trim()).map_err(|_| {
        LedgerError::Validation(format!(
            "Invalid amount '{}'. Must be a valid number",
            input.trim()
        ))
    })?;
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(LedgerError::Validation(
            "Amount cannot be negative".to_string(),
        ));
    }
    if amount.normalize().scale() > AMOUNT_SCALE {
        return Err(LedgerError::Validation(format!(
            "Amount '{}' has more than {} decimal places",
            input.trim(),
            AMOUNT_SCALE
        )));
    }
    if amount >= Decimal::from(10i64.pow(AMOUNT_INTEGER_DIGITS)) {
        return Err(LedgerError::Validation(format!(
            "Amount '{}' is too large (at most {} integer digits)",
            input.trim(),
            AMOUNT_INTEGER_DIGITS
        )));
    }
    Ok(amount)
}

pub fn parse_category(input: &str) -> LedgerResult<String> {
    let category = input.trim();
    if category.is_empty() {
        return Err(LedgerError::Validation(
            "Category cannot be empty".to_string(),
        ));
    }
    if category.chars().count() > MAX_CATEGORY_LEN {
        return Err(LedgerError::Validation("Category too long".to_string()));
    }
    Ok(category.to_string())
}

fn parse_note(input: &str) -> LedgerResult<String> {
    let note = input.trim();
    if note.chars().count() > MAX_NOTE_LEN {
        return Err(LedgerError::Validation("Note too long".to_string()));
    }
    Ok(note.to_string())
}

/// Parses `date, amount, category[, note]`. The note may itself contain commas.
pub fn parse_expense(input: &str) -> LedgerResult<NewExpense> {
    let parts: Vec<&str> = input.splitn(4, ',').map(|s| s.trim()).collect();
    if parts.len() < 3 {
        return Err(LedgerError::Validation(format!(
            "Invalid number of details provided. \
             Expected at least 3 details separated by commas but got {}",
            parts.len()
        )));
    }

    let date = parse_date(parts[0])?;
    let amount = parse_amount(parts[1])?;
    let category = parse_category(parts[2])?;
    let note = parse_note(parts.get(3).copied().unwrap_or(""))?;
    Ok(NewExpense::new(date, amount, &category, &note))
}

/// Parses `date, amount[, source]`.
pub fn parse_income(input: &str) -> LedgerResult<NewIncome> {
    let parts: Vec<&str> = input.splitn(3, ',').map(|s| s.trim()).collect();
    if parts.len() < 2 {
        return Err(LedgerError::Validation(format!(
            "Invalid number of details provided. \
             Expected at least 2 details separated by commas but got {}",
            parts.len()
        )));
    }

    let date = parse_date(parts[0])?;
    let amount = parse_amount(parts[1])?;
    let source = parse_note(parts.get(2).copied().unwrap_or(""))?;
    Ok(NewIncome::new(date, amount, &source))
}

pub fn parse_id(input: &str) -> LedgerResult<i64> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(LedgerError::Validation("ID cannot be empty".to_string()));
    }
    trimmed
        .parse::<i64>()
        .map_err(|_| LedgerError::Validation(format!("Invalid ID '{}'", trimmed)))
}

pub fn add_expense_to_db(store: &dyn LedgerStore, input: &str) -> LedgerResult<i64> {
    let expense = parse_expense(input)?;
    let id = store.add_expense(&expense)?;
    tracing::info!(id, category = %expense.category, "expense added");
    Ok(id)
}

pub fn add_income_to_db(store: &dyn LedgerStore, input: &str) -> LedgerResult<i64> {
    let income = parse_income(input)?;
    let id = store.add_income(&income)?;
    tracing::info!(id, "income added");
    Ok(id)
}

pub fn edit_expense_in_db(store: &dyn LedgerStore, id_str: &str, input: &str) -> LedgerResult<()> {
    let id = parse_id(id_str)?;
    let expense = parse_expense(input)?;
    if !store.update_expense(id, &expense)? {
        return Err(LedgerError::not_found("Expense", id));
    }
    Ok(())
}

pub fn edit_income_in_db(store: &dyn LedgerStore, id_str: &str, input: &str) -> LedgerResult<()> {
    let id = parse_id(id_str)?;
    let income = parse_income(input)?;
    if !store.update_income(id, &income)? {
        return Err(LedgerError::not_found("Income", id));
    }
    Ok(())
}
