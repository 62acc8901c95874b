use crate::db::LedgerStore;
use crate::error::{LedgerError, LedgerResult};
use crate::models::budget::BudgetPeriod;
use crate::operations::add::{parse_amount, parse_category};
use rust_decimal::Decimal;

fn parse_budget_amount(amount_str: &str) -> LedgerResult<Decimal> {
    parse_amount(amount_str).map_err(|_| {
        LedgerError::Validation(format!(
            "Invalid budget amount '{}'. Must be a non-negative number",
            amount_str.trim()
        ))
    })
}

/// Sets the budget for `category`, replacing any previous one. An empty
/// period defaults to Monthly; anything else must be a known period.
pub fn set_budget_db(
    store: &dyn LedgerStore,
    category: &str,
    amount_str: &str,
    period_str: &str,
) -> LedgerResult<()> {
    let category = parse_category(category)?;
    let amount = parse_budget_amount(amount_str)?;
    let period = if period_str.trim().is_empty() {
        BudgetPeriod::default()
    } else {
        period_str.parse::<BudgetPeriod>().map_err(LedgerError::Validation)?
    };
    store.upsert_budget(&category, amount, period)?;
    tracing::info!(category = %category, %amount, %period, "budget set");
    Ok(())
}

pub fn delete_budget_db(store: &dyn LedgerStore, category: &str) -> LedgerResult<()> {
    let category = parse_category(category)?;
    if !store.delete_budget(&category)? {
        return Err(LedgerError::not_found("Budget", category));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqliteStore;
    use std::str::FromStr;

    #[test]
    fn test_set_budget_success() {
        let store = SqliteStore::open_in_memory().unwrap();
        let result = set_budget_db(&store, "Food", "100.50", "weekly");
        assert!(result.is_ok());

        let budgets = store.get_budgets().unwrap();
        assert_eq!(budgets.len(), 1);
        assert_eq!(budgets[0].category, "Food");
        assert_eq!(budgets[0].amount, Decimal::from_str("100.50").unwrap());
        assert_eq!(budgets[0].period, BudgetPeriod::Weekly);
    }

    #[test]
    fn test_set_budget_defaults_to_monthly() {
        let store = SqliteStore::open_in_memory().unwrap();
        set_budget_db(&store, "Food", "10", "").unwrap();
        assert_eq!(store.get_budgets().unwrap()[0].period, BudgetPeriod::Monthly);
    }

    #[test]
    fn test_set_budget_replaces_previous() {
        let store = SqliteStore::open_in_memory().unwrap();
        set_budget_db(&store, "Food", "10", "Monthly").unwrap();
        set_budget_db(&store, "Food", "25", "Yearly").unwrap();

        let budgets = store.get_budgets().unwrap();
        assert_eq!(budgets.len(), 1);
        assert_eq!(budgets[0].amount, Decimal::from(25));
        assert_eq!(budgets[0].period, BudgetPeriod::Yearly);
    }

    #[test]
    fn test_set_budget_invalid_amount() {
        let store = SqliteStore::open_in_memory().unwrap();
        let result = set_budget_db(&store, "Food", "not-a-number", "Monthly");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid budget amount"));

        assert!(set_budget_db(&store, "Food", "-5", "Monthly").is_err());
    }

    #[test]
    fn test_set_budget_invalid_period() {
        let store = SqliteStore::open_in_memory().unwrap();
        let err = set_budget_db(&store, "Food", "10", "Quarterly").unwrap_err();
        assert!(err.to_string().contains("Invalid budget period"));
        assert!(store.get_budgets().unwrap().is_empty());
    }

    #[test]
    fn test_set_budget_empty_category() {
        let store = SqliteStore::open_in_memory().unwrap();
        let result = set_budget_db(&store, "", "100", "Monthly");
        assert!(result.is_err());
        assert_eq!(result.unwrap_err().to_string(), "Category cannot be empty");
    }

    #[test]
    fn test_delete_budget_success() {
        let store = SqliteStore::open_in_memory().unwrap();
        set_budget_db(&store, "Food", "10", "Monthly").unwrap();

        let result = delete_budget_db(&store, "Food");
        assert!(result.is_ok());

        let budgets = store.get_budgets().unwrap();
        assert!(budgets.is_empty());
    }

    #[test]
    fn test_delete_budget_not_found() {
        let store = SqliteStore::open_in_memory().unwrap();
        let result = delete_budget_db(&store, "Missing");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("not found"));
    }
}
