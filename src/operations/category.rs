use crate::db::LedgerStore;
use crate::error::{LedgerError, LedgerResult};
use crate::models::category::Category;
use crate::models::expense::Expense;
use crate::operations::add::parse_category;
use crate::operations::report::DateRange;

/// Categories every fresh ledger starts with.
pub const DEFAULT_CATEGORIES: [&str; 2] = ["Food", "Other"];

/// Adds the default categories when the ledger has none. Returns how many
/// were inserted.
pub fn seed_defaults(store: &dyn LedgerStore) -> LedgerResult<usize> {
    if !store.all_categories()?.is_empty() {
        return Ok(0);
    }
    for name in DEFAULT_CATEGORIES {
        store.add_category(name)?;
    }
    tracing::info!("seeded default categories");
    Ok(DEFAULT_CATEGORIES.len())
}

fn exists(store: &dyn LedgerStore, name: &str) -> LedgerResult<bool> {
    Ok(store.all_categories()?.iter().any(|c| c.name == name))
}

pub fn add_category_db(store: &dyn LedgerStore, name: &str) -> LedgerResult<()> {
    let name = parse_category(name)?;
    if exists(store, &name)? {
        return Err(LedgerError::Validation(format!(
            "Category '{}' already exists",
            name
        )));
    }
    store.add_category(&name)
}

pub fn rename_category_db(store: &dyn LedgerStore, old: &str, new: &str) -> LedgerResult<()> {
    let new = parse_category(new)?;
    if old.trim() != new && exists(store, &new)? {
        return Err(LedgerError::Validation(format!(
            "Category '{}' already exists",
            new
        )));
    }
    if !store.rename_category(old, &new)? {
        return Err(LedgerError::not_found("Category", old.trim()));
    }
    Ok(())
}

/// Deletes the category and returns how many expenses went with it.
pub fn delete_category_db(store: &dyn LedgerStore, name: &str) -> LedgerResult<i64> {
    let removed = store.count_expenses_in_category(name)?;
    if !store.delete_category(name)? {
        return Err(LedgerError::not_found("Category", name.trim()));
    }
    tracing::info!(category = name.trim(), expenses = removed, "category deleted");
    Ok(removed)
}

pub fn list_categories(store: &dyn LedgerStore) -> LedgerResult<Vec<Category>> {
    store.all_categories()
}

pub fn category_expenses(
    store: &dyn LedgerStore,
    name: &str,
    range: DateRange,
) -> LedgerResult<Vec<Expense>> {
    store.expenses_for_category_in_range(name.trim(), range.start, range.end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::SqliteStore;
    use crate::operations::add::add_expense_to_db;
    use chrono::NaiveDate;

    fn names(store: &SqliteStore) -> Vec<String> {
        store
            .all_categories()
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect()
    }

    #[test]
    fn test_seed_defaults_only_once() {
        let store = SqliteStore::open_in_memory().unwrap();
        assert_eq!(seed_defaults(&store).unwrap(), 2);
        assert_eq!(seed_defaults(&store).unwrap(), 0);
        assert_eq!(names(&store), vec!["Food", "Other"]);
    }

    #[test]
    fn test_seed_skips_non_empty_ledger() {
        let store = SqliteStore::open_in_memory().unwrap();
        store.add_category("Rent").unwrap();
        assert_eq!(seed_defaults(&store).unwrap(), 0);
        assert_eq!(names(&store), vec!["Rent"]);
    }

    #[test]
    fn test_add_duplicate_category() {
        let store = SqliteStore::open_in_memory().unwrap();
        add_category_db(&store, " Food ").unwrap();
        let err = add_category_db(&store, "Food").unwrap_err();
        assert_eq!(err.to_string(), "Category 'Food' already exists");
    }

    #[test]
    fn test_rename_category() {
        let store = SqliteStore::open_in_memory().unwrap();
        add_category_db(&store, "Food").unwrap();
        add_category_db(&store, "Fun").unwrap();

        rename_category_db(&store, "Food", "Groceries").unwrap();
        assert_eq!(names(&store), vec!["Fun", "Groceries"]);

        assert!(matches!(
            rename_category_db(&store, "Fun", "Groceries").unwrap_err(),
            LedgerError::Validation(_)
        ));
        assert!(matches!(
            rename_category_db(&store, "Missing", "Other").unwrap_err(),
            LedgerError::NotFound { .. }
        ));
    }

    #[test]
    fn test_delete_category_reports_cascade() {
        let store = SqliteStore::open_in_memory().unwrap();
        add_expense_to_db(&store, "2025-01-01, 5, Food").unwrap();
        add_expense_to_db(&store, "2025-01-02, 6, Food").unwrap();
        add_expense_to_db(&store, "2025-01-02, 7, Fun").unwrap();

        assert_eq!(delete_category_db(&store, "Food").unwrap(), 2);
        assert_eq!(names(&store), vec!["Fun"]);
        assert!(delete_category_db(&store, "Food").is_err());
    }

    #[test]
    fn test_category_expenses_in_range() {
        let store = SqliteStore::open_in_memory().unwrap();
        add_expense_to_db(&store, "2025-01-01, 5, Food").unwrap();
        add_expense_to_db(&store, "2025-02-01, 6, Food").unwrap();

        let range = DateRange::normalized(
            NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
            NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
        );
        let expenses = category_expenses(&store, "Food", range).unwrap();
        assert_eq!(expenses.len(), 1);
        assert_eq!(expenses[0].amount, rust_decimal::Decimal::from(5));
    }
}
