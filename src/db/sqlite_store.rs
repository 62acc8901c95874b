use crate::db::budget_repository;
use crate::db::connection::establish_connection;
use crate::db::repository;
use crate::db::store::LedgerStore;
use crate::error::{storage, LedgerResult};
use crate::models::budget::{Budget, BudgetPeriod};
use crate::models::category::Category;
use crate::models::expense::{Expense, NewExpense};
use crate::models::income::{Income, NewIncome};
use chrono::NaiveDate;
use rusqlite::Connection;
use rust_decimal::Decimal;
use std::fs;
use std::path::Path;

/// Local ledger in a single SQLite file.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> LedgerResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let conn = establish_connection(path).map_err(storage("Failed to open database"))?;
        tracing::info!(path = %path.display(), "connected to sqlite ledger");
        Ok(Self { conn })
    }

    #[cfg(test)]
    pub fn open_in_memory() -> LedgerResult<Self> {
        let conn = crate::db::connection::establish_test_connection()
            .map_err(storage("Failed to open database"))?;
        Ok(Self { conn })
    }
}

impl LedgerStore for SqliteStore {
    fn all_categories(&self) -> LedgerResult<Vec<Category>> {
        repository::all_categories(&self.conn)
    }

    fn add_category(&self, name: &str) -> LedgerResult<()> {
        repository::add_category(&self.conn, name)
    }

    fn rename_category(&self, old: &str, new: &str) -> LedgerResult<bool> {
        repository::rename_category(&self.conn, old, new)
    }

    fn delete_category(&self, name: &str) -> LedgerResult<bool> {
        repository::delete_category(&self.conn, name)
    }

    fn count_expenses_in_category(&self, name: &str) -> LedgerResult<i64> {
        repository::count_expenses_in_category(&self.conn, name)
    }

    fn add_expense(&self, expense: &NewExpense) -> LedgerResult<i64> {
        repository::add_expense(&self.conn, expense)
    }

    fn update_expense(&self, id: i64, expense: &NewExpense) -> LedgerResult<bool> {
        repository::update_expense(&self.conn, id, expense)
    }

    fn delete_expense(&self, id: i64) -> LedgerResult<bool> {
        repository::delete_expense(&self.conn, id)
    }

    fn expenses_for_category_in_range(
        &self,
        category: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> LedgerResult<Vec<Expense>> {
        repository::expenses_for_category_in_range(&self.conn, category, start, end)
    }

    fn expenses_in_range(&self, start: NaiveDate, end: NaiveDate) -> LedgerResult<Vec<Expense>> {
        repository::expenses_in_range(&self.conn, start, end)
    }

    fn sum_by_category(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> LedgerResult<Vec<(String, Decimal)>> {
        repository::sum_by_category(&self.conn, start, end)
    }

    fn daily_sums_by_category(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> LedgerResult<Vec<(NaiveDate, String, Decimal)>> {
        repository::daily_sums_by_category(&self.conn, start, end)
    }

    fn total_expenses(&self, start: NaiveDate, end: NaiveDate) -> LedgerResult<Decimal> {
        repository::total_expenses(&self.conn, start, end)
    }

    fn add_income(&self, income: &NewIncome) -> LedgerResult<i64> {
        repository::add_income(&self.conn, income)
    }

    fn update_income(&self, id: i64, income: &NewIncome) -> LedgerResult<bool> {
        repository::update_income(&self.conn, id, income)
    }

    fn delete_income(&self, id: i64) -> LedgerResult<bool> {
        repository::delete_income(&self.conn, id)
    }

    fn incomes_in_range(&self, start: NaiveDate, end: NaiveDate) -> LedgerResult<Vec<Income>> {
        repository::incomes_in_range(&self.conn, start, end)
    }

    fn total_incomes(&self, start: NaiveDate, end: NaiveDate) -> LedgerResult<Decimal> {
        repository::total_incomes(&self.conn, start, end)
    }

    fn get_budgets(&self) -> LedgerResult<Vec<Budget>> {
        budget_repository::get_all_budgets(&self.conn)
    }

    fn get_budget(&self, category: &str) -> LedgerResult<Option<Budget>> {
        budget_repository::get_budget(&self.conn, category)
    }

    fn upsert_budget(
        &self,
        category: &str,
        amount: Decimal,
        period: BudgetPeriod,
    ) -> LedgerResult<()> {
        budget_repository::set_budget(&self.conn, category, &amount, period)
    }

    fn delete_budget(&self, category: &str) -> LedgerResult<bool> {
        budget_repository::delete_budget(&self.conn, category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("ledger.db");

        let store = SqliteStore::open(&path).unwrap();
        store.add_category("Food").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_data_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.db");
        {
            let store = SqliteStore::open(&path).unwrap();
            store
                .upsert_budget("Food", Decimal::from(500), BudgetPeriod::Monthly)
                .unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        let budgets = store.get_budgets().unwrap();
        assert_eq!(budgets.len(), 1);
        assert_eq!(budgets[0].category, "Food");
    }
}
