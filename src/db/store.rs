//! Storage capabilities the budget engine and the reports are written against.
//!
//! Both backends implement [`LedgerStore`]; which one is used is decided once
//! by [`open_store`] from the settings.

use crate::config::{DatabaseType, Settings};
use crate::db::postgres_store::PostgresStore;
use crate::db::sqlite_store::SqliteStore;
use crate::error::LedgerResult;
use crate::models::budget::{Budget, BudgetPeriod};
use crate::models::category::Category;
use crate::models::expense::{Expense, NewExpense};
use crate::models::income::{Income, NewIncome};
use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Fractional digits kept for amounts.
pub const AMOUNT_SCALE: u32 = 4;

/// Integer digits an amount may have; `NUMERIC(14,4)` holds below `10^10`.
pub const AMOUNT_INTEGER_DIGITS: u32 = 10;

pub trait LedgerStore {
    /// All categories, ordered by name.
    fn all_categories(&self) -> LedgerResult<Vec<Category>>;

    /// Inserts the category unless a category with that name already exists.
    fn add_category(&self, name: &str) -> LedgerResult<()>;

    /// Returns false when `old` does not exist.
    fn rename_category(&self, old: &str, new: &str) -> LedgerResult<bool>;

    /// Deletes the category together with its expenses and budget.
    fn delete_category(&self, name: &str) -> LedgerResult<bool>;

    fn count_expenses_in_category(&self, name: &str) -> LedgerResult<i64>;

    /// Creates the category on first use. Returns the new expense id.
    fn add_expense(&self, expense: &NewExpense) -> LedgerResult<i64>;

    fn update_expense(&self, id: i64, expense: &NewExpense) -> LedgerResult<bool>;

    fn delete_expense(&self, id: i64) -> LedgerResult<bool>;

    /// Expenses of one category with `start <= date <= end`, newest first.
    fn expenses_for_category_in_range(
        &self,
        category: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> LedgerResult<Vec<Expense>>;

    /// All expenses with `start <= date <= end`, newest first.
    fn expenses_in_range(&self, start: NaiveDate, end: NaiveDate) -> LedgerResult<Vec<Expense>>;

    /// One row per category, zero totals included, ordered by name.
    fn sum_by_category(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> LedgerResult<Vec<(String, Decimal)>>;

    /// One row per (date, category) that has expenses, ordered by date then name.
    fn daily_sums_by_category(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> LedgerResult<Vec<(NaiveDate, String, Decimal)>>;

    fn total_expenses(&self, start: NaiveDate, end: NaiveDate) -> LedgerResult<Decimal>;

    fn add_income(&self, income: &NewIncome) -> LedgerResult<i64>;

    fn update_income(&self, id: i64, income: &NewIncome) -> LedgerResult<bool>;

    fn delete_income(&self, id: i64) -> LedgerResult<bool>;

    /// Incomes with `start <= date <= end`, newest first.
    fn incomes_in_range(&self, start: NaiveDate, end: NaiveDate) -> LedgerResult<Vec<Income>>;

    fn total_incomes(&self, start: NaiveDate, end: NaiveDate) -> LedgerResult<Decimal>;

    /// All budgets, ordered by category name.
    fn get_budgets(&self) -> LedgerResult<Vec<Budget>>;

    fn get_budget(&self, category: &str) -> LedgerResult<Option<Budget>>;

    /// Creates or replaces the single budget of `category`, creating the
    /// category if needed.
    fn upsert_budget(&self, category: &str, amount: Decimal, period: BudgetPeriod)
    -> LedgerResult<()>;

    /// Returns false when the category had no budget.
    fn delete_budget(&self, category: &str) -> LedgerResult<bool>;
}

/// Opens the backend selected by `settings.database_type`.
pub fn open_store(settings: &Settings) -> LedgerResult<Box<dyn LedgerStore>> {
    match settings.database_type {
        DatabaseType::Sqlite => Ok(Box::new(SqliteStore::open(&settings.database_path)?)),
        DatabaseType::Postgresql => Ok(Box::new(PostgresStore::connect(&settings.cloud_database)?)),
    }
}
