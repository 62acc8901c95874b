use crate::config::Settings;
use crate::db::postgres_store::PostgresStore;
use crate::db::{LedgerStore, SqliteStore};
use crate::error::{LedgerError, LedgerResult};
use crate::models::expense::NewExpense;
use crate::models::income::NewIncome;
use crate::operations::report::DateRange;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub categories: usize,
    pub expenses: usize,
    pub incomes: usize,
    pub budgets: usize,
}

/// Copies every category, expense, income and budget from `source` into
/// `target`. Records are appended oldest first; existing target data is kept.
pub fn migrate(
    source: &dyn LedgerStore,
    target: &dyn LedgerStore,
) -> LedgerResult<MigrationReport> {
    let mut report = MigrationReport::default();
    let all = DateRange::all_time();

    for category in source.all_categories()? {
        target.add_category(&category.name)?;
        report.categories += 1;
    }

    for expense in source.expenses_in_range(all.start, all.end)?.into_iter().rev() {
        target.add_expense(&NewExpense::new(
            expense.date,
            expense.amount,
            &expense.category,
            &expense.note,
        ))?;
        report.expenses += 1;
    }

    for income in source.incomes_in_range(all.start, all.end)?.into_iter().rev() {
        target.add_income(&NewIncome::new(income.date, income.amount, &income.source))?;
        report.incomes += 1;
    }

    for budget in source.get_budgets()? {
        target.upsert_budget(&budget.category, budget.amount, budget.period)?;
        report.budgets += 1;
    }

    tracing::info!(
        categories = report.categories,
        expenses = report.expenses,
        incomes = report.incomes,
        budgets = report.budgets,
        "migration finished"
    );
    Ok(report)
}

/// Moves the local SQLite ledger named in `settings` into the configured
/// PostgreSQL database.
pub fn migrate_to_cloud(settings: &Settings) -> LedgerResult<MigrationReport> {
    if !settings.cloud_database.is_configured() {
        return Err(LedgerError::Config(
            "Cloud database not configured. Please configure it first.".to_string(),
        ));
    }
    let source = SqliteStore::open(&settings.database_path)?;
    let target = PostgresStore::connect(&settings.cloud_database)?;
    migrate(&source, &target)
}
