//! Networked ledger on PostgreSQL. Same tables as the SQLite schema, with
//! native `DATE`, `NUMERIC` and `TIMESTAMP` columns.

use crate::config::CloudDatabase;
use crate::db::store::LedgerStore;
use crate::error::{storage, LedgerError, LedgerResult};
use crate::models::budget::{Budget, BudgetPeriod};
use crate::models::category::Category;
use crate::models::expense::{Expense, NewExpense};
use crate::models::income::{Income, NewIncome};
use chrono::{NaiveDate, NaiveDateTime};
use postgres::{Client, GenericClient, NoTls, Row};
use rust_decimal::Decimal;
use std::sync::{Mutex, MutexGuard};

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS categories (
        id BIGSERIAL PRIMARY KEY,
        name VARCHAR(255) NOT NULL UNIQUE,
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    );
    CREATE TABLE IF NOT EXISTS expenses (
        id BIGSERIAL PRIMARY KEY,
        category_id BIGINT NOT NULL REFERENCES categories(id) ON DELETE CASCADE,
        amount NUMERIC(14,4) NOT NULL CHECK (amount >= 0),
        note TEXT,
        date DATE NOT NULL
    );
    CREATE TABLE IF NOT EXISTS incomes (
        id BIGSERIAL PRIMARY KEY,
        amount NUMERIC(14,4) NOT NULL CHECK (amount >= 0),
        source VARCHAR(255) NOT NULL DEFAULT '',
        date DATE NOT NULL
    );
    CREATE TABLE IF NOT EXISTS budgets (
        id BIGSERIAL PRIMARY KEY,
        category_id BIGINT NOT NULL UNIQUE REFERENCES categories(id) ON DELETE CASCADE,
        amount NUMERIC(14,4) NOT NULL CHECK (amount >= 0),
        period VARCHAR(50) NOT NULL DEFAULT 'Monthly',
        created_at TIMESTAMP NOT NULL DEFAULT CURRENT_TIMESTAMP
    );
    CREATE INDEX IF NOT EXISTS idx_expenses_date ON expenses(date);
";

const SELECT_EXPENSES: &str = "SELECT e.id, e.date, e.amount, c.name, COALESCE(e.note, '')
     FROM expenses e
     JOIN categories c ON c.id = e.category_id";

const SELECT_BUDGETS: &str = "SELECT b.id, c.name, b.amount, b.period, b.created_at
     FROM budgets b
     JOIN categories c ON c.id = b.category_id";

pub struct PostgresStore {
    client: Mutex<Client>,
}

impl PostgresStore {
    pub fn connect(cloud: &CloudDatabase) -> LedgerResult<Self> {
        if !cloud.is_configured() {
            return Err(LedgerError::Config(
                "cloud database host, database, user and password are required".to_string(),
            ));
        }
        let mut client = postgres::Config::new()
            .host(&cloud.host)
            .port(cloud.port)
            .dbname(&cloud.database)
            .user(&cloud.user)
            .password(&cloud.password)
            .connect(NoTls)
            .map_err(|e| {
                tracing::error!(host = %cloud.host, error = %e, "failed to connect to postgresql");
                LedgerError::Storage(format!("Failed to connect to PostgreSQL: {}", e))
            })?;
        client
            .batch_execute(SCHEMA)
            .map_err(storage("Failed to migrate schema"))?;
        tracing::info!(
            host = %cloud.host,
            database = %cloud.database,
            "connected to postgresql ledger"
        );
        Ok(Self {
            client: Mutex::new(client),
        })
    }

    fn client(&self) -> LedgerResult<MutexGuard<'_, Client>> {
        self.client
            .lock()
            .map_err(|_| LedgerError::Storage("PostgreSQL connection lock poisoned".to_string()))
    }
}

fn ensure_category<C: GenericClient>(client: &mut C, name: &str) -> Result<i64, postgres::Error> {
    client.execute(
        "INSERT INTO categories (name) VALUES ($1) ON CONFLICT (name) DO NOTHING",
        &[&name.trim()],
    )?;
    let row = client.query_one("SELECT id FROM categories WHERE name = $1", &[&name.trim()])?;
    row.try_get(0)
}

fn expense_from_row(row: &Row) -> Result<Expense, postgres::Error> {
    Ok(Expense {
        id: row.try_get(0)?,
        date: row.try_get(1)?,
        amount: row.try_get(2)?,
        category: row.try_get(3)?,
        note: row.try_get(4)?,
    })
}

fn income_from_row(row: &Row) -> Result<Income, postgres::Error> {
    Ok(Income {
        id: row.try_get(0)?,
        date: row.try_get(1)?,
        amount: row.try_get(2)?,
        source: row.try_get(3)?,
    })
}

fn budget_from_row(row: &Row) -> Result<Budget, postgres::Error> {
    let period: String = row.try_get(3)?;
    let created_at: NaiveDateTime = row.try_get(4)?;
    Ok(Budget {
        id: row.try_get(0)?,
        category: row.try_get(1)?,
        amount: row.try_get(2)?,
        period: BudgetPeriod::from_label(&period),
        created_at,
    })
}

fn collect<T>(
    rows: Vec<Row>,
    parse: fn(&Row) -> Result<T, postgres::Error>,
    context: &'static str,
) -> LedgerResult<Vec<T>> {
    rows.iter()
        .map(parse)
        .collect::<Result<Vec<_>, _>>()
        .map_err(storage(context))
}

impl LedgerStore for PostgresStore {
    fn all_categories(&self) -> LedgerResult<Vec<Category>> {
        let rows = self
            .client()?
            .query("SELECT id, name FROM categories ORDER BY name ASC", &[])
            .map_err(storage("Failed to query categories"))?;
        collect(
            rows,
            |row| {
                Ok(Category {
                    id: row.try_get(0)?,
                    name: row.try_get(1)?,
                })
            },
            "Failed to parse category",
        )
    }

    fn add_category(&self, name: &str) -> LedgerResult<()> {
        self.client()?
            .execute(
                "INSERT INTO categories (name) VALUES ($1) ON CONFLICT (name) DO NOTHING",
                &[&name.trim()],
            )
            .map_err(storage("Failed to insert category"))?;
        Ok(())
    }

    fn rename_category(&self, old: &str, new: &str) -> LedgerResult<bool> {
        let rows = self
            .client()?
            .execute(
                "UPDATE categories SET name = $1 WHERE name = $2",
                &[&new.trim(), &old.trim()],
            )
            .map_err(storage("Failed to rename category"))?;
        Ok(rows > 0)
    }

    fn delete_category(&self, name: &str) -> LedgerResult<bool> {
        let rows = self
            .client()?
            .execute("DELETE FROM categories WHERE name = $1", &[&name.trim()])
            .map_err(storage("Failed to delete category"))?;
        Ok(rows > 0)
    }

    fn count_expenses_in_category(&self, name: &str) -> LedgerResult<i64> {
        let row = self
            .client()?
            .query_one(
                "SELECT COUNT(*) FROM expenses e
                 JOIN categories c ON c.id = e.category_id
                 WHERE c.name = $1",
                &[&name.trim()],
            )
            .map_err(storage("Failed to count expenses"))?;
        row.try_get(0).map_err(storage("Failed to count expenses"))
    }

    fn add_expense(&self, expense: &NewExpense) -> LedgerResult<i64> {
        let mut client = self.client()?;
        let mut tx = client
            .transaction()
            .map_err(storage("Failed to begin transaction"))?;
        let category_id = ensure_category(&mut tx, &expense.category)
            .map_err(storage("Failed to look up category"))?;
        let row = tx
            .query_one(
                "INSERT INTO expenses (category_id, amount, note, date)
                 VALUES ($1, $2, $3, $4) RETURNING id",
                &[&category_id, &expense.amount, &expense.note, &expense.date],
            )
            .map_err(storage("Failed to insert expense"))?;
        let id: i64 = row.try_get(0).map_err(storage("Failed to insert expense"))?;
        tx.commit().map_err(storage("Failed to commit expense"))?;
        Ok(id)
    }

    fn update_expense(&self, id: i64, expense: &NewExpense) -> LedgerResult<bool> {
        let mut client = self.client()?;
        let mut tx = client
            .transaction()
            .map_err(storage("Failed to begin transaction"))?;
        let category_id = ensure_category(&mut tx, &expense.category)
            .map_err(storage("Failed to look up category"))?;
        let rows = tx
            .execute(
                "UPDATE expenses SET category_id = $1, amount = $2, note = $3, date = $4
                 WHERE id = $5",
                &[&category_id, &expense.amount, &expense.note, &expense.date, &id],
            )
            .map_err(storage("Failed to update expense"))?;
        tx.commit().map_err(storage("Failed to commit expense"))?;
        Ok(rows > 0)
    }

    fn delete_expense(&self, id: i64) -> LedgerResult<bool> {
        let rows = self
            .client()?
            .execute("DELETE FROM expenses WHERE id = $1", &[&id])
            .map_err(storage("Failed to delete expense"))?;
        Ok(rows > 0)
    }

    fn expenses_for_category_in_range(
        &self,
        category: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> LedgerResult<Vec<Expense>> {
        let sql = format!(
            "{} WHERE c.name = $1 AND e.date BETWEEN $2 AND $3 ORDER BY e.date DESC, e.id DESC",
            SELECT_EXPENSES
        );
        let rows = self
            .client()?
            .query(sql.as_str(), &[&category.trim(), &start, &end])
            .map_err(storage("Failed to query expenses"))?;
        collect(rows, expense_from_row, "Failed to parse expense")
    }

    fn expenses_in_range(&self, start: NaiveDate, end: NaiveDate) -> LedgerResult<Vec<Expense>> {
        let sql = format!(
            "{} WHERE e.date BETWEEN $1 AND $2 ORDER BY e.date DESC, e.id DESC",
            SELECT_EXPENSES
        );
        let rows = self
            .client()?
            .query(sql.as_str(), &[&start, &end])
            .map_err(storage("Failed to query expenses"))?;
        collect(rows, expense_from_row, "Failed to parse expense")
    }

    fn sum_by_category(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> LedgerResult<Vec<(String, Decimal)>> {
        let rows = self
            .client()?
            .query(
                "SELECT c.name, COALESCE(SUM(e.amount), 0)
                 FROM categories c
                 LEFT JOIN expenses e ON e.category_id = c.id AND e.date BETWEEN $1 AND $2
                 GROUP BY c.id, c.name
                 ORDER BY c.name ASC",
                &[&start, &end],
            )
            .map_err(storage("Failed to sum expenses by category"))?;
        collect(
            rows,
            |row| Ok((row.try_get(0)?, row.try_get::<_, Decimal>(1)?.normalize())),
            "Failed to parse category total",
        )
    }

    fn daily_sums_by_category(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> LedgerResult<Vec<(NaiveDate, String, Decimal)>> {
        let rows = self
            .client()?
            .query(
                "SELECT e.date, c.name, SUM(e.amount)
                 FROM expenses e
                 JOIN categories c ON c.id = e.category_id
                 WHERE e.date BETWEEN $1 AND $2
                 GROUP BY e.date, c.name
                 ORDER BY e.date ASC, c.name ASC",
                &[&start, &end],
            )
            .map_err(storage("Failed to sum daily expenses"))?;
        collect(
            rows,
            |row| {
                Ok((
                    row.try_get(0)?,
                    row.try_get(1)?,
                    row.try_get::<_, Decimal>(2)?.normalize(),
                ))
            },
            "Failed to parse daily total",
        )
    }

    fn total_expenses(&self, start: NaiveDate, end: NaiveDate) -> LedgerResult<Decimal> {
        let row = self
            .client()?
            .query_one(
                "SELECT COALESCE(SUM(amount), 0) FROM expenses WHERE date BETWEEN $1 AND $2",
                &[&start, &end],
            )
            .map_err(storage("Failed to calculate total expenses"))?;
        row.try_get::<_, Decimal>(0)
            .map(|total| total.normalize())
            .map_err(storage("Failed to calculate total expenses"))
    }

    fn add_income(&self, income: &NewIncome) -> LedgerResult<i64> {
        let row = self
            .client()?
            .query_one(
                "INSERT INTO incomes (amount, source, date) VALUES ($1, $2, $3) RETURNING id",
                &[&income.amount, &income.source, &income.date],
            )
            .map_err(storage("Failed to insert income"))?;
        row.try_get(0).map_err(storage("Failed to insert income"))
    }

    fn update_income(&self, id: i64, income: &NewIncome) -> LedgerResult<bool> {
        let rows = self
            .client()?
            .execute(
                "UPDATE incomes SET amount = $1, source = $2, date = $3 WHERE id = $4",
                &[&income.amount, &income.source, &income.date, &id],
            )
            .map_err(storage("Failed to update income"))?;
        Ok(rows > 0)
    }

    fn delete_income(&self, id: i64) -> LedgerResult<bool> {
        let rows = self
            .client()?
            .execute("DELETE FROM incomes WHERE id = $1", &[&id])
            .map_err(storage("Failed to delete income"))?;
        Ok(rows > 0)
    }

    fn incomes_in_range(&self, start: NaiveDate, end: NaiveDate) -> LedgerResult<Vec<Income>> {
        let rows = self
            .client()?
            .query(
                "SELECT id, date, amount, COALESCE(source, '')
                 FROM incomes
                 WHERE date BETWEEN $1 AND $2
                 ORDER BY date DESC, id DESC",
                &[&start, &end],
            )
            .map_err(storage("Failed to query incomes"))?;
        collect(rows, income_from_row, "Failed to parse income")
    }

    fn total_incomes(&self, start: NaiveDate, end: NaiveDate) -> LedgerResult<Decimal> {
        let row = self
            .client()?
            .query_one(
                "SELECT COALESCE(SUM(amount), 0) FROM incomes WHERE date BETWEEN $1 AND $2",
                &[&start, &end],
            )
            .map_err(storage("Failed to calculate total incomes"))?;
        row.try_get::<_, Decimal>(0)
            .map(|total| total.normalize())
            .map_err(storage("Failed to calculate total incomes"))
    }

    fn get_budgets(&self) -> LedgerResult<Vec<Budget>> {
        let sql = format!("{} ORDER BY c.name ASC", SELECT_BUDGETS);
        let rows = self
            .client()?
            .query(sql.as_str(), &[])
            .map_err(storage("Failed to query budgets"))?;
        collect(rows, budget_from_row, "Failed to parse budget")
    }

    fn get_budget(&self, category: &str) -> LedgerResult<Option<Budget>> {
        let sql = format!("{} WHERE c.name = $1", SELECT_BUDGETS);
        let row = self
            .client()?
            .query_opt(sql.as_str(), &[&category.trim()])
            .map_err(storage("Failed to query budget"))?;
        row.as_ref()
            .map(budget_from_row)
            .transpose()
            .map_err(storage("Failed to parse budget"))
    }

    fn upsert_budget(
        &self,
        category: &str,
        amount: Decimal,
        period: BudgetPeriod,
    ) -> LedgerResult<()> {
        let mut client = self.client()?;
        let mut tx = client
            .transaction()
            .map_err(storage("Failed to begin transaction"))?;
        let category_id =
            ensure_category(&mut tx, category).map_err(storage("Failed to look up category"))?;
        tx.execute(
            "INSERT INTO budgets (category_id, amount, period)
             VALUES ($1, $2, $3)
             ON CONFLICT (category_id) DO UPDATE SET
                amount = EXCLUDED.amount,
                period = EXCLUDED.period,
                created_at = CURRENT_TIMESTAMP",
            &[&category_id, &amount, &period.as_str()],
        )
        .map_err(storage("Failed to upsert budget"))?;
        tx.commit().map_err(storage("Failed to commit budget"))?;
        Ok(())
    }

    fn delete_budget(&self, category: &str) -> LedgerResult<bool> {
        let rows = self
            .client()?
            .execute(
                "DELETE FROM budgets
                 WHERE category_id = (SELECT id FROM categories WHERE name = $1)",
                &[&category.trim()],
            )
            .map_err(storage("Failed to delete budget"))?;
        Ok(rows > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_requires_complete_settings() {
        let cloud = CloudDatabase {
            host: "db.example.com".to_string(),
            ..CloudDatabase::default()
        };
        let result = PostgresStore::connect(&cloud);
        assert!(matches!(result, Err(LedgerError::Config(_))));
    }
}
