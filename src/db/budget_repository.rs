use crate::db::repository::{amount_column, ensure_category};
use crate::error::{storage, LedgerResult};
use crate::models::budget::{Budget, BudgetPeriod};
use chrono::NaiveDateTime;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const SELECT_BUDGETS: &str = "SELECT b.id, c.name, b.amount, b.period, b.created_at
     FROM budgets b
     JOIN categories c ON c.id = b.category_id";

fn budget_from_row(row: &Row<'_>) -> rusqlite::Result<Budget> {
    let period: String = row.get(3)?;
    let created_at: String = row.get(4)?;
    Ok(Budget {
        id: row.get(0)?,
        category: row.get(1)?,
        amount: amount_column(row, 2)?,
        period: BudgetPeriod::from_label(&period),
        created_at: NaiveDateTime::parse_from_str(&created_at, TIMESTAMP_FORMAT)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?,
    })
}

/// Creates or replaces the budget for `category`. The category is created
/// when missing, and `created_at` is reset on replace.
pub fn set_budget(
    conn: &Connection,
    category: &str,
    amount: &Decimal,
    period: BudgetPeriod,
) -> LedgerResult<()> {
    let tx = conn
        .unchecked_transaction()
        .map_err(storage("Failed to begin transaction"))?;
    let category_id = ensure_category(&tx, category)?;
    tx.execute(
        "INSERT INTO budgets (category_id, amount, period, created_at)
         VALUES (?1, ?2, ?3, datetime('now'))
         ON CONFLICT(category_id) DO UPDATE SET
            amount = excluded.amount,
            period = excluded.period,
            created_at = excluded.created_at",
        params![category_id, amount.to_string(), period.as_str()],
    )
    .map_err(storage("Failed to upsert budget"))?;
    tx.commit().map_err(storage("Failed to commit budget"))?;
    Ok(())
}

pub fn get_budget(conn: &Connection, category: &str) -> LedgerResult<Option<Budget>> {
    let sql = format!("{} WHERE c.name = ?1", SELECT_BUDGETS);
    conn.query_row(&sql, [category.trim()], budget_from_row)
        .optional()
        .map_err(storage("Failed to query budget"))
}

pub fn get_all_budgets(conn: &Connection) -> LedgerResult<Vec<Budget>> {
    let sql = format!("{} ORDER BY c.name ASC", SELECT_BUDGETS);
    let mut stmt = conn
        .prepare(&sql)
        .map_err(storage("Failed to prepare statement"))?;

    let iter = stmt
        .query_map([], budget_from_row)
        .map_err(storage("Failed to query budgets"))?;

    iter.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(storage("Failed to parse budget"))
}

pub fn delete_budget(conn: &Connection, category: &str) -> LedgerResult<bool> {
    let rows = conn
        .execute(
            "DELETE FROM budgets WHERE category_id = (SELECT id FROM categories WHERE name = ?1)",
            [category.trim()],
        )
        .map_err(storage("Failed to delete budget"))?;
    Ok(rows > 0)
}
