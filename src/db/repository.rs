use crate::error::{storage, LedgerError, LedgerResult};
use crate::models::category::Category;
use crate::models::expense::{Expense, NewExpense};
use crate::models::income::{Income, NewIncome};
use chrono::NaiveDate;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;
use std::str::FromStr;

const DATE_FORMAT: &str = "%Y-%m-%d";

pub(crate) fn date_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDate> {
    let raw: String = row.get(idx)?;
    NaiveDate::parse_from_str(&raw, DATE_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn amount_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<Decimal> {
    let raw: String = row.get(idx)?;
    Decimal::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

pub(crate) fn date_param(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

fn expense_from_row(row: &Row<'_>) -> rusqlite::Result<Expense> {
    Ok(Expense {
        id: row.get(0)?,
        date: date_column(row, 1)?,
        amount: amount_column(row, 2)?,
        category: row.get(3)?,
        note: row.get(4)?,
    })
}

fn income_from_row(row: &Row<'_>) -> rusqlite::Result<Income> {
    Ok(Income {
        id: row.get(0)?,
        date: date_column(row, 1)?,
        amount: amount_column(row, 2)?,
        source: row.get(3)?,
    })
}

// -- categories ---------------------------------------------------------

pub fn add_category(conn: &Connection, name: &str) -> LedgerResult<()> {
    conn.execute(
        "INSERT OR IGNORE INTO categories (name) VALUES (?1)",
        [name.trim()],
    )
    .map_err(storage("Failed to insert category"))?;
    Ok(())
}

pub fn rename_category(conn: &Connection, old: &str, new: &str) -> LedgerResult<bool> {
    let rows = conn
        .execute(
            "UPDATE categories SET name = ?1 WHERE name = ?2",
            [new.trim(), old.trim()],
        )
        .map_err(storage("Failed to rename category"))?;
    Ok(rows > 0)
}

pub fn delete_category(conn: &Connection, name: &str) -> LedgerResult<bool> {
    let rows = conn
        .execute("DELETE FROM categories WHERE name = ?1", [name.trim()])
        .map_err(storage("Failed to delete category"))?;
    Ok(rows > 0)
}

pub fn all_categories(conn: &Connection) -> LedgerResult<Vec<Category>> {
    let mut stmt = conn
        .prepare("SELECT id, name FROM categories ORDER BY name ASC")
        .map_err(storage("Failed to prepare statement"))?;

    let iter = stmt
        .query_map([], |row| {
            Ok(Category {
                id: row.get(0)?,
                name: row.get(1)?,
            })
        })
        .map_err(storage("Failed to query categories"))?;

    iter.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(storage("Failed to parse category"))
}

pub fn category_id(conn: &Connection, name: &str) -> LedgerResult<Option<i64>> {
    conn.query_row(
        "SELECT id FROM categories WHERE name = ?1",
        [name.trim()],
        |row| row.get(0),
    )
    .optional()
    .map_err(storage("Failed to look up category"))
}

/// Id of `name`, inserting the category first if it does not exist.
pub fn ensure_category(conn: &Connection, name: &str) -> LedgerResult<i64> {
    add_category(conn, name)?;
    category_id(conn, name)?.ok_or_else(|| LedgerError::not_found("Category", name.trim()))
}

pub fn count_expenses_in_category(conn: &Connection, name: &str) -> LedgerResult<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM expenses e
         JOIN categories c ON c.id = e.category_id
         WHERE c.name = ?1",
        [name.trim()],
        |row| row.get(0),
    )
    .map_err(storage("Failed to count expenses"))
}

// -- expenses -----------------------------------------------------------

pub fn add_expense(conn: &Connection, expense: &NewExpense) -> LedgerResult<i64> {
    let tx = conn
        .unchecked_transaction()
        .map_err(storage("Failed to begin transaction"))?;
    let category_id = ensure_category(&tx, &expense.category)?;
    tx.execute(
        "INSERT INTO expenses (category_id, amount, note, date) VALUES (?1, ?2, ?3, ?4)",
        params![
            category_id,
            expense.amount.to_string(),
            &expense.note,
            date_param(expense.date),
        ],
    )
    .map_err(storage("Failed to insert expense"))?;
    let id = tx.last_insert_rowid();
    tx.commit().map_err(storage("Failed to commit expense"))?;
    Ok(id)
}

pub fn update_expense(conn: &Connection, id: i64, expense: &NewExpense) -> LedgerResult<bool> {
    let tx = conn
        .unchecked_transaction()
        .map_err(storage("Failed to begin transaction"))?;
    let category_id = ensure_category(&tx, &expense.category)?;
    let rows = tx
        .execute(
            "UPDATE expenses SET category_id = ?1, amount = ?2, note = ?3, date = ?4 WHERE id = ?5",
            params![
                category_id,
                expense.amount.to_string(),
                &expense.note,
                date_param(expense.date),
                id,
            ],
        )
        .map_err(storage("Failed to update expense"))?;
    tx.commit().map_err(storage("Failed to commit expense"))?;
    Ok(rows > 0)
}

pub fn delete_expense(conn: &Connection, id: i64) -> LedgerResult<bool> {
    let rows = conn
        .execute("DELETE FROM expenses WHERE id = ?1", [id])
        .map_err(storage("Failed to delete expense"))?;
    Ok(rows > 0)
}

pub fn expenses_for_category_in_range(
    conn: &Connection,
    category: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> LedgerResult<Vec<Expense>> {
    let mut stmt = conn
        .prepare(
            "SELECT e.id, e.date, e.amount, c.name, COALESCE(e.note, '')
             FROM expenses e
             JOIN categories c ON c.id = e.category_id
             WHERE c.name = ?1 AND e.date >= ?2 AND e.date <= ?3
             ORDER BY e.date DESC, e.id DESC",
        )
        .map_err(storage("Failed to prepare statement"))?;

    let iter = stmt
        .query_map(
            params![category.trim(), date_param(start), date_param(end)],
            expense_from_row,
        )
        .map_err(storage("Failed to query expenses"))?;

    iter.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(storage("Failed to parse expense"))
}

pub fn expenses_in_range(
    conn: &Connection,
    start: NaiveDate,
    end: NaiveDate,
) -> LedgerResult<Vec<Expense>> {
    let mut stmt = conn
        .prepare(
            "SELECT e.id, e.date, e.amount, c.name, COALESCE(e.note, '')
             FROM expenses e
             JOIN categories c ON c.id = e.category_id
             WHERE e.date >= ?1 AND e.date <= ?2
             ORDER BY e.date DESC, e.id DESC",
        )
        .map_err(storage("Failed to prepare statement"))?;

    let iter = stmt
        .query_map([date_param(start), date_param(end)], expense_from_row)
        .map_err(storage("Failed to query expenses"))?;

    iter.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(storage("Failed to parse expense"))
}

pub fn sum_by_category(
    conn: &Connection,
    start: NaiveDate,
    end: NaiveDate,
) -> LedgerResult<Vec<(String, Decimal)>> {
    let mut stmt = conn
        .prepare(
            "SELECT c.name, e.amount
             FROM categories c
             LEFT JOIN expenses e ON e.category_id = c.id AND e.date >= ?1 AND e.date <= ?2
             ORDER BY c.name ASC",
        )
        .map_err(storage("Failed to prepare statement"))?;

    let iter = stmt
        .query_map([date_param(start), date_param(end)], |row| {
            let amount = match row.get::<_, Option<String>>(1)? {
                Some(_) => amount_column(row, 1)?,
                None => Decimal::ZERO,
            };
            Ok((row.get::<_, String>(0)?, amount))
        })
        .map_err(storage("Failed to sum expenses by category"))?;

    let mut totals: Vec<(String, Decimal)> = Vec::new();
    for row in iter {
        let (name, amount) = row.map_err(storage("Failed to parse category total"))?;
        match totals.last_mut() {
            Some((last, total)) if *last == name => *total += amount,
            _ => totals.push((name, amount)),
        }
    }
    Ok(totals)
}

pub fn daily_sums_by_category(
    conn: &Connection,
    start: NaiveDate,
    end: NaiveDate,
) -> LedgerResult<Vec<(NaiveDate, String, Decimal)>> {
    let mut stmt = conn
        .prepare(
            "SELECT e.date, c.name, e.amount
             FROM expenses e
             JOIN categories c ON c.id = e.category_id
             WHERE e.date >= ?1 AND e.date <= ?2
             ORDER BY e.date ASC, c.name ASC",
        )
        .map_err(storage("Failed to prepare statement"))?;

    let iter = stmt
        .query_map([date_param(start), date_param(end)], |row| {
            Ok((
                date_column(row, 0)?,
                row.get::<_, String>(1)?,
                amount_column(row, 2)?,
            ))
        })
        .map_err(storage("Failed to sum daily expenses"))?;

    let mut sums: Vec<(NaiveDate, String, Decimal)> = Vec::new();
    for row in iter {
        let (date, name, amount) = row.map_err(storage("Failed to parse daily total"))?;
        match sums.last_mut() {
            Some((d, n, total)) if *d == date && *n == name => *total += amount,
            _ => sums.push((date, name, amount)),
        }
    }
    Ok(sums)
}

/// Exact sum of the TEXT `amount` column of `table` over a date range.
/// SQLite's `SUM` would go through REAL, so the rows are added as decimals.
fn sum_amounts(
    conn: &Connection,
    table: &str,
    start: NaiveDate,
    end: NaiveDate,
) -> LedgerResult<Decimal> {
    let sql = format!("SELECT amount FROM {table} WHERE date >= ?1 AND date <= ?2");
    let mut stmt = conn
        .prepare(&sql)
        .map_err(storage("Failed to prepare statement"))?;

    let iter = stmt
        .query_map([date_param(start), date_param(end)], |row| amount_column(row, 0))
        .map_err(storage("Failed to query amounts"))?;

    let mut total = Decimal::ZERO;
    for amount in iter {
        total += amount.map_err(storage("Failed to parse amount"))?;
    }
    Ok(total)
}

pub fn total_expenses(
    conn: &Connection,
    start: NaiveDate,
    end: NaiveDate,
) -> LedgerResult<Decimal> {
    sum_amounts(conn, "expenses", start, end)
}

// -- incomes ------------------------------------------------------------

pub fn add_income(conn: &Connection, income: &NewIncome) -> LedgerResult<i64> {
    conn.execute(
        "INSERT INTO incomes (amount, source, date) VALUES (?1, ?2, ?3)",
        params![income.amount.to_string(), &income.source, date_param(income.date)],
    )
    .map_err(storage("Failed to insert income"))?;
    Ok(conn.last_insert_rowid())
}

pub fn update_income(conn: &Connection, id: i64, income: &NewIncome) -> LedgerResult<bool> {
    let rows = conn
        .execute(
            "UPDATE incomes SET amount = ?1, source = ?2, date = ?3 WHERE id = ?4",
            params![
                income.amount.to_string(),
                &income.source,
                date_param(income.date),
                id
            ],
        )
        .map_err(storage("Failed to update income"))?;
    Ok(rows > 0)
}

pub fn delete_income(conn: &Connection, id: i64) -> LedgerResult<bool> {
    let rows = conn
        .execute("DELETE FROM incomes WHERE id = ?1", [id])
        .map_err(storage("Failed to delete income"))?;
    Ok(rows > 0)
}

pub fn incomes_in_range(
    conn: &Connection,
    start: NaiveDate,
    end: NaiveDate,
) -> LedgerResult<Vec<Income>> {
    let mut stmt = conn
        .prepare(
            "SELECT id, date, amount, COALESCE(source, '')
             FROM incomes
             WHERE date >= ?1 AND date <= ?2
             ORDER BY date DESC, id DESC",
        )
        .map_err(storage("Failed to prepare statement"))?;

    let iter = stmt
        .query_map([date_param(start), date_param(end)], income_from_row)
        .map_err(storage("Failed to query incomes"))?;

    iter.collect::<rusqlite::Result<Vec<_>>>()
        .map_err(storage("Failed to parse income"))
}

pub fn total_incomes(
    conn: &Connection,
    start: NaiveDate,
    end: NaiveDate,
) -> LedgerResult<Decimal> {
    sum_amounts(conn, "incomes", start, end)
}
