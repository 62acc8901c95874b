use crate::db::LedgerStore;
use crate::error::{LedgerError, LedgerResult};
use crate::operations::add::parse_id;

pub fn remove_expense_from_db(store: &dyn LedgerStore, id_str: &str) -> LedgerResult<()> {
    let id = parse_id(id_str)?;
    if !store.delete_expense(id)? {
        return Err(LedgerError::not_found("Expense", id));
    }
    tracing::info!(id, "expense removed");
    Ok(())
}

pub fn remove_income_from_db(store: &dyn LedgerStore, id_str: &str) -> LedgerResult<()> {
    let id = parse_id(id_str)?;
    if !store.delete_income(id)? {
        return Err(LedgerError::not_found("Income", id));
    }
    tracing::info!(id, "income removed");
    Ok(())
}
