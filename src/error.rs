use thiserror::Error;

/// Errors surfaced by the ledger, the budget engine and the file utilities.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Any failure talking to the database, whichever backend is active.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Input rejected before it reached the ledger.
    #[error("{0}")]
    Validation(String),

    #[error("{entity} '{identifier}' not found")]
    NotFound {
        entity: &'static str,
        identifier: String,
    },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Wraps a backend error with the step that failed, e.g.
/// `.map_err(storage("Failed to query budgets"))`.
pub fn storage<E: std::fmt::Display>(context: &'static str) -> impl Fn(E) -> LedgerError {
    move |e| LedgerError::Storage(format!("{}: {}", context, e))
}

impl LedgerError {
    pub fn not_found(entity: &'static str, identifier: impl ToString) -> Self {
        LedgerError::NotFound {
            entity,
            identifier: identifier.to_string(),
        }
    }
}
