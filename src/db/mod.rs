pub mod budget_repository;
pub mod connection;
pub mod postgres_store;
pub mod repository;
pub mod sqlite_store;
pub mod store;

pub use sqlite_store::SqliteStore;
pub use store::{open_store, LedgerStore};
