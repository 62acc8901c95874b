pub mod add;
pub mod alerts;
pub mod backup;
pub mod budget;
pub mod budget_status;
pub mod category;
pub mod export;
pub mod migrate;
pub mod remove;
pub mod report;
