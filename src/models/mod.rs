pub mod budget;
pub mod category;
pub mod expense;
pub mod income;
