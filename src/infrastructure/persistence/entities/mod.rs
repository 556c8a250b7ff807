pub mod configs;
pub mod orders;
pub mod tasks;
pub mod transactions;
