pub mod cell;
pub mod contract;
pub mod errors;
pub mod models;
