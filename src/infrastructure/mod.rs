pub mod persistence;
pub mod proof;
pub mod storage_daemon;
pub mod ton;
