pub mod transaction_indexer;

pub use transaction_indexer::TransactionIndexer;
