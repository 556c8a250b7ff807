pub mod analyzer;
pub mod refresher;

pub use analyzer::OrderAnalyzer;
pub use refresher::OrderRefresher;
