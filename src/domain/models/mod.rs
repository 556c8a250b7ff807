pub mod order;
pub mod task;
pub mod transaction;

pub use order::{Order, OrderDetails, OrderState, TreasuryInfo};
pub use task::{InvalidTransition, NewTask, Task, TaskState, TaskUpdate};
pub use transaction::{
    ChainTransaction, InMessage, NewTransaction, OutMessage, TransactionDetail, TransactionRecord,
};
