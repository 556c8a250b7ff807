//! Chain access capability and the values it reports

use async_trait::async_trait;

use super::error::ChainError;
use crate::domain::models::ChainTransaction;

/// Lifecycle status of an account as reported by the node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountStatus {
    Active,
    Uninit,
    Frozen,
    Nonexist,
}

impl AccountStatus {
    pub fn parse(value: &str) -> Self {
        match value {
            "active" => AccountStatus::Active,
            "frozen" => AccountStatus::Frozen,
            "uninit" => AccountStatus::Uninit,
            _ => AccountStatus::Nonexist,
        }
    }
}

/// Pointer to a transaction: logical time plus hex hash
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionId {
    pub lt: u64,
    pub hash: String,
}

/// Account snapshot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountState {
    pub status: AccountStatus,
    /// Balance in nanotons
    pub balance: u128,
    /// Base64 BoC of the persistent data, when deployed
    pub data: Option<String>,
    pub last_transaction: Option<TransactionId>,
}

impl AccountState {
    pub fn nonexistent() -> Self {
        Self {
            status: AccountStatus::Nonexist,
            balance: 0,
            data: None,
            last_transaction: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }
}

/// Outcome of a transaction lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionLookup {
    Found(ChainTransaction),
    /// The node no longer (or not yet) knows the transaction
    Expired,
    /// Any other failure, already logged by the provider
    Failed(String),
}

/// TVM stack entry exchanged with get-methods
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackEntry {
    Num(i128),
    /// Base64 BoC
    Cell(String),
    /// Base64 BoC
    Slice(String),
}

impl StackEntry {
    pub fn as_num(&self) -> Option<i128> {
        match self {
            StackEntry::Num(value) => Some(*value),
            _ => None,
        }
    }
}

/// Trait for chain access providers
#[async_trait]
pub trait ChainProvider: Send + Sync + std::fmt::Debug {
    /// Get the provider name for identification
    fn provider_name(&self) -> String;

    /// Current state of an account
    async fn get_account_state(&self, address: &str) -> Result<AccountState, ChainError>;

    /// A single transaction of `address` identified by lt and hash
    async fn get_transaction(&self, address: &str, lt: u64, hash: &str) -> TransactionLookup;

    /// Run a get-method and return its result stack
    async fn run_get_method(
        &self,
        address: &str,
        method: &str,
        stack: Vec<StackEntry>,
    ) -> Result<Vec<StackEntry>, ChainError>;
}
