use thiserror::Error;

use crate::domain::cell::CodecError;
use crate::domain::contract::PriceError;
use crate::domain::models::InvalidTransition;
use crate::infrastructure::persistence::error::DbError;
use crate::infrastructure::proof::ProofError;
use crate::infrastructure::storage_daemon::DaemonError;
use crate::infrastructure::ton::ChainError;

/// Error type for the agent's polling units
#[derive(Debug, Error)]
pub enum AgentError {
    /// The tracked contract is not active; fatal for the indexer
    #[error("contract {0} is not active")]
    ContractInactive(String),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("price error: {0}")]
    Price(#[from] PriceError),

    #[error("chain error: {0}")]
    Chain(#[from] ChainError),

    #[error("storage daemon error: {0}")]
    Daemon(#[from] DaemonError),

    #[error("proof generator error: {0}")]
    Proof(#[from] ProofError),

    #[error("database error: {0}")]
    Db(#[from] DbError),

    #[error(transparent)]
    Transition(#[from] InvalidTransition),

    /// A referenced row is missing
    #[error("not found: {0}")]
    NotFound(String),

    /// A unit returned although it is meant to run forever
    #[error("unit {0} stopped unexpectedly")]
    UnitStopped(String),
}

impl From<sea_orm::DbErr> for AgentError {
    fn from(error: sea_orm::DbErr) -> Self {
        AgentError::Db(DbError::from(error))
    }
}
