//! TON chain access: node provider, wallet signer and the storage contract proxy

pub mod contract;
pub mod error;
pub mod provider;
pub mod provider_factory;
pub mod retry_handler;
pub mod toncenter;
pub mod wallet;

pub use contract::{StorageContract, TonStorageContract};
pub use error::ChainError;
pub use provider::{
    AccountState, AccountStatus, ChainProvider, StackEntry, TransactionId, TransactionLookup,
};
pub use provider_factory::ProviderFactory;
pub use retry_handler::RetryHandler;
pub use toncenter::ToncenterProvider;
pub use wallet::{OutgoingMessage, RemoteSigner, WalletSigner};
