//! Factory for the chain handles built at startup

use std::sync::Arc;

use super::contract::{StorageContract, TonStorageContract};
use super::error::ChainError;
use super::provider::ChainProvider;
use super::retry_handler::RetryHandler;
use super::toncenter::ToncenterProvider;
use super::wallet::{RemoteSigner, WalletSigner};
use crate::config::{TonConfig, WalletConfig};

/// Factory for creating chain providers and the contract proxy
pub struct ProviderFactory;

impl ProviderFactory {
    /// Create the node provider described by the configuration
    pub fn create_provider(config: &TonConfig) -> Arc<dyn ChainProvider> {
        let retry_handler =
            RetryHandler::with_config(config.request_retries, config.request_retry_delay_ms);
        Arc::new(ToncenterProvider::new(
            config.api_url.clone(),
            config.api_key.clone(),
            retry_handler,
        ))
    }

    /// Connect to the remote signer
    pub async fn create_wallet(config: &WalletConfig) -> Result<Arc<dyn WalletSigner>, ChainError> {
        let signer = RemoteSigner::connect(config.signer_url.clone()).await?;
        Ok(Arc::new(signer))
    }

    pub fn create_storage_contract(
        provider: Arc<dyn ChainProvider>,
        wallet: Arc<dyn WalletSigner>,
    ) -> Arc<dyn StorageContract> {
        Arc::new(TonStorageContract::new(provider, wallet))
    }

    /// Get provider name for logging
    pub fn get_provider_name(config: &TonConfig) -> String {
        format!("toncenter ({})", config.network)
    }
}
