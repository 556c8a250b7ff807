//! "Sign and send" capability backed by a remote signer service

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::ChainError;
use crate::domain::cell::{Address, Cell};

/// Outgoing internal message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub to: Address,
    /// Nanotons
    pub value: u128,
    pub bounce: bool,
    pub body: Arc<Cell>,
}

/// Trait for wallets able to sign and send messages
#[async_trait]
pub trait WalletSigner: Send + Sync + std::fmt::Debug {
    /// Address of the provider wallet
    fn address(&self) -> Address;

    /// Sign and broadcast a message from the provider wallet
    async fn send(&self, message: OutgoingMessage) -> Result<(), ChainError>;
}

#[derive(Debug, Serialize)]
struct SendRequest {
    to: String,
    value: String,
    bounce: bool,
    body: String,
}

#[derive(Debug, Deserialize)]
struct AddressResponse {
    address: String,
}

#[derive(Debug, Deserialize)]
struct SendResponse {
    #[serde(default = "default_ok")]
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

fn default_ok() -> bool {
    true
}

/// Wallet whose keys live in a separate signer process
#[derive(Debug)]
pub struct RemoteSigner {
    endpoint: String,
    address: Address,
    client: Client,
}

impl RemoteSigner {
    /// Connect to the signer and resolve the wallet address it signs for
    pub async fn connect(endpoint: String) -> Result<Self, ChainError> {
        let endpoint = endpoint.trim_end_matches('/').to_string();
        let client = Client::new();

        let response = client.get(format!("{}/v1/address", endpoint)).send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(ChainError::Signer(format!(
                "address request failed with {}: {}",
                status, text
            )));
        }
        let parsed: AddressResponse =
            serde_json::from_str(&text).map_err(|e| ChainError::Parse(e.to_string()))?;
        let address = parsed.address.parse::<Address>()?;

        Ok(Self {
            endpoint,
            address,
            client,
        })
    }
}

#[async_trait]
impl WalletSigner for RemoteSigner {
    fn address(&self) -> Address {
        self.address
    }

    async fn send(&self, message: OutgoingMessage) -> Result<(), ChainError> {
        let request = SendRequest {
            to: message.to.to_string(),
            value: message.value.to_string(),
            bounce: message.bounce,
            body: message.body.to_boc_base64(),
        };

        let response = self
            .client
            .post(format!("{}/v1/send", self.endpoint))
            .json(&request)
            .send()
            .await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(ChainError::Signer(format!("send failed with {}: {}", status, text)));
        }

        let parsed: SendResponse = if text.trim().is_empty() {
            SendResponse {
                ok: true,
                error: None,
            }
        } else {
            serde_json::from_str(&text).map_err(|e| ChainError::Parse(e.to_string()))?
        };
        if !parsed.ok {
            return Err(ChainError::Signer(
                parsed.error.unwrap_or_else(|| "send rejected".to_string()),
            ));
        }
        Ok(())
    }
}
