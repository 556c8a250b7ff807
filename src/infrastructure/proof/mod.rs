//! Merkle proof generator capability

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

use crate::domain::cell::CodecError;
use crate::domain::contract::{parse_proof_hex, ProofValue};

/// Errors raised by the proof generator client
#[derive(Debug, Clone, Error)]
pub enum ProofError {
    #[error("proof generator network error: {0}")]
    Network(String),

    #[error("proof generator returned {status}: {body}")]
    Http { status: u16, body: String },

    #[error("unexpected proof generator response: {0}")]
    Parse(String),

    #[error(transparent)]
    Codec(#[from] CodecError),
}

impl From<reqwest::Error> for ProofError {
    fn from(error: reqwest::Error) -> Self {
        ProofError::Network(error.to_string())
    }
}

/// Trait for services producing storage proofs for a bag piece
#[async_trait]
pub trait ProofGenerator: Send + Sync + std::fmt::Debug {
    async fn proofs(&self, bag_id: &str, piece: u64) -> Result<Vec<ProofValue>, ProofError>;
}

#[derive(Debug, Deserialize)]
struct ProofsResponse {
    proofs: Vec<String>,
}

/// HTTP proof generator client
#[derive(Debug)]
pub struct HttpProofGenerator {
    endpoint: String,
    client: Client,
}

impl HttpProofGenerator {
    /// Create a new proof generator client
    pub fn new(endpoint: String) -> Self {
        Self {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }
}

fn parse_proofs(body: &str) -> Result<Vec<ProofValue>, ProofError> {
    let response: ProofsResponse =
        serde_json::from_str(body).map_err(|e| ProofError::Parse(e.to_string()))?;
    response
        .proofs
        .iter()
        .map(|value| parse_proof_hex(value).map_err(ProofError::from))
        .collect()
}

#[async_trait]
impl ProofGenerator for HttpProofGenerator {
    async fn proofs(&self, bag_id: &str, piece: u64) -> Result<Vec<ProofValue>, ProofError> {
        let response = self
            .client
            .get(format!("{}/api/v1/proofs", self.endpoint))
            .query(&[("bag_id", bag_id.to_string()), ("piece", piece.to_string())])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ProofError::Http {
                status: status.as_u16(),
                body,
            });
        }
        parse_proofs(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_proofs() {
        let proofs = parse_proofs(r#"{"proofs": ["0x01", "ff00"]}"#).unwrap();
        assert_eq!(proofs.len(), 2);
        assert_eq!(proofs[0][31], 1);
        assert_eq!(proofs[1][30..], [0xff, 0x00]);
    }

    #[test]
    fn test_parse_proofs_rejects_garbage() {
        assert!(matches!(
            parse_proofs(r#"{"proofs": ["zz"]}"#),
            Err(ProofError::Codec(_))
        ));
        assert!(matches!(parse_proofs("[]"), Err(ProofError::Parse(_))));
    }
}
