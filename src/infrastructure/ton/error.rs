use thiserror::Error;

use crate::domain::cell::CodecError;

const UNKNOWN_TRANSACTION_MARKER: &str = "LITE_SERVER_UNKNOWN";

/// Errors raised talking to the chain node or the wallet signer
#[derive(Debug, Clone, Error)]
pub enum ChainError {
    /// Request could not be sent or the response could not be read
    #[error("network error: {0}")]
    Network(String),

    /// Node answered with a non-success status
    #[error("http status {status}: {body}")]
    Http { status: u16, body: String },

    /// Response did not have the expected shape
    #[error("unexpected response: {0}")]
    Parse(String),

    #[error(transparent)]
    Codec(#[from] CodecError),

    /// A get-method ran but exited with an error code
    #[error("get-method {method} exited with code {exit_code}")]
    GetMethod { method: String, exit_code: i64 },

    /// The remote signer refused or failed to send a message
    #[error("signer error: {0}")]
    Signer(String),
}

impl ChainError {
    /// The node does not know the requested transaction (pruned or not yet visible)
    pub fn is_unknown_transaction(&self) -> bool {
        match self {
            ChainError::Http { body, .. } => body.contains(UNKNOWN_TRANSACTION_MARKER),
            _ => false,
        }
    }

    /// Transient failures worth another attempt
    pub fn is_retryable(&self) -> bool {
        match self {
            ChainError::Network(_) => true,
            ChainError::Http { status, .. } => {
                (*status == 429 || *status >= 500) && !self.is_unknown_transaction()
            }
            _ => false,
        }
    }
}

impl From<reqwest::Error> for ChainError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            ChainError::Parse(error.to_string())
        } else {
            ChainError::Network(error.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_transaction_is_not_retried() {
        let unknown = ChainError::Http {
            status: 500,
            body: r#"{"ok":false,"error":"LITE_SERVER_UNKNOWN: cannot load transaction"}"#.to_string(),
        };
        assert!(unknown.is_unknown_transaction());
        assert!(!unknown.is_retryable());

        let overloaded = ChainError::Http {
            status: 503,
            body: "busy".to_string(),
        };
        assert!(overloaded.is_retryable());
        assert!(ChainError::Network("reset".to_string()).is_retryable());
        assert!(!ChainError::Parse("bad json".to_string()).is_retryable());
    }
}
