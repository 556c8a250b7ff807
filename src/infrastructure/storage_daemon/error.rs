use thiserror::Error;

/// Errors raised by the storage daemon client
#[derive(Debug, Clone, Error)]
pub enum DaemonError {
    #[error("storage daemon network error: {0}")]
    Network(String),

    #[error("storage daemon returned {status}: {body}")]
    Http { status: u16, body: String },

    #[error("storage daemon rejected request: {0}")]
    Rejected(String),

    #[error("unexpected storage daemon response: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for DaemonError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            DaemonError::Parse(error.to_string())
        } else {
            DaemonError::Network(error.to_string())
        }
    }
}
