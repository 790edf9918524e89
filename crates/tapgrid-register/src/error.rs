//! Registration errors.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RegisterError {
    #[error("invalid simulator url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("unsupported scheme in {0}: only http is supported")]
    UnsupportedScheme(String),

    #[error("connection to {addr} failed: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("http exchange failed: {0}")]
    Http(#[from] hyper::Error),

    #[error("failed to build request: {0}")]
    Request(#[from] http::Error),

    #[error("failed to encode registration payload: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("registration timed out after {0:?}")]
    Timeout(Duration),
}

impl RegisterError {
    /// Whether another attempt could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            RegisterError::Connect { .. } | RegisterError::Http(_) | RegisterError::Timeout(_)
        )
    }
}
