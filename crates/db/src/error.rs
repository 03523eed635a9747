use thiserror::Error;

/// Failures reported by a [`Store`](crate::Store) implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("store responded with {status}: {message}")]
    Status { status: u16, message: String },

    #[error("failed to decode store response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("store is unavailable")]
    Unavailable,

    #[error("unknown remote procedure '{0}'")]
    UnknownFunction(String),

    #[error("store misconfigured: {0}")]
    Config(String),
}
