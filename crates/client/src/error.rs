//! Error types at the client boundary.

use thiserror::Error;

use ledgerly_auth::PersistError;
use ledgerly_core::DomainError;

/// Failure of a capability fetch.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("network error: {0}")]
    Network(String),

    #[error("API error ({0}): {1}")]
    Api(u16, String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("HTTP client setup failed: {0}")]
    Client(String),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to resolve session storage location: {0}")]
    Location(String),

    #[error("session storage I/O failed at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("session storage at {path} is not a JSON object of strings: {source}")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Persist(#[from] PersistError),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {message}")]
    Invalid { key: &'static str, message: String },
}

/// Top-level error of the access provider.
#[derive(Debug, Error)]
pub enum AccessError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}
