//! Crate-level error types
//!
//! Per-event and per-subscriber errors live next to the code that recovers
//! from them (`event`, `registry`). This type covers the failures that are
//! surfaced to the operator: startup, settings and the HTTP listener.

use thiserror::Error;

use crate::client::ClientError;
use crate::registry::RegistryError;
use crate::relay::StartupError;

/// Error type for relay operations
#[derive(Debug, Error)]
pub enum Error {
    /// Socket or file I/O failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The relay could not be started
    #[error("Startup failed: {0}")]
    Startup(#[from] StartupError),

    /// The messaging client reported an error
    #[error("Client error: {0}")]
    Client(#[from] ClientError),

    /// Registry rejected an operation
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Settings could not be parsed
    #[error("Config error: {0}")]
    Config(String),
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}

/// Result type for relay operations
pub type Result<T> = std::result::Result<T, Error>;
