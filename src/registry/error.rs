//! Registry error types

use thiserror::Error;

/// Error type for registry operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The subscriber limit has been reached
    #[error("subscriber limit reached ({limit})")]
    Full { limit: usize },
}

/// Why one delivery to one subscriber did not happen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DeliveryError {
    /// The consumer side has gone away
    #[error("subscriber queue closed")]
    Closed,
    /// The subscriber was unregistered after the dispatch snapshot was taken
    #[error("subscriber unregistered")]
    Unregistered,
}

/// An event could not be encoded for delivery
#[derive(Debug, Error)]
#[error("failed to encode event {id}: {source}")]
pub struct FrameError {
    pub id: u64,
    #[source]
    pub source: serde_json::Error,
}
