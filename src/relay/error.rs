//! Startup error types

use thiserror::Error;

use crate::client::ClientError;

/// A fatal failure while starting the relay
///
/// When any of these is returned the client has already been released.
#[derive(Debug, Error)]
pub enum StartupError {
    /// The client could not connect
    #[error("connecting to messaging service: {0}")]
    Connect(#[source] ClientError),

    /// The account identity could not be read
    #[error("reading account identity: {0}")]
    Identity(#[source] ClientError),

    /// Inbound delivery could not be enabled
    #[error("enabling inbound delivery: {0}")]
    EnableDelivery(#[source] ClientError),

    /// The receiver thread could not be spawned
    #[error("spawning receiver thread: {0}")]
    Spawn(#[source] std::io::Error),
}
