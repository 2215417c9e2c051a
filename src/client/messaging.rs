//! The messaging client trait and its value types

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::event::RawMessage;

/// Errors reported by a messaging client
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClientError {
    /// The client could not reach the messaging service
    #[error("connection failed: {0}")]
    Connect(String),
    /// The client is not connected (or was released)
    #[error("client not connected")]
    NotConnected,
    /// A call reached the service but failed
    #[error("call failed: {0}")]
    Call(String),
}

/// Options for inbound delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryFlags {
    /// Also deliver moments feed updates
    pub include_moments: bool,
}

impl Default for DeliveryFlags {
    fn default() -> Self {
        Self {
            include_moments: true,
        }
    }
}

/// The logged-in account
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub wxid: String,
    pub name: String,
    pub mobile: String,
    pub home: String,
}

/// One entry of the contact list
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub wxid: String,
    pub code: String,
    pub remark: String,
    pub name: String,
    pub country: String,
    pub province: String,
    pub city: String,
    pub gender: String,
}

/// Blocking client for the external messaging service
///
/// Implementations are shared between the receiver thread and the lifecycle
/// manager, so every method takes `&self`. `next_event` may block for up to
/// `timeout`; nothing else in the relay waits on it.
pub trait MessagingClient: Send + Sync + 'static {
    /// Establish the connection to the service
    fn connect(&self) -> Result<(), ClientError>;

    /// Release the connection
    ///
    /// The relay calls this exactly once during shutdown.
    fn release(&self);

    /// Fetch the next inbound message
    ///
    /// Returns `Ok(None)` when nothing arrived within `timeout`.
    fn next_event(&self, timeout: Duration) -> Result<Option<RawMessage>, ClientError>;

    /// Whether inbound delivery is currently enabled
    fn is_delivery_enabled(&self) -> bool;

    /// Enable inbound delivery
    fn set_delivery_enabled(&self, flags: DeliveryFlags) -> Result<(), ClientError>;

    /// Disable inbound delivery
    fn disable_delivery(&self) -> Result<(), ClientError>;

    /// The account's own identifier
    fn self_id(&self) -> Result<String, ClientError>;

    /// Profile of the logged-in account
    fn identity(&self) -> Result<Identity, ClientError>;

    /// Current contact list
    fn contacts(&self) -> Result<Vec<Contact>, ClientError>;

    /// Send a plain text notification to `target`
    fn send_notification(&self, text: &str, target: &str) -> Result<(), ClientError>;
}
