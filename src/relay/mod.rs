//! Relay lifecycle
//!
//! [`Relay`] owns the startup sequence (connect, capture identity, enable
//! delivery, announce, spawn the receiver) and the matching shutdown (stop
//! the receiver, release the client exactly once).

pub mod config;
pub mod error;
pub mod manager;

pub use config::RelayConfig;
pub use error::StartupError;
pub use manager::{enable_delivery, AccountSnapshot, Relay, ShutdownReport};
