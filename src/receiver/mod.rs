//! Background receiver
//!
//! One dedicated thread pulls raw messages from the blocking messaging
//! client, normalizes them and hands them to the registry. It is the only
//! producer in the relay.
//!
//! ```text
//!   Init ──► Running ◄──► EmptyWait
//!               │
//!               ▼
//!            Stopped   (delivery disabled or stop requested)
//! ```

pub mod config;
pub mod state;
pub mod worker;

pub use config::ReceiverConfig;
pub use state::{ReceiverState, StateCell};
pub use worker::{ReceiveOutcome, ReceiverExit, ReceiverHandle, ReceiverLoop};
