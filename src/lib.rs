//! wcf-relay: fan-out of inbound chat messages to live HTTP subscribers
//!
//! A single receiver thread pulls messages from a blocking
//! [`MessagingClient`], normalizes them into [`InboundEvent`]s and hands each
//! one to every subscriber currently registered with the
//! [`SubscriberRegistry`]. Subscribers are consumed as Server-Sent Events
//! streams by [`RelayServer`].
//!
//! ```text
//!   MessagingClient ──> ReceiverLoop ──> SubscriberRegistry ──┬──> Subscription ──> SSE
//!     (blocking)        (own thread)      (encode once)       ├──> Subscription ──> SSE
//!                                                             └──> Subscription ──> SSE
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use wcf_relay::{LoopbackClient, Relay, RelayConfig, RelayServer, ServerConfig};
//!
//! # async fn run() -> wcf_relay::Result<()> {
//! let (client, _feeder) = LoopbackClient::with_wxid("wxid_self");
//! let relay = Arc::new(Relay::start(Arc::new(client), RelayConfig::default())?);
//!
//! let server = RelayServer::new(ServerConfig::default(), relay.clone());
//! server.run_until(async { let _ = tokio::signal::ctrl_c().await; }).await?;
//!
//! relay.shutdown().await;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod event;
pub mod receiver;
pub mod registry;
pub mod relay;
pub mod server;
pub mod sink;
pub mod stats;

pub use client::{ClientError, DeliveryFlags, LoopbackClient, LoopbackFeeder, MessagingClient};
pub use config::Settings;
pub use error::{Error, Result};
pub use event::{InboundEvent, MessageKind, Normalizer, RawMessage};
pub use receiver::{ReceiverConfig, ReceiverState};
pub use registry::{EventFrame, RegistryConfig, SubscriberId, SubscriberRegistry};
pub use relay::{Relay, RelayConfig, ShutdownReport, StartupError};
pub use server::{RelayServer, ServerConfig};
pub use sink::Subscription;
pub use stats::StatsSnapshot;
