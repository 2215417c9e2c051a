//! Subscriber registry and fan-out dispatch
//!
//! The registry owns the set of live subscribers and delivers each inbound
//! event to every one of them. Each subscriber has its own unbounded queue,
//! so a slow consumer never holds up the receiver thread or its peers.
//!
//! # Architecture
//!
//! ```text
//!                        Arc<SubscriberRegistry>
//!                    ┌──────────────────────────────┐
//!                    │ sinks: Mutex<HashMap<Id,     │
//!                    │   Arc<SinkEntry {            │
//!                    │     tx: mpsc::Unbounded,     │
//!                    │   }>                         │
//!                    │ >                            │
//!                    └──────────────┬───────────────┘
//!                                   │ snapshot
//!         ┌─────────────────────────┼─────────────────────────┐
//!         │                         │                         │
//!         ▼                         ▼                         ▼
//!  [Receiver thread]          [Subscription]            [Subscription]
//!  registry.publish()         stream.next()             stream.next()
//!         │                         │                         │
//!         └──► dispatch() ──► SinkEntry::deliver() ──► SSE ──► HTTP
//! ```
//!
//! # Shared payloads
//!
//! Every event is serialized once per dispatch into an [`EventFrame`]. The
//! frame's `Bytes` payload and `Arc` event are reference-counted, so each
//! queue push is a pointer copy rather than a new encoding.

pub mod config;
pub mod entry;
pub mod error;
pub mod frame;
pub mod store;

pub use config::RegistryConfig;
pub use entry::{SinkEntry, SubscriberId};
pub use error::{DeliveryError, FrameError, RegistryError};
pub use frame::EventFrame;
pub use store::{DispatchReport, SubscriberRegistry};
