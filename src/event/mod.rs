//! Inbound message events
//!
//! The messaging client hands over loosely-checked [`RawMessage`] values.
//! The [`Normalizer`] turns each one into a fixed-shape [`InboundEvent`],
//! which is what the registry fans out and what subscribers see on the wire.
//!
//! ```text
//!   MessagingClient::next_event()
//!            │  RawMessage
//!            ▼
//!     Normalizer::normalize()  ── NormalizationError ──► dropped + logged
//!            │  InboundEvent
//!            ▼
//!   SubscriberRegistry::dispatch()
//! ```

pub mod inbound;
pub mod normalize;
pub mod raw;

pub use inbound::{InboundEvent, MessageKind};
pub use normalize::{NormalizationError, Normalizer};
pub use raw::RawMessage;
