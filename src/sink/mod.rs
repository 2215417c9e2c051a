//! Subscriber sinks
//!
//! A [`Subscription`] is the consumer half of one subscriber's queue. It
//! yields frames in arrival order and unregisters itself from the registry
//! on every exit path: end of stream, a failed liveness check, or simply
//! being dropped when the transport task goes away.

pub mod liveness;
pub mod subscription;

pub use liveness::{DisconnectFlag, Liveness, LivenessFn};
pub use subscription::Subscription;
