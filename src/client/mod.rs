//! Messaging client boundary
//!
//! The relay talks to the messaging service only through [`MessagingClient`].
//! Everything else the service can do (sending files, database queries,
//! downloads) belongs to callers outside the relay and is not modelled here.
//!
//! [`LoopbackClient`] is an in-process implementation fed from a
//! [`LoopbackFeeder`]; it backs the demo server and the test suite.

pub mod loopback;
pub mod messaging;

pub use loopback::{LoopbackClient, LoopbackFeeder};
pub use messaging::{ClientError, Contact, DeliveryFlags, Identity, MessagingClient};
