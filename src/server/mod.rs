//! HTTP transport
//!
//! Exposes the relay over HTTP with axum:
//!
//! - `GET /`: service liveness
//! - `GET /subscribe`: Server-Sent Events stream, one `message` event per
//!   inbound message
//! - `GET /stats`: relay counters
//!
//! Each `/subscribe` request owns one [`Subscription`](crate::sink::Subscription).
//! When the peer goes away hyper drops the response stream, which drops the
//! subscription and unregisters it.

pub mod config;
pub mod handler;
pub mod listener;

pub use config::ServerConfig;
pub use handler::AppState;
pub use listener::RelayServer;
