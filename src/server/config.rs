//! Server configuration

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::error::{Error, Result};

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 8000;

/// SSE event name used for inbound messages
pub const DEFAULT_EVENT_NAME: &str = "message";

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Interval between SSE keep-alive comments
    ///
    /// Writing the comment is what exposes a dead peer while no messages
    /// are flowing.
    pub keep_alive_interval: Duration,

    /// How often each subscription checks whether the server is closing
    pub liveness_interval: Duration,

    /// How often the registry is swept for subscribers whose consumer is gone
    pub reap_interval: Duration,

    /// SSE event name for inbound messages
    pub event_name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            keep_alive_interval: Duration::from_secs(15),
            liveness_interval: Duration::from_secs(1),
            reap_interval: Duration::from_secs(30),
            event_name: DEFAULT_EVENT_NAME.to_string(),
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set keep-alive interval
    pub fn keep_alive_interval(mut self, interval: Duration) -> Self {
        self.keep_alive_interval = interval;
        self
    }

    /// Set liveness check interval
    pub fn liveness_interval(mut self, interval: Duration) -> Self {
        self.liveness_interval = interval;
        self
    }

    /// Set reaper interval
    pub fn reap_interval(mut self, interval: Duration) -> Self {
        self.reap_interval = interval;
        self
    }

    /// Set the SSE event name
    pub fn event_name(mut self, name: impl Into<String>) -> Self {
        self.event_name = name.into();
        self
    }

    /// Check that the options can be served
    ///
    /// Every interval must be non-zero and the event name must be a single
    /// non-empty line.
    pub fn validate(&self) -> Result<()> {
        let intervals = [
            ("keep_alive_interval", self.keep_alive_interval),
            ("liveness_interval", self.liveness_interval),
            ("reap_interval", self.reap_interval),
        ];
        for (name, interval) in intervals {
            if interval.is_zero() {
                return Err(Error::Config(format!("{name} must be non-zero")));
            }
        }

        let multiline = self.event_name.contains(|c: char| c == '\r' || c == '\n');
        if self.event_name.is_empty() || multiline {
            return Err(Error::Config(format!(
                "invalid SSE event name {:?}",
                self.event_name
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();

        assert_eq!(config.bind_addr.port(), 8000);
        assert!(config.bind_addr.ip().is_unspecified());
        assert_eq!(config.keep_alive_interval, Duration::from_secs(15));
        assert_eq!(config.liveness_interval, Duration::from_secs(1));
        assert_eq!(config.event_name, "message");
    }

    #[test]
    fn test_with_addr() {
        let addr: SocketAddr = "127.0.0.1:9000".parse().unwrap();
        let config = ServerConfig::with_addr(addr);

        assert_eq!(config.bind_addr.port(), 9000);
    }

    #[test]
    fn test_builder_chaining() {
        let addr: SocketAddr = "127.0.0.1:8080".parse().unwrap();
        let config = ServerConfig::default()
            .bind(addr)
            .keep_alive_interval(Duration::from_secs(5))
            .liveness_interval(Duration::from_millis(250))
            .reap_interval(Duration::from_secs(10))
            .event_name("wx");

        assert_eq!(config.bind_addr, addr);
        assert_eq!(config.keep_alive_interval, Duration::from_secs(5));
        assert_eq!(config.liveness_interval, Duration::from_millis(250));
        assert_eq!(config.reap_interval, Duration::from_secs(10));
        assert_eq!(config.event_name, "wx");
    }

    #[test]
    fn test_validate() {
        assert!(ServerConfig::default().validate().is_ok());

        let zero = ServerConfig::default().liveness_interval(Duration::ZERO);
        assert!(matches!(zero.validate(), Err(Error::Config(_))));

        let zero = ServerConfig::default().reap_interval(Duration::ZERO);
        assert!(matches!(zero.validate(), Err(Error::Config(_))));

        let zero = ServerConfig::default().keep_alive_interval(Duration::ZERO);
        assert!(matches!(zero.validate(), Err(Error::Config(_))));

        for name in ["", "two\nlines", "cr\r"] {
            let bad = ServerConfig::default().event_name(name);
            assert!(matches!(bad.validate(), Err(Error::Config(_))), "{name:?}");
        }
    }
}
