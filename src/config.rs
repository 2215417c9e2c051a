//! Settings file
//!
//! Optional TOML file covering the server and relay options. Every key has
//! a default, so an empty file (or no file) gives the stock configuration.
//!
//! ```toml
//! [server]
//! bind = "127.0.0.1:8000"
//! keep_alive_secs = 15
//!
//! [relay]
//! notify_target = "filehelper"
//! max_subscribers = 64
//! ```

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::Result;
use crate::receiver::ReceiverConfig;
use crate::registry::RegistryConfig;
use crate::relay::config::{DEFAULT_NOTIFY_TARGET, DEFAULT_NOTIFY_TEXT};
use crate::relay::RelayConfig;
use crate::server::ServerConfig;

/// `[server]` section
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerSettings {
    pub bind: SocketAddr,
    pub keep_alive_secs: u64,
    pub liveness_ms: u64,
    pub reap_secs: u64,
    pub event_name: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        let config = ServerConfig::default();
        Self {
            bind: config.bind_addr,
            keep_alive_secs: config.keep_alive_interval.as_secs(),
            liveness_ms: config.liveness_interval.as_millis() as u64,
            reap_secs: config.reap_interval.as_secs(),
            event_name: config.event_name,
        }
    }
}

/// `[relay]` section
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RelaySettings {
    /// Send the readiness notification at startup
    pub notify: bool,
    pub notify_text: String,
    pub notify_target: String,
    pub include_moments: bool,
    pub shutdown_grace_ms: u64,
    /// 0 = unlimited
    pub max_subscribers: usize,
    pub poll_timeout_ms: u64,
    pub empty_backoff_ms: u64,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            notify: true,
            notify_text: DEFAULT_NOTIFY_TEXT.to_string(),
            notify_target: DEFAULT_NOTIFY_TARGET.to_string(),
            include_moments: true,
            shutdown_grace_ms: 5_000,
            max_subscribers: 0,
            poll_timeout_ms: 1_000,
            empty_backoff_ms: 1_000,
        }
    }
}

/// Complete settings file
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub server: ServerSettings,
    pub relay: RelaySettings,
}

impl Settings {
    /// Parse settings from TOML text
    ///
    /// Values the server cannot run with (zero intervals, a multi-line
    /// event name) are rejected here.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let settings: Self = toml::from_str(text)?;
        settings.server_config().validate()?;
        Ok(settings)
    }

    /// Read settings from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let settings = Self::from_toml_str(&text)?;
        tracing::info!(path = %path.as_ref().display(), "Settings loaded");
        Ok(settings)
    }

    /// Server options
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig::with_addr(self.server.bind)
            .keep_alive_interval(Duration::from_secs(self.server.keep_alive_secs))
            .liveness_interval(Duration::from_millis(self.server.liveness_ms))
            .reap_interval(Duration::from_secs(self.server.reap_secs))
            .event_name(self.server.event_name.clone())
    }

    /// Relay options
    pub fn relay_config(&self) -> RelayConfig {
        let relay = &self.relay;
        let config = RelayConfig::default()
            .include_moments(relay.include_moments)
            .shutdown_grace(Duration::from_millis(relay.shutdown_grace_ms))
            .registry(RegistryConfig::default().max_subscribers(relay.max_subscribers))
            .receiver(
                ReceiverConfig::default()
                    .poll_timeout(Duration::from_millis(relay.poll_timeout_ms))
                    .empty_backoff(Duration::from_millis(relay.empty_backoff_ms)),
            );

        if relay.notify {
            config.notify(relay.notify_text.clone(), relay.notify_target.clone())
        } else {
            config.no_notify()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::error::Error;

    #[test]
    fn test_empty_is_default() {
        let settings = Settings::from_toml_str("").unwrap();
        assert_eq!(settings, Settings::default());

        let server = settings.server_config();
        assert_eq!(server.bind_addr, ServerConfig::default().bind_addr);
        assert_eq!(server.keep_alive_interval, Duration::from_secs(15));

        let relay = settings.relay_config();
        assert_eq!(relay.notify_text.as_deref(), Some(DEFAULT_NOTIFY_TEXT));
        assert_eq!(relay.receiver.empty_backoff, Duration::from_secs(1));
    }

    #[test]
    fn test_partial_override() {
        let settings = Settings::from_toml_str(
            r#"
            [server]
            bind = "127.0.0.1:9100"
            liveness_ms = 250

            [relay]
            notify = false
            max_subscribers = 8
            "#,
        )
        .unwrap();

        let server = settings.server_config();
        assert_eq!(server.bind_addr, "127.0.0.1:9100".parse().unwrap());
        assert_eq!(server.liveness_interval, Duration::from_millis(250));
        assert_eq!(server.event_name, "message");

        let relay = settings.relay_config();
        assert!(relay.notify_text.is_none());
        assert_eq!(relay.registry.max_subscribers, 8);
        assert_eq!(relay.shutdown_grace, Duration::from_secs(5));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = Settings::from_toml_str("[relay]\napi_tokens = [\"x\"]\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_zero_interval_rejected() {
        for text in [
            "[server]\nliveness_ms = 0\n",
            "[server]\nreap_secs = 0\n",
            "[server]\nkeep_alive_secs = 0\n",
        ] {
            let err = Settings::from_toml_str(text).unwrap_err();
            assert!(matches!(err, Error::Config(_)), "{text:?}");
        }
    }

    #[test]
    fn test_multiline_event_name_rejected() {
        let err = Settings::from_toml_str("[server]\nevent_name = \"a\\nb\"\n").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[relay]\nnotify_target = \"wxid_admin\"").unwrap();

        let settings = Settings::from_file(file.path()).unwrap();
        assert_eq!(settings.relay.notify_target, "wxid_admin");
    }

    #[test]
    fn test_missing_file() {
        let err = Settings::from_file("/nonexistent/wcf-relay.toml").unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
