//! Relay configuration

use std::time::Duration;

use crate::client::DeliveryFlags;
use crate::receiver::ReceiverConfig;
use crate::registry::RegistryConfig;

/// Default readiness notification text
pub const DEFAULT_NOTIFY_TEXT: &str = "WCF HTTP 服务已启动";

/// Default readiness notification target
pub const DEFAULT_NOTIFY_TARGET: &str = "filehelper";

/// Relay lifecycle options
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Inbound delivery options
    pub delivery: DeliveryFlags,

    /// Readiness notification text (`None` = don't send one)
    pub notify_text: Option<String>,

    /// Readiness notification target
    pub notify_target: String,

    /// How long shutdown waits for the receiver to exit
    pub shutdown_grace: Duration,

    /// Receiver loop options
    pub receiver: ReceiverConfig,

    /// Registry options
    pub registry: RegistryConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            delivery: DeliveryFlags::default(),
            notify_text: Some(DEFAULT_NOTIFY_TEXT.to_string()),
            notify_target: DEFAULT_NOTIFY_TARGET.to_string(),
            shutdown_grace: Duration::from_secs(5),
            receiver: ReceiverConfig::default(),
            registry: RegistryConfig::default(),
        }
    }
}

impl RelayConfig {
    /// Set the readiness notification
    pub fn notify(mut self, text: impl Into<String>, target: impl Into<String>) -> Self {
        self.notify_text = Some(text.into());
        self.notify_target = target.into();
        self
    }

    /// Don't send a readiness notification
    pub fn no_notify(mut self) -> Self {
        self.notify_text = None;
        self
    }

    /// Set the shutdown grace period
    pub fn shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// Set receiver options
    pub fn receiver(mut self, receiver: ReceiverConfig) -> Self {
        self.receiver = receiver;
        self
    }

    /// Set registry options
    pub fn registry(mut self, registry: RegistryConfig) -> Self {
        self.registry = registry;
        self
    }

    /// Set whether moments feed updates are delivered
    pub fn include_moments(mut self, include: bool) -> Self {
        self.delivery.include_moments = include;
        self
    }
}
