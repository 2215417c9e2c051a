//! Receiver configuration

use std::time::Duration;

/// Receiver loop options
#[derive(Debug, Clone)]
pub struct ReceiverConfig {
    /// How long one fetch may block waiting for a message
    pub poll_timeout: Duration,

    /// Pause after an empty fetch or a client read error
    pub empty_backoff: Duration,

    /// Name of the receiver thread
    pub thread_name: String,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            poll_timeout: Duration::from_secs(1),
            empty_backoff: Duration::from_secs(1),
            thread_name: "wcf-receiver".to_string(),
        }
    }
}

impl ReceiverConfig {
    /// Set the fetch timeout
    pub fn poll_timeout(mut self, timeout: Duration) -> Self {
        self.poll_timeout = timeout;
        self
    }

    /// Set the backoff after an empty fetch
    pub fn empty_backoff(mut self, backoff: Duration) -> Self {
        self.empty_backoff = backoff;
        self
    }

    /// Set the receiver thread name
    pub fn thread_name(mut self, name: impl Into<String>) -> Self {
        self.thread_name = name.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ReceiverConfig::default();
        assert_eq!(config.poll_timeout, Duration::from_secs(1));
        assert_eq!(config.empty_backoff, Duration::from_secs(1));
        assert_eq!(config.thread_name, "wcf-receiver");
    }

    #[test]
    fn test_builder_chaining() {
        let config = ReceiverConfig::default()
            .poll_timeout(Duration::from_millis(50))
            .empty_backoff(Duration::from_millis(5))
            .thread_name("rx");

        assert_eq!(config.poll_timeout, Duration::from_millis(50));
        assert_eq!(config.empty_backoff, Duration::from_millis(5));
        assert_eq!(config.thread_name, "rx");
    }
}
