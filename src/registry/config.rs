//! Registry configuration

/// Subscriber registry options
#[derive(Debug, Clone, Default)]
pub struct RegistryConfig {
    /// Maximum concurrent subscribers (0 = unlimited)
    pub max_subscribers: usize,
}

impl RegistryConfig {
    /// Set the maximum number of concurrent subscribers
    pub fn max_subscribers(mut self, max: usize) -> Self {
        self.max_subscribers = max;
        self
    }

    /// Whether `count` subscribers already fill the registry
    pub fn is_full(&self, count: usize) -> bool {
        self.max_subscribers > 0 && count >= self.max_subscribers
    }
}
