//! Peer liveness probes

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Reports whether the peer behind a subscription is still there
///
/// Polled on an interval independent of event traffic, so a subscriber is
/// reaped even when nothing is being published.
pub trait Liveness: Send + Sync + 'static {
    fn is_alive(&self) -> bool;
}

/// A flag the transport flips when it sees the peer go away
#[derive(Clone, Default)]
pub struct DisconnectFlag {
    disconnected: Arc<AtomicBool>,
}

impl DisconnectFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the peer as gone
    pub fn disconnect(&self) {
        self.disconnected.store(true, Ordering::Release);
    }

    pub fn is_disconnected(&self) -> bool {
        self.disconnected.load(Ordering::Acquire)
    }
}

impl Liveness for DisconnectFlag {
    fn is_alive(&self) -> bool {
        !self.is_disconnected()
    }
}

impl fmt::Debug for DisconnectFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DisconnectFlag")
            .field("disconnected", &self.is_disconnected())
            .finish()
    }
}

/// Liveness backed by a closure
pub struct LivenessFn<F>(pub F);

impl<F> Liveness for LivenessFn<F>
where
    F: Fn() -> bool + Send + Sync + 'static,
{
    fn is_alive(&self) -> bool {
        (self.0)()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flag_shared_between_clones() {
        let flag = DisconnectFlag::new();
        let probe = flag.clone();
        assert!(probe.is_alive());

        flag.disconnect();
        assert!(!probe.is_alive());
    }

    #[test]
    fn test_closure() {
        let probe = LivenessFn(|| false);
        assert!(!probe.is_alive());
    }
}
