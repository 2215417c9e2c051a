//! Statistics and metrics for the relay

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;

/// Relay-wide counters
///
/// Updated by the receiver thread and the registry without locking; read
/// through [`RelayStats::snapshot`].
#[derive(Debug)]
pub struct RelayStats {
    started_at: Instant,
    events_received: AtomicU64,
    events_dropped: AtomicU64,
    empty_polls: AtomicU64,
    receive_errors: AtomicU64,
    dispatches: AtomicU64,
    deliveries: AtomicU64,
    delivery_failures: AtomicU64,
    subscribers_added: AtomicU64,
    subscribers_removed: AtomicU64,
    subscribers_purged: AtomicU64,
}

impl RelayStats {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            events_received: AtomicU64::new(0),
            events_dropped: AtomicU64::new(0),
            empty_polls: AtomicU64::new(0),
            receive_errors: AtomicU64::new(0),
            dispatches: AtomicU64::new(0),
            deliveries: AtomicU64::new(0),
            delivery_failures: AtomicU64::new(0),
            subscribers_added: AtomicU64::new(0),
            subscribers_removed: AtomicU64::new(0),
            subscribers_purged: AtomicU64::new(0),
        }
    }

    pub fn event_received(&self) {
        self.events_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn event_dropped(&self) {
        self.events_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn empty_poll(&self) {
        self.empty_polls.fetch_add(1, Ordering::Relaxed);
    }

    pub fn receive_error(&self) {
        self.receive_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one fan-out pass
    pub fn dispatched(&self, delivered: u64, failed: u64) {
        self.dispatches.fetch_add(1, Ordering::Relaxed);
        self.deliveries.fetch_add(delivered, Ordering::Relaxed);
        self.delivery_failures.fetch_add(failed, Ordering::Relaxed);
    }

    pub fn subscriber_added(&self) {
        self.subscribers_added.fetch_add(1, Ordering::Relaxed);
    }

    pub fn subscriber_removed(&self) {
        self.subscribers_removed.fetch_add(1, Ordering::Relaxed);
    }

    /// A subscriber was removed because delivery to it failed
    pub fn subscriber_purged(&self) {
        self.subscribers_purged.fetch_add(1, Ordering::Relaxed);
    }

    /// Time since the counters were created
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Copy the current values
    pub fn snapshot(&self, active_subscribers: usize) -> StatsSnapshot {
        StatsSnapshot {
            uptime_secs: self.uptime().as_secs(),
            active_subscribers,
            events_received: self.events_received.load(Ordering::Relaxed),
            events_dropped: self.events_dropped.load(Ordering::Relaxed),
            empty_polls: self.empty_polls.load(Ordering::Relaxed),
            receive_errors: self.receive_errors.load(Ordering::Relaxed),
            dispatches: self.dispatches.load(Ordering::Relaxed),
            deliveries: self.deliveries.load(Ordering::Relaxed),
            delivery_failures: self.delivery_failures.load(Ordering::Relaxed),
            subscribers_added: self.subscribers_added.load(Ordering::Relaxed),
            subscribers_removed: self.subscribers_removed.load(Ordering::Relaxed),
            subscribers_purged: self.subscribers_purged.load(Ordering::Relaxed),
        }
    }
}

impl Default for RelayStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of [`RelayStats`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub uptime_secs: u64,
    pub active_subscribers: usize,
    pub events_received: u64,
    pub events_dropped: u64,
    pub empty_polls: u64,
    pub receive_errors: u64,
    pub dispatches: u64,
    pub deliveries: u64,
    pub delivery_failures: u64,
    pub subscribers_added: u64,
    pub subscribers_removed: u64,
    pub subscribers_purged: u64,
}

impl StatsSnapshot {
    /// Average deliveries per dispatched event
    pub fn fanout(&self) -> f64 {
        if self.dispatches > 0 {
            self.deliveries as f64 / self.dispatches as f64
        } else {
            0.0
        }
    }
}
