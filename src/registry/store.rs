//! Subscriber registry implementation
//!
//! The central registry that tracks live subscribers and fans inbound
//! events out to them.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::event::InboundEvent;
use crate::sink::Subscription;
use crate::stats::RelayStats;

use super::config::RegistryConfig;
use super::entry::{SinkEntry, SubscriberId};
use super::error::{DeliveryError, FrameError, RegistryError};
use super::frame::EventFrame;

/// Outcome of one fan-out pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Sinks that accepted the frame
    pub delivered: usize,
    /// Sinks whose consumer had gone; these were unregistered
    pub failed: usize,
    /// Sinks unregistered between snapshot and delivery
    pub skipped: usize,
}

/// Central registry for all live subscribers
///
/// All membership changes and the dispatch snapshot go through one mutex.
/// Delivery itself happens outside the lock, on the snapshot.
pub struct SubscriberRegistry {
    /// Live sinks by subscriber ID
    sinks: Mutex<HashMap<SubscriberId, Arc<SinkEntry>>>,

    /// Counter for generating subscriber IDs
    next_id: AtomicU64,

    /// Configuration
    config: RegistryConfig,

    /// Shared relay counters
    stats: Arc<RelayStats>,
}

impl SubscriberRegistry {
    /// Create a new registry with default configuration
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a new registry with custom configuration
    pub fn with_config(config: RegistryConfig) -> Self {
        Self::with_stats(config, Arc::new(RelayStats::new()))
    }

    /// Create a new registry that reports into existing counters
    pub fn with_stats(config: RegistryConfig, stats: Arc<RelayStats>) -> Self {
        Self {
            sinks: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            config,
            stats,
        }
    }

    /// Get the registry configuration
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Get the relay counters this registry reports into
    pub fn stats(&self) -> &Arc<RelayStats> {
        &self.stats
    }

    /// Register a new subscriber
    ///
    /// Returns its ID and the consumer half of its queue. The caller is
    /// responsible for calling [`unregister`](Self::unregister); prefer
    /// [`subscribe`](Self::subscribe), which does that on drop.
    pub fn register(
        &self,
    ) -> Result<(SubscriberId, mpsc::UnboundedReceiver<EventFrame>), RegistryError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut sinks = self.sinks.lock();

        if self.config.is_full(sinks.len()) {
            tracing::warn!(
                limit = self.config.max_subscribers,
                "Subscriber rejected: limit reached"
            );
            return Err(RegistryError::Full {
                limit: self.config.max_subscribers,
            });
        }

        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        sinks.insert(id, Arc::new(SinkEntry::new(id, tx)));
        let count = sinks.len();
        drop(sinks);

        self.stats.subscriber_added();
        tracing::info!(subscriber = %id, subscribers = count, "Subscriber added");

        Ok((id, rx))
    }

    /// Register a subscriber and wrap it in a [`Subscription`]
    ///
    /// The subscriber is unregistered when the subscription is dropped.
    pub fn subscribe(self: &Arc<Self>) -> Result<Subscription, RegistryError> {
        let (id, rx) = self.register()?;
        Ok(Subscription::new(id, rx, Arc::clone(self)))
    }

    /// Unregister a subscriber
    ///
    /// Closes its queue; once this returns, no further frames reach it.
    /// Returns false if the ID was not registered.
    pub fn unregister(&self, id: SubscriberId) -> bool {
        let (entry, count) = {
            let mut sinks = self.sinks.lock();
            let entry = sinks.remove(&id);
            (entry, sinks.len())
        };

        match entry {
            Some(entry) => {
                entry.close();
                self.stats.subscriber_removed();
                tracing::info!(
                    subscriber = %id,
                    delivered = entry.delivered(),
                    subscribers = count,
                    "Subscriber removed"
                );
                true
            }
            None => false,
        }
    }

    /// Encode an event and deliver it to every registered subscriber
    pub fn publish(&self, event: InboundEvent) -> Result<DispatchReport, FrameError> {
        let frame = EventFrame::encode(event)?;
        Ok(self.dispatch(&frame))
    }

    /// Deliver a frame to every subscriber registered right now
    ///
    /// Works on a snapshot of the registry. A subscriber whose consumer has
    /// gone is unregistered after the pass; it does not affect delivery to
    /// the others.
    pub fn dispatch(&self, frame: &EventFrame) -> DispatchReport {
        let snapshot: Vec<Arc<SinkEntry>> = self.sinks.lock().values().cloned().collect();
        let mut report = DispatchReport::default();
        let mut dead = Vec::new();

        for sink in &snapshot {
            match sink.deliver(frame) {
                Ok(()) => report.delivered += 1,
                Err(DeliveryError::Unregistered) => report.skipped += 1,
                Err(e @ DeliveryError::Closed) => {
                    tracing::debug!(
                        subscriber = %sink.id(),
                        event = frame.id(),
                        error = %e,
                        "Delivery failed"
                    );
                    report.failed += 1;
                    dead.push(sink.id());
                }
            }
        }

        for id in dead {
            if self.unregister(id) {
                self.stats.subscriber_purged();
            }
        }

        self.stats.dispatched(report.delivered as u64, report.failed as u64);
        report
    }

    /// Check whether a subscriber is registered
    pub fn contains(&self, id: SubscriberId) -> bool {
        self.sinks.lock().contains_key(&id)
    }

    /// IDs of all registered subscribers, sorted
    pub fn ids(&self) -> Vec<SubscriberId> {
        let mut ids: Vec<_> = self.sinks.lock().keys().copied().collect();
        ids.sort();
        ids
    }

    /// Number of registered subscribers
    pub fn len(&self) -> usize {
        self.sinks.lock().len()
    }

    /// Whether no subscriber is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Unregister subscribers whose consumer has gone
    ///
    /// Dispatch already does this lazily; this catches them during quiet
    /// periods. Returns how many were removed.
    pub fn reap(&self) -> usize {
        let dead: Vec<SubscriberId> = self
            .sinks
            .lock()
            .values()
            .filter(|sink| sink.is_closed())
            .map(|sink| sink.id())
            .collect();

        let mut removed = 0;
        for id in dead {
            if self.unregister(id) {
                self.stats.subscriber_purged();
                removed += 1;
            }
        }
        removed
    }

    /// Unregister every subscriber
    pub fn clear(&self) {
        let drained: Vec<Arc<SinkEntry>> = self.sinks.lock().drain().map(|(_, s)| s).collect();
        for sink in drained {
            sink.close();
            self.stats.subscriber_removed();
        }
    }

    /// Spawn background reaper task
    ///
    /// Calls [`reap`](Self::reap) every `interval` (at least one
    /// millisecond). Returns a handle that can be used to abort the task.
    pub fn spawn_reaper(self: &Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        let registry = Arc::clone(self);
        let interval = interval.max(Duration::from_millis(1));

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let removed = registry.reap();
                if removed > 0 {
                    tracing::debug!(removed, "Reaped disconnected subscribers");
                }
            }
        })
    }
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::event::{Normalizer, RawMessage};

    fn event(id: u64, content: &str) -> InboundEvent {
        Normalizer::new("wxid_self")
            .normalize(&RawMessage::text(id, "wxid_a", content))
            .unwrap()
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<EventFrame>) -> Vec<u64> {
        let mut ids = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            ids.push(frame.id());
        }
        ids
    }

    #[test]
    fn test_register_unregister() {
        let registry = SubscriberRegistry::new();

        let (id, _rx) = registry.register().unwrap();
        assert!(registry.contains(id));
        assert_eq!(registry.len(), 1);

        assert!(registry.unregister(id));
        assert!(!registry.unregister(id));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_ids_are_unique() {
        let registry = SubscriberRegistry::new();

        let (a, _rx_a) = registry.register().unwrap();
        registry.unregister(a);
        let (b, _rx_b) = registry.register().unwrap();

        assert_ne!(a, b);
    }

    #[test]
    fn test_dispatch_to_none() {
        let registry = SubscriberRegistry::new();
        let report = registry.publish(event(1, "hi")).unwrap();
        assert_eq!(report, DispatchReport::default());
    }

    #[test]
    fn test_each_subscriber_gets_one_copy() {
        let registry = SubscriberRegistry::new();
        let mut receivers: Vec<_> = (0..5).map(|_| registry.register().unwrap().1).collect();

        let report = registry.publish(event(1, "hi")).unwrap();
        assert_eq!(report.delivered, 5);

        for rx in &mut receivers {
            let frame = rx.try_recv().unwrap();
            assert_eq!(*frame.event, event(1, "hi"));
            assert!(rx.try_recv().is_err());
        }
    }

    #[test]
    fn test_fanout_scenario() {
        let registry = SubscriberRegistry::new();
        let (_s1, mut rx1) = registry.register().unwrap();
        let (s2, mut rx2) = registry.register().unwrap();
        let (_s3, mut rx3) = registry.register().unwrap();

        registry.publish(event(1, "hi")).unwrap();
        registry.unregister(s2);
        registry.publish(event(2, "bye")).unwrap();

        assert_eq!(drain(&mut rx1), vec![1, 2]);
        assert_eq!(drain(&mut rx2), vec![1]);
        assert_eq!(drain(&mut rx3), vec![1, 2]);
        assert!(!registry.contains(s2));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_failed_subscriber_purged() {
        let registry = SubscriberRegistry::new();
        let (_ok, mut rx_ok) = registry.register().unwrap();
        let (bad, rx_bad) = registry.register().unwrap();
        drop(rx_bad);

        let report = registry.publish(event(1, "hi")).unwrap();
        assert_eq!(report.delivered, 1);
        assert_eq!(report.failed, 1);
        assert!(!registry.contains(bad));

        let report = registry.publish(event(2, "again")).unwrap();
        assert_eq!(report.delivered, 1);
        assert_eq!(report.failed, 0);
        assert_eq!(drain(&mut rx_ok), vec![1, 2]);

        let stats = registry.stats().snapshot(registry.len());
        assert_eq!(stats.subscribers_purged, 1);
        assert_eq!(stats.delivery_failures, 1);
    }

    #[test]
    fn test_removed_subscriber_queue_not_grown() {
        let registry = SubscriberRegistry::new();
        let (id, mut rx) = registry.register().unwrap();

        registry.publish(event(1, "a")).unwrap();
        registry.unregister(id);
        registry.publish(event(2, "b")).unwrap();

        assert_eq!(drain(&mut rx), vec![1]);
    }

    #[test]
    fn test_limit() {
        let registry = SubscriberRegistry::with_config(RegistryConfig::default().max_subscribers(1));

        let (id, _rx) = registry.register().unwrap();
        assert_eq!(
            registry.register().unwrap_err(),
            RegistryError::Full { limit: 1 }
        );

        registry.unregister(id);
        assert!(registry.register().is_ok());
    }

    #[test]
    fn test_reap_closed() {
        let registry = SubscriberRegistry::new();
        let (_live, _rx_live) = registry.register().unwrap();
        let (gone, rx_gone) = registry.register().unwrap();
        drop(rx_gone);

        assert_eq!(registry.reap(), 1);
        assert!(!registry.contains(gone));
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn test_reaper_removes_gone_consumers() {
        let registry = Arc::new(SubscriberRegistry::new());
        let (id, rx) = registry.register().unwrap();
        drop(rx);

        let reaper = registry.spawn_reaper(Duration::from_millis(5));
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while registry.contains(id) {
            assert!(tokio::time::Instant::now() < deadline);
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        reaper.abort();
    }

    #[tokio::test]
    async fn test_reaper_zero_interval_still_runs() {
        let registry = Arc::new(SubscriberRegistry::new());
        let (id, rx) = registry.register().unwrap();
        drop(rx);

        let reaper = registry.spawn_reaper(Duration::ZERO);
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while registry.contains(id) {
            assert!(!reaper.is_finished(), "reaper task exited");
            assert!(tokio::time::Instant::now() < deadline);
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        reaper.abort();
    }

    #[test]
    fn test_clear() {
        let registry = SubscriberRegistry::new();
        let (_a, mut rx) = registry.register().unwrap();
        let (_b, _rx_b) = registry.register().unwrap();

        registry.clear();
        assert!(registry.is_empty());
        assert_eq!(registry.publish(event(1, "x")).unwrap().delivered, 0);
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn test_concurrent_membership_during_dispatch() {
        let registry = Arc::new(SubscriberRegistry::new());
        let mut stable: Vec<_> = (0..4).map(|_| registry.register().unwrap().1).collect();

        let churn = {
            let registry = Arc::clone(&registry);
            thread::spawn(move || {
                for _ in 0..500 {
                    let (id, _rx) = registry.register().unwrap();
                    registry.unregister(id);
                }
            })
        };

        for i in 1..=500 {
            registry.publish(event(i, "x")).unwrap();
        }
        churn.join().unwrap();

        let expected: Vec<u64> = (1..=500).collect();
        for rx in &mut stable {
            assert_eq!(drain(rx), expected);
        }
        assert_eq!(registry.len(), 4);
    }
}
