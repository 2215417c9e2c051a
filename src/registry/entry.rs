//! Per-subscriber sink state
//!
//! This module defines the producer half of one subscriber's queue as stored
//! in the registry.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::error::DeliveryError;
use super::frame::EventFrame;

/// Unique identifier for a subscriber
///
/// Never reused within one registry; a consumer that reconnects gets a new ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(pub u64);

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Producer side of one subscriber's queue
pub struct SinkEntry {
    id: SubscriberId,

    /// Sender into the subscriber's queue, `None` once closed
    ///
    /// Pushes and closing both happen under this lock, so nothing can be
    /// enqueued after [`SinkEntry::close`] returns.
    tx: Mutex<Option<mpsc::UnboundedSender<EventFrame>>>,

    /// Frames pushed so far
    delivered: AtomicU64,

    /// When the subscriber attached
    registered_at: Instant,
}

impl SinkEntry {
    pub(super) fn new(id: SubscriberId, tx: mpsc::UnboundedSender<EventFrame>) -> Self {
        Self {
            id,
            tx: Mutex::new(Some(tx)),
            delivered: AtomicU64::new(0),
            registered_at: Instant::now(),
        }
    }

    /// Subscriber ID
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Push one frame without waiting
    pub fn deliver(&self, frame: &EventFrame) -> Result<(), DeliveryError> {
        let tx = self.tx.lock();
        let tx = tx.as_ref().ok_or(DeliveryError::Unregistered)?;

        tx.send(frame.clone()).map_err(|_| DeliveryError::Closed)?;
        self.delivered.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Close the queue
    ///
    /// Returns false if it was already closed. Frames already queued stay
    /// readable by the consumer.
    pub fn close(&self) -> bool {
        self.tx.lock().take().is_some()
    }

    /// Whether the queue is closed or its consumer has gone
    pub fn is_closed(&self) -> bool {
        self.tx.lock().as_ref().map_or(true, |tx| tx.is_closed())
    }

    /// Number of frames pushed
    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    /// Time since the subscriber attached
    pub fn age(&self) -> Duration {
        self.registered_at.elapsed()
    }
}

impl fmt::Debug for SinkEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinkEntry")
            .field("id", &self.id)
            .field("delivered", &self.delivered())
            .field("closed", &self.is_closed())
            .finish()
    }
}
