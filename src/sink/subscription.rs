//! Consumer side of a subscriber queue

use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use futures::Stream;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::time::{Interval, MissedTickBehavior};

use crate::registry::{EventFrame, SubscriberId, SubscriberRegistry};

use super::liveness::Liveness;

const MIN_LIVENESS_INTERVAL: Duration = Duration::from_millis(1);

/// Unregisters a subscriber when dropped
struct RegistrationGuard {
    id: SubscriberId,
    registry: Arc<SubscriberRegistry>,
    released: bool,
}

impl RegistrationGuard {
    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.registry.unregister(self.id);
        }
    }
}

impl Drop for RegistrationGuard {
    fn drop(&mut self) {
        self.release();
    }
}

struct LivenessCheck {
    probe: Box<dyn Liveness>,
    ticker: Interval,
}

/// A live subscription to the relay
///
/// Yields [`EventFrame`]s in the order they were dispatched, either through
/// [`recv`](Self::recv) or as a [`Stream`]. The stream ends when the
/// registry drops the subscriber, or when the attached liveness probe
/// reports the peer gone. Dropping the subscription unregisters it.
pub struct Subscription {
    rx: mpsc::UnboundedReceiver<EventFrame>,
    guard: RegistrationGuard,
    liveness: Option<LivenessCheck>,
    ended: bool,
}

impl Subscription {
    pub(crate) fn new(
        id: SubscriberId,
        rx: mpsc::UnboundedReceiver<EventFrame>,
        registry: Arc<SubscriberRegistry>,
    ) -> Self {
        Self {
            rx,
            guard: RegistrationGuard {
                id,
                registry,
                released: false,
            },
            liveness: None,
            ended: false,
        }
    }

    /// Attach a liveness probe, checked every `interval` and before each
    /// frame
    ///
    /// Must be called from within a tokio runtime. A zero interval is
    /// raised to one millisecond.
    pub fn with_liveness(mut self, probe: impl Liveness, interval: Duration) -> Self {
        let mut ticker = tokio::time::interval(interval.max(MIN_LIVENESS_INTERVAL));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        self.liveness = Some(LivenessCheck {
            probe: Box::new(probe),
            ticker,
        });
        self
    }

    /// Subscriber ID
    pub fn id(&self) -> SubscriberId {
        self.guard.id
    }

    /// Whether the subscription has ended
    pub fn is_ended(&self) -> bool {
        self.ended
    }

    /// Wait for the next frame
    ///
    /// Returns `None` once the subscription has ended.
    pub async fn recv(&mut self) -> Option<EventFrame> {
        futures::future::poll_fn(|cx| Pin::new(&mut *self).poll_next(cx)).await
    }

    /// Take the next frame if one is already queued
    ///
    /// Ends the subscription once the registry has closed the queue and
    /// it is drained.
    pub fn try_recv(&mut self) -> Option<EventFrame> {
        if self.ended {
            return None;
        }
        match self.rx.try_recv() {
            Ok(frame) => Some(frame),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.finish("unregistered");
                None
            }
        }
    }

    /// End the subscription and unregister it now
    ///
    /// Frames still queued are discarded.
    pub fn close(&mut self) {
        self.finish("closed");
    }

    fn finish(&mut self, reason: &'static str) {
        if self.ended {
            return;
        }
        self.ended = true;
        self.rx.close();
        self.guard.release();
        tracing::debug!(subscriber = %self.guard.id, reason, "Subscription ended");
    }

    /// Poll the liveness probe, registering the ticker for wakeup
    fn peer_alive(&mut self, cx: &mut Context<'_>) -> bool {
        let Some(check) = self.liveness.as_mut() else {
            return true;
        };
        while check.ticker.poll_tick(cx).is_ready() {}
        check.probe.is_alive()
    }
}

impl Stream for Subscription {
    type Item = EventFrame;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;

        if this.ended {
            return Poll::Ready(None);
        }

        if !this.peer_alive(cx) {
            this.finish("peer disconnected");
            return Poll::Ready(None);
        }

        match this.rx.poll_recv(cx) {
            Poll::Ready(Some(frame)) => Poll::Ready(Some(frame)),
            Poll::Ready(None) => {
                this.finish("unregistered");
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.guard.id)
            .field("ended", &self.ended)
            .field("liveness", &self.liveness.is_some())
            .finish()
    }
}
