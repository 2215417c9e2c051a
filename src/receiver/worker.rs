//! Receiver loop and its handle

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError};
use tokio::sync::oneshot;

use crate::client::{ClientError, MessagingClient};
use crate::event::{NormalizationError, Normalizer};
use crate::registry::{DispatchReport, FrameError, SubscriberRegistry};

use super::config::ReceiverConfig;
use super::state::{ReceiverState, StateCell};

/// Result of one fetch-normalize-dispatch step
#[derive(Debug)]
pub enum ReceiveOutcome {
    /// An event was fanned out
    Dispatched { id: u64, report: DispatchReport },
    /// Nothing arrived within the poll timeout
    Empty,
    /// The message was malformed and dropped
    Dropped(NormalizationError),
    /// The event could not be encoded and was dropped
    Unencodable(FrameError),
    /// The client failed to fetch
    Failed(ClientError),
}

/// Why the receiver loop exited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverExit {
    /// The client reported delivery disabled
    DeliveryDisabled,
    /// Shutdown asked the loop to stop
    StopRequested,
}

/// Pulls messages from the client and dispatches them
pub struct ReceiverLoop {
    client: Arc<dyn MessagingClient>,
    registry: Arc<SubscriberRegistry>,
    normalizer: Normalizer,
    config: ReceiverConfig,
    state: Arc<StateCell>,
}

impl ReceiverLoop {
    /// Create a receiver loop
    pub fn new(
        client: Arc<dyn MessagingClient>,
        registry: Arc<SubscriberRegistry>,
        normalizer: Normalizer,
        config: ReceiverConfig,
    ) -> Self {
        Self {
            client,
            registry,
            normalizer,
            config,
            state: Arc::new(StateCell::new()),
        }
    }

    /// Current loop state
    pub fn state(&self) -> ReceiverState {
        self.state.get()
    }

    /// Fetch at most one message and dispatch it
    ///
    /// Never panics or returns early on a bad message; every outcome is a
    /// value the caller can log.
    pub fn step(&self) -> ReceiveOutcome {
        let stats = self.registry.stats();

        let raw = match self.client.next_event(self.config.poll_timeout) {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                stats.empty_poll();
                return ReceiveOutcome::Empty;
            }
            Err(e) => {
                stats.receive_error();
                return ReceiveOutcome::Failed(e);
            }
        };
        stats.event_received();

        let event = match self.normalizer.normalize(&raw) {
            Ok(event) => event,
            Err(e) => {
                stats.event_dropped();
                return ReceiveOutcome::Dropped(e);
            }
        };

        let id = event.id;
        match self.registry.publish(event) {
            Ok(report) => ReceiveOutcome::Dispatched { id, report },
            Err(e) => {
                stats.event_dropped();
                ReceiveOutcome::Unencodable(e)
            }
        }
    }

    /// Run until delivery is disabled or `stop` fires
    ///
    /// `stop` fires when it receives a message or its sender is dropped.
    pub fn run(&self, stop: &Receiver<()>) -> ReceiverExit {
        self.state.set(ReceiverState::Running);
        tracing::info!(self_id = %self.normalizer.self_id(), "Receiver started");

        let exit = loop {
            if stop_requested(stop) {
                break ReceiverExit::StopRequested;
            }
            if !self.client.is_delivery_enabled() {
                tracing::warn!("Delivery disabled by client, receiver stopping");
                break ReceiverExit::DeliveryDisabled;
            }

            match self.step() {
                ReceiveOutcome::Dispatched { id, report } => {
                    tracing::trace!(
                        event = id,
                        delivered = report.delivered,
                        failed = report.failed,
                        "Event dispatched"
                    );
                    continue;
                }
                ReceiveOutcome::Dropped(e) => {
                    tracing::warn!(error = %e, "Dropping malformed message");
                    continue;
                }
                ReceiveOutcome::Unencodable(e) => {
                    tracing::error!(error = %e, "Dropping unencodable event");
                    continue;
                }
                ReceiveOutcome::Failed(e) => {
                    tracing::error!(error = %e, "Receiving message failed");
                }
                ReceiveOutcome::Empty => {}
            }

            self.state.set(ReceiverState::EmptyWait);
            if wait_or_stop(stop, self.config.empty_backoff) {
                break ReceiverExit::StopRequested;
            }
            self.state.set(ReceiverState::Running);
        };

        self.state.set(ReceiverState::Stopped);
        tracing::info!(reason = ?exit, "Receiver stopped");
        exit
    }

    /// Run the loop on its own named thread
    pub fn spawn(self) -> std::io::Result<ReceiverHandle> {
        let (stop_tx, stop_rx) = bounded(1);
        let (done_tx, done_rx) = oneshot::channel();
        let state = Arc::clone(&self.state);

        let thread = thread::Builder::new()
            .name(self.config.thread_name.clone())
            .spawn(move || {
                let exit = self.run(&stop_rx);
                let _ = done_tx.send(exit);
            })?;

        Ok(ReceiverHandle {
            stop_tx: Some(stop_tx),
            done: Some(done_rx),
            exit: None,
            thread,
            state,
        })
    }
}

fn stop_requested(stop: &Receiver<()>) -> bool {
    !matches!(stop.try_recv(), Err(TryRecvError::Empty))
}

/// Sleep for `backoff`, waking early on stop. Returns true if stopped.
fn wait_or_stop(stop: &Receiver<()>, backoff: Duration) -> bool {
    !matches!(stop.recv_timeout(backoff), Err(RecvTimeoutError::Timeout))
}

/// Control handle for a spawned receiver loop
pub struct ReceiverHandle {
    stop_tx: Option<Sender<()>>,
    done: Option<oneshot::Receiver<ReceiverExit>>,
    exit: Option<ReceiverExit>,
    thread: thread::JoinHandle<()>,
    state: Arc<StateCell>,
}

impl ReceiverHandle {
    /// Current loop state
    pub fn state(&self) -> ReceiverState {
        self.state.get()
    }

    pub(crate) fn state_cell(&self) -> Arc<StateCell> {
        Arc::clone(&self.state)
    }

    /// Whether the loop thread has exited
    pub fn is_finished(&self) -> bool {
        self.thread.is_finished()
    }

    /// Ask the loop to stop
    ///
    /// The loop notices between fetches, so it may finish a blocking fetch
    /// first.
    pub fn request_stop(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.try_send(());
        }
    }

    /// Wait for the loop to exit on its own
    ///
    /// Returns `None` if the loop thread panicked.
    pub async fn wait(&mut self) -> Option<ReceiverExit> {
        if let Some(done) = self.done.take() {
            self.exit = done.await.ok();
        }
        self.exit
    }

    /// Ask the loop to stop and wait up to `grace` for it
    ///
    /// Returns `None` if the loop did not exit in time (it is left to
    /// finish in the background) or panicked.
    pub async fn stop(&mut self, grace: Duration) -> Option<ReceiverExit> {
        self.request_stop();
        match tokio::time::timeout(grace, self.wait()).await {
            Ok(exit) => exit,
            Err(_) => {
                tracing::warn!(
                    grace_ms = grace.as_millis() as u64,
                    "Receiver did not stop within grace period"
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::{DeliveryFlags, LoopbackClient, LoopbackFeeder};
    use crate::event::RawMessage;

    fn fast_config() -> ReceiverConfig {
        ReceiverConfig::default()
            .poll_timeout(Duration::from_millis(10))
            .empty_backoff(Duration::from_millis(5))
    }

    fn setup() -> (Arc<LoopbackClient>, LoopbackFeeder, Arc<SubscriberRegistry>, ReceiverLoop) {
        let (client, feeder) = LoopbackClient::with_wxid("wxid_self");
        let client = Arc::new(client);
        client.connect().unwrap();
        client.set_delivery_enabled(DeliveryFlags::default()).unwrap();

        let registry = Arc::new(SubscriberRegistry::new());
        let receiver = ReceiverLoop::new(
            client.clone(),
            Arc::clone(&registry),
            Normalizer::new("wxid_self"),
            fast_config(),
        );
        (client, feeder, registry, receiver)
    }

    #[test]
    fn test_step_outcomes() {
        let (_client, feeder, registry, receiver) = setup();
        let (_id, mut rx) = registry.register().unwrap();

        assert!(matches!(receiver.step(), ReceiveOutcome::Empty));

        feeder.push(RawMessage::text(0, "wxid_a", "bad"));
        assert!(matches!(
            receiver.step(),
            ReceiveOutcome::Dropped(NormalizationError::MissingId)
        ));

        feeder.push(RawMessage::text(5, "wxid_a", "good"));
        match receiver.step() {
            ReceiveOutcome::Dispatched { id, report } => {
                assert_eq!(id, 5);
                assert_eq!(report.delivered, 1);
            }
            other => panic!("Expected dispatch, got {:?}", other),
        }
        assert_eq!(rx.try_recv().unwrap().id(), 5);

        let stats = registry.stats().snapshot(registry.len());
        assert_eq!(stats.events_received, 2);
        assert_eq!(stats.events_dropped, 1);
        assert_eq!(stats.empty_polls, 1);
    }

    #[test]
    fn test_step_reports_client_failure() {
        let (client, _feeder, _registry, receiver) = setup();
        client.release();

        assert!(matches!(
            receiver.step(),
            ReceiveOutcome::Failed(ClientError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_malformed_message_does_not_stop_loop() {
        let (_client, feeder, registry, receiver) = setup();
        let mut sub = registry.subscribe().unwrap();
        let mut handle = receiver.spawn().unwrap();

        feeder.push(RawMessage::text(1, "", "no sender"));
        feeder.push(RawMessage::text(2, "wxid_a", "fine"));

        let frame = tokio::time::timeout(Duration::from_secs(2), sub.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(frame.id(), 2);

        assert_eq!(
            handle.stop(Duration::from_secs(2)).await,
            Some(ReceiverExit::StopRequested)
        );
        assert_eq!(handle.state(), ReceiverState::Stopped);
    }

    #[tokio::test]
    async fn test_exits_when_delivery_disabled() {
        let (_client, feeder, _registry, receiver) = setup();
        let mut handle = receiver.spawn().unwrap();

        feeder.disable_delivery();

        let exit = tokio::time::timeout(Duration::from_secs(2), handle.wait())
            .await
            .unwrap();
        assert_eq!(exit, Some(ReceiverExit::DeliveryDisabled));
        assert_eq!(handle.state(), ReceiverState::Stopped);
    }

    #[tokio::test]
    async fn test_stop_interrupts_backoff() {
        let (client, feeder, registry, _) = setup();
        let receiver = ReceiverLoop::new(
            client,
            registry,
            Normalizer::new("wxid_self"),
            fast_config().empty_backoff(Duration::from_secs(60)),
        );
        let mut handle = receiver.spawn().unwrap();

        // Let it reach the long backoff
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(handle.state(), ReceiverState::EmptyWait);

        assert_eq!(
            handle.stop(Duration::from_secs(2)).await,
            Some(ReceiverExit::StopRequested)
        );
        drop(feeder);
    }

    #[tokio::test]
    async fn test_order_preserved_across_thread() {
        let (_client, feeder, registry, receiver) = setup();
        let mut sub = registry.subscribe().unwrap();
        let mut handle = receiver.spawn().unwrap();

        for id in 1..=50 {
            feeder.push(RawMessage::text(id, "wxid_a", "x"));
        }

        for id in 1..=50 {
            let frame = tokio::time::timeout(Duration::from_secs(2), sub.recv())
                .await
                .unwrap()
                .unwrap();
            assert_eq!(frame.id(), id);
        }

        handle.stop(Duration::from_secs(2)).await;
    }
}
