//! Relay startup and shutdown

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;

use crate::client::{ClientError, Contact, DeliveryFlags, Identity, MessagingClient};
use crate::event::Normalizer;
use crate::receiver::{ReceiverExit, ReceiverHandle, ReceiverLoop, ReceiverState, StateCell};
use crate::registry::{RegistryError, SubscriberRegistry};
use crate::sink::Subscription;
use crate::stats::{RelayStats, StatsSnapshot};

use super::config::RelayConfig;
use super::error::StartupError;

/// Account identity and contacts captured at startup
///
/// Read-only for the lifetime of the relay.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AccountSnapshot {
    pub identity: Identity,
    pub contacts: Vec<Contact>,
}

/// What shutdown did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownReport {
    /// How the receiver exited; `None` if it did not exit within the grace
    /// period or shutdown had already run
    pub receiver_exit: Option<ReceiverExit>,
    /// Whether this call released the client
    pub released: bool,
    /// Subscribers still attached when shutdown began
    pub subscribers_dropped: usize,
}

/// Enable inbound delivery unless it is already on
///
/// Returns true if delivery was switched on by this call.
pub fn enable_delivery(
    client: &dyn MessagingClient,
    flags: DeliveryFlags,
) -> Result<bool, ClientError> {
    if client.is_delivery_enabled() {
        tracing::debug!("Inbound delivery already enabled");
        return Ok(false);
    }
    client.set_delivery_enabled(flags)?;
    tracing::info!(include_moments = flags.include_moments, "Inbound delivery enabled");
    Ok(true)
}

/// A running relay
///
/// Created by [`Relay::start`]; share it behind an `Arc` with the HTTP
/// layer. Call [`Relay::shutdown`] to stop; dropping the relay without
/// shutting down still releases the client.
pub struct Relay {
    client: Arc<dyn MessagingClient>,
    registry: Arc<SubscriberRegistry>,
    account: AccountSnapshot,
    self_id: String,
    receiver: Mutex<Option<ReceiverHandle>>,
    receiver_state: Arc<StateCell>,
    released: AtomicBool,
    config: RelayConfig,
}

impl Relay {
    /// Run the startup sequence
    ///
    /// Connects the client, captures the account identity and contacts,
    /// enables delivery, sends the readiness notification and spawns the
    /// receiver thread. A failed notification is logged and ignored; every
    /// other failure releases the client and is returned.
    pub fn start(
        client: Arc<dyn MessagingClient>,
        config: RelayConfig,
    ) -> Result<Self, StartupError> {
        client.connect().map_err(StartupError::Connect)?;
        tracing::info!("Connected to messaging service");

        match Self::boot(Arc::clone(&client), config) {
            Ok(relay) => Ok(relay),
            Err(e) => {
                tracing::error!(error = %e, "Startup failed, releasing client");
                client.release();
                Err(e)
            }
        }
    }

    fn boot(client: Arc<dyn MessagingClient>, config: RelayConfig) -> Result<Self, StartupError> {
        let self_id = client.self_id().map_err(StartupError::Identity)?;
        let identity = client.identity().map_err(StartupError::Identity)?;
        let contacts = client.contacts().map_err(StartupError::Identity)?;
        tracing::info!(
            self_id = %self_id,
            name = %identity.name,
            contacts = contacts.len(),
            "Account snapshot captured"
        );

        enable_delivery(client.as_ref(), config.delivery).map_err(StartupError::EnableDelivery)?;

        if let Some(text) = &config.notify_text {
            if let Err(e) = client.send_notification(text, &config.notify_target) {
                tracing::warn!(
                    target_id = %config.notify_target,
                    error = %e,
                    "Readiness notification failed"
                );
            }
        }

        let stats = Arc::new(RelayStats::new());
        let registry = Arc::new(SubscriberRegistry::with_stats(config.registry.clone(), stats));

        let receiver = ReceiverLoop::new(
            Arc::clone(&client),
            Arc::clone(&registry),
            Normalizer::new(self_id.clone()),
            config.receiver.clone(),
        )
        .spawn()
        .map_err(StartupError::Spawn)?;
        let receiver_state = receiver.state_cell();

        Ok(Self {
            client,
            registry,
            account: AccountSnapshot { identity, contacts },
            self_id,
            receiver: Mutex::new(Some(receiver)),
            receiver_state,
            released: AtomicBool::new(false),
            config,
        })
    }

    /// Attach a new subscriber
    pub fn subscribe(&self) -> Result<Subscription, RegistryError> {
        self.registry.subscribe()
    }

    /// The subscriber registry
    pub fn registry(&self) -> &Arc<SubscriberRegistry> {
        &self.registry
    }

    /// The account's own identifier
    pub fn self_id(&self) -> &str {
        &self.self_id
    }

    /// Identity and contacts captured at startup
    pub fn account(&self) -> &AccountSnapshot {
        &self.account
    }

    /// Current receiver state
    pub fn receiver_state(&self) -> ReceiverState {
        self.receiver_state.get()
    }

    /// Current counters
    pub fn stats(&self) -> StatsSnapshot {
        self.registry.stats().snapshot(self.registry.len())
    }

    /// Whether the client has been released
    pub fn is_shut_down(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }

    /// Stop the receiver and release the client
    ///
    /// Waits up to the configured grace period for the receiver thread,
    /// then releases the client whether or not it exited. Subscribers are
    /// detached so their streams end. Safe to call more than once; only
    /// the first call does anything.
    pub async fn shutdown(&self) -> ShutdownReport {
        let handle = self.receiver.lock().await.take();
        let receiver_exit = match handle {
            Some(mut handle) => handle.stop(self.config.shutdown_grace).await,
            None => None,
        };

        let subscribers_dropped = self.registry.len();
        self.registry.clear();

        let released = self.release_client();
        tracing::info!(
            receiver = ?receiver_exit,
            subscribers = subscribers_dropped,
            released,
            "Relay shut down"
        );

        ShutdownReport {
            receiver_exit,
            released,
            subscribers_dropped,
        }
    }

    /// Release the client if that has not happened yet
    fn release_client(&self) -> bool {
        if self.released.swap(true, Ordering::AcqRel) {
            return false;
        }
        if let Err(e) = self.client.disable_delivery() {
            tracing::warn!(error = %e, "Disabling delivery failed");
        }
        self.client.release();
        tracing::info!("Messaging client released");
        true
    }
}

impl Drop for Relay {
    fn drop(&mut self) {
        if let Some(handle) = self.receiver.get_mut().as_mut() {
            handle.request_stop();
        }
        self.release_client();
    }
}
