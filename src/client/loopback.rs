//! In-process messaging client
//!
//! Messages pushed into a [`LoopbackFeeder`] come out of
//! [`LoopbackClient::next_event`] in order. The client records the calls the
//! relay makes against it, which is what the lifecycle tests inspect.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;

use crate::event::RawMessage;

use super::messaging::{ClientError, Contact, DeliveryFlags, Identity, MessagingClient};

/// State shared between the client and its feeders
#[derive(Default)]
struct Shared {
    connected: AtomicBool,
    delivery_enabled: AtomicBool,
    fail_connect: AtomicBool,
    fail_notify: AtomicBool,
    fail_identity: AtomicBool,
    releases: AtomicUsize,
    enable_calls: AtomicUsize,
    calls: Mutex<Vec<&'static str>>,
    notifications: Mutex<Vec<(String, String)>>,
}

impl Shared {
    fn record(&self, call: &'static str) {
        self.calls.lock().push(call);
    }
}

/// Messaging client backed by an in-memory channel
pub struct LoopbackClient {
    shared: Arc<Shared>,
    events: Receiver<RawMessage>,
    identity: Identity,
    contacts: Vec<Contact>,
}

impl LoopbackClient {
    /// Create a client for the given account
    ///
    /// Returns the client and a feeder that injects inbound messages.
    pub fn new(identity: Identity) -> (Self, LoopbackFeeder) {
        let (tx, rx) = unbounded();
        let shared = Arc::new(Shared::default());

        let client = Self {
            shared: Arc::clone(&shared),
            events: rx,
            identity,
            contacts: Vec::new(),
        };

        (client, LoopbackFeeder { shared, tx })
    }

    /// Create a client whose account has only a wxid
    pub fn with_wxid(wxid: impl Into<String>) -> (Self, LoopbackFeeder) {
        Self::new(Identity {
            wxid: wxid.into(),
            ..Default::default()
        })
    }

    /// Set the contact list returned by [`MessagingClient::contacts`]
    pub fn contacts_list(mut self, contacts: Vec<Contact>) -> Self {
        self.contacts = contacts;
        self
    }

    /// Make `connect` fail
    pub fn failing_connect(self) -> Self {
        self.shared.fail_connect.store(true, Ordering::SeqCst);
        self
    }

    /// Make `send_notification` fail
    pub fn failing_notify(self) -> Self {
        self.shared.fail_notify.store(true, Ordering::SeqCst);
        self
    }

    /// Make `identity` fail
    pub fn failing_identity(self) -> Self {
        self.shared.fail_identity.store(true, Ordering::SeqCst);
        self
    }

    /// Names of the trait methods called so far, in order
    ///
    /// `next_event` and `is_delivery_enabled` are polled constantly and are
    /// not recorded.
    pub fn calls(&self) -> Vec<&'static str> {
        self.shared.calls.lock().clone()
    }

    /// Notifications sent so far as `(text, target)` pairs
    pub fn notifications(&self) -> Vec<(String, String)> {
        self.shared.notifications.lock().clone()
    }

    /// How many times `release` was called
    pub fn release_count(&self) -> usize {
        self.shared.releases.load(Ordering::SeqCst)
    }

    /// How many times delivery was actually switched on
    pub fn enable_count(&self) -> usize {
        self.shared.enable_calls.load(Ordering::SeqCst)
    }

    fn ensure_connected(&self) -> Result<(), ClientError> {
        if self.shared.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ClientError::NotConnected)
        }
    }
}

impl MessagingClient for LoopbackClient {
    fn connect(&self) -> Result<(), ClientError> {
        self.shared.record("connect");
        if self.shared.fail_connect.load(Ordering::SeqCst) {
            return Err(ClientError::Connect("loopback refused".into()));
        }
        self.shared.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn release(&self) {
        self.shared.record("release");
        self.shared.releases.fetch_add(1, Ordering::SeqCst);
        self.shared.connected.store(false, Ordering::SeqCst);
        self.shared.delivery_enabled.store(false, Ordering::SeqCst);
    }

    fn next_event(&self, timeout: Duration) -> Result<Option<RawMessage>, ClientError> {
        self.ensure_connected()?;
        match self.events.recv_timeout(timeout) {
            Ok(msg) => Ok(Some(msg)),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => Ok(None),
        }
    }

    fn is_delivery_enabled(&self) -> bool {
        self.shared.delivery_enabled.load(Ordering::SeqCst)
    }

    fn set_delivery_enabled(&self, _flags: DeliveryFlags) -> Result<(), ClientError> {
        self.shared.record("set_delivery_enabled");
        self.ensure_connected()?;
        if !self.shared.delivery_enabled.swap(true, Ordering::SeqCst) {
            self.shared.enable_calls.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }

    fn disable_delivery(&self) -> Result<(), ClientError> {
        self.shared.record("disable_delivery");
        self.shared.delivery_enabled.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn self_id(&self) -> Result<String, ClientError> {
        self.shared.record("self_id");
        self.ensure_connected()?;
        Ok(self.identity.wxid.clone())
    }

    fn identity(&self) -> Result<Identity, ClientError> {
        self.shared.record("identity");
        self.ensure_connected()?;
        if self.shared.fail_identity.load(Ordering::SeqCst) {
            return Err(ClientError::Call("profile unavailable".into()));
        }
        Ok(self.identity.clone())
    }

    fn contacts(&self) -> Result<Vec<Contact>, ClientError> {
        self.shared.record("contacts");
        self.ensure_connected()?;
        Ok(self.contacts.clone())
    }

    fn send_notification(&self, text: &str, target: &str) -> Result<(), ClientError> {
        self.shared.record("send_notification");
        self.ensure_connected()?;
        if self.shared.fail_notify.load(Ordering::SeqCst) {
            return Err(ClientError::Call("notification rejected".into()));
        }
        self.shared
            .notifications
            .lock()
            .push((text.to_string(), target.to_string()));
        Ok(())
    }
}

/// Injects messages into a [`LoopbackClient`]
#[derive(Clone)]
pub struct LoopbackFeeder {
    shared: Arc<Shared>,
    tx: Sender<RawMessage>,
}

impl LoopbackFeeder {
    /// Queue one inbound message
    ///
    /// Returns false if the client has been dropped.
    pub fn push(&self, msg: RawMessage) -> bool {
        self.tx.send(msg).is_ok()
    }

    /// Switch inbound delivery off, as if the service stopped delivering
    pub fn disable_delivery(&self) {
        self.shared.delivery_enabled.store(false, Ordering::SeqCst);
    }

    /// Number of queued messages not yet fetched
    pub fn pending(&self) -> usize {
        self.tx.len()
    }
}
