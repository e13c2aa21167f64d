//! In-process change feed
//!
//! Committed inserts and deletes are published on a `tokio::sync::broadcast`
//! channel. Every subscription owns a receiver plus the triggers it cares
//! about and stays registered until it is removed or dropped.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::watch;
use tracing::{debug, info};

use crate::error::BackendError;
use crate::model::{ChangeEvent, Trigger};

/// What a subscriber observes when it polls the feed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// A change matching one of the subscription's triggers
    Change(ChangeEvent),

    /// The subscriber fell behind and `n` notifications were dropped
    Lagged(u64),
}

/// Largest broadcast buffer a feed will allocate
pub const MAX_FEED_CAPACITY: usize = 1 << 16;

type Registry = Arc<Mutex<HashMap<u64, String>>>;

#[derive(Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<ChangeEvent>,
    registry: Registry,
    next_id: Arc<AtomicU64>,
    shutdown: Arc<watch::Sender<bool>>,
}

impl ChangeFeed {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.clamp(1, MAX_FEED_CAPACITY));
        let (shutdown, _) = watch::channel(false);
        Self {
            sender,
            registry: Arc::new(Mutex::new(HashMap::new())),
            next_id: Arc::new(AtomicU64::new(1)),
            shutdown: Arc::new(shutdown),
        }
    }

    /// Ends every subscription; pending and later `recv` calls fail with
    /// [`BackendError::Closed`]
    pub fn close(&self) {
        self.shutdown.send_replace(true);
        info!("change feed closed");
    }

    /// Fans `event` out to every live subscription
    pub fn publish(&self, event: ChangeEvent) {
        match self.sender.send(event) {
            Ok(receivers) => debug!(receivers, "change published"),
            Err(broadcast::error::SendError(event)) => {
                debug!(record_id = %event.record_id, "change published with no subscribers")
            }
        }
    }

    /// Opens a named channel listening for `triggers`
    pub fn subscribe(&self, channel: &str, triggers: Vec<Trigger>) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id, channel.to_string());
        info!(channel, id, triggers = triggers.len(), "channel subscribed");

        Subscription {
            id,
            channel: channel.to_string(),
            triggers,
            receiver: self.sender.subscribe(),
            shutdown: self.shutdown.subscribe(),
            registry: Arc::clone(&self.registry),
        }
    }

    /// Releases a subscription
    pub fn remove_channel(&self, subscription: Subscription) {
        info!(channel = %subscription.channel, id = subscription.id, "channel removed");
        drop(subscription);
    }

    /// Number of subscriptions that have not been removed yet
    pub fn active_channels(&self) -> usize {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Handle returned by [`ChangeFeed::subscribe`]
///
/// Dropping the handle unregisters it.
pub struct Subscription {
    id: u64,
    channel: String,
    triggers: Vec<Trigger>,
    receiver: broadcast::Receiver<ChangeEvent>,
    shutdown: watch::Receiver<bool>,
    registry: Registry,
}

impl Subscription {
    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn triggers(&self) -> &[Trigger] {
        &self.triggers
    }

    /// Waits for the next change matching this subscription's triggers
    ///
    /// Returns [`BackendError::Closed`] once the feed is gone or closed.
    pub async fn recv(&mut self) -> Result<Notification, BackendError> {
        let Self {
            receiver,
            triggers,
            shutdown,
            ..
        } = self;

        tokio::select! {
            biased;
            _ = wait_closed(shutdown) => Err(BackendError::Closed),
            result = next_matching(receiver, triggers) => result,
        }
    }
}

async fn next_matching(
    receiver: &mut broadcast::Receiver<ChangeEvent>,
    triggers: &[Trigger],
) -> Result<Notification, BackendError> {
    loop {
        match receiver.recv().await {
            Ok(event) if triggers.iter().any(|t| t.matches(&event)) => {
                return Ok(Notification::Change(event));
            }
            Ok(_) => continue,
            Err(RecvError::Lagged(n)) => return Ok(Notification::Lagged(n)),
            Err(RecvError::Closed) => return Err(BackendError::Closed),
        }
    }
}

async fn wait_closed(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            // Sender gone with the feed; the broadcast side reports it.
            std::future::pending::<()>().await;
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("channel", &self.channel)
            .field("triggers", &self.triggers)
            .finish()
    }
}
