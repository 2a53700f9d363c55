//! In-process realtime fan-out.
//!
//! Every channel name maps to a [`broadcast`] sender. Listeners get their own
//! connection id when they subscribe, and skip deliveries that exclude it. A
//! channel is dropped once its last listener is gone.

use crate::infrastructure::error::PublishError;
use crate::infrastructure::traits::Publisher;
use async_trait::async_trait;
use log::{debug, warn};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// One published event as seen by a listener.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub event: String,
    pub payload: serde_json::Value,
    exclude: Option<String>,
}

type Channels = Mutex<HashMap<String, broadcast::Sender<Delivery>>>;

pub struct LocalHub {
    channels: Arc<Channels>,
    capacity: usize,
}

impl Default for LocalHub {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }
}

impl LocalHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// `capacity` bounds how many deliveries a slow listener may fall behind.
    pub fn with_capacity(capacity: usize) -> Self {
        LocalHub {
            channels: Arc::new(Mutex::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    /// Registers a new listener on `channel` under a fresh connection id.
    pub fn subscribe(&self, channel: &str) -> Subscription {
        let mut channels = self
            .channels
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let receiver = channels
            .entry(channel.to_owned())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe();

        let connection_id = Uuid::new_v4().to_string();
        debug!("connection {connection_id} subscribed to {channel}");

        Subscription {
            channel: channel.to_owned(),
            connection_id,
            receiver: Some(receiver),
            channels: Arc::downgrade(&self.channels),
        }
    }

    /// Number of live listeners on `channel`.
    pub fn listener_count(&self, channel: &str) -> usize {
        self.channels
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(channel)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }

    /// Number of channels with at least one live listener.
    pub fn channel_count(&self) -> usize {
        self.channels
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    fn send(&self, channel: &str, delivery: Delivery) {
        let mut channels = self
            .channels
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let Some(sender) = channels.get(channel) else {
            debug!("no listeners on {channel}");
            return;
        };

        if sender.send(delivery).is_err() {
            // every receiver was dropped
            channels.remove(channel);
            debug!("dropped idle channel {channel}");
        }
    }
}

#[async_trait]
impl Publisher for LocalHub {
    async fn publish(
        &self,
        channel: &str,
        event: &str,
        payload: &serde_json::Value,
        exclude: Option<&str>,
    ) -> Result<(), PublishError> {
        self.send(
            channel,
            Delivery {
                event: event.to_owned(),
                payload: payload.clone(),
                exclude: exclude.map(str::to_owned),
            },
        );
        Ok(())
    }
}

/// A listener registered on one channel of a [`LocalHub`].
///
/// Dropping the last subscription of a channel removes the channel from the hub.
pub struct Subscription {
    channel: String,
    connection_id: String,
    /// Only `None` while being dropped.
    receiver: Option<broadcast::Receiver<Delivery>>,
    channels: Weak<Channels>,
}

impl Subscription {
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// The id to pass as `exclude` so this listener does not get its own echo.
    pub fn connection_id(&self) -> &str {
        &self.connection_id
    }

    /// Waits for the next delivery meant for this listener.
    ///
    /// Returns `None` once the hub dropped the channel.
    pub async fn recv(&mut self) -> Option<Delivery> {
        let receiver = self.receiver.as_mut()?;
        loop {
            match receiver.recv().await {
                Ok(delivery) if delivery.exclude.as_deref() == Some(self.connection_id.as_str()) => {
                    continue;
                }
                Ok(delivery) => return Some(delivery),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(
                        "connection {} on {} lagged, skipped {skipped} deliveries",
                        self.connection_id, self.channel
                    );
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(hub) = self.channels.upgrade() else {
            return;
        };
        let mut channels = hub
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        // released under the lock so the count below is exact
        drop(self.receiver.take());

        let idle = channels
            .get(&self.channel)
            .is_some_and(|sender| sender.receiver_count() == 0);
        if idle {
            channels.remove(&self.channel);
            debug!("dropped idle channel {}", self.channel);
        }
    }
}
