///! Registry of live event-stream subscribers
///!
///! Each subscriber is an mpsc channel whose receiving end backs an SSE
///! response. Delivery is best-effort: a full or closed channel never
///! fails the broadcast, and disconnected subscribers are reaped by their
///! own monitor task rather than during broadcast iteration.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use uuid::Uuid;

use super::types::Quake;

/// Per-subscriber channel capacity; a subscriber this far behind starts
/// losing events rather than stalling the broadcaster.
const SUBSCRIBER_BUFFER: usize = 100;

pub struct SubscriberRegistry {
    subscribers: Arc<RwLock<HashMap<Uuid, mpsc::Sender<Quake>>>>,
}

impl Default for SubscriberRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self {
            subscribers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register a new subscriber and return its handle plus the receiving
    /// end of its event channel. A monitor task removes the entry once the
    /// receiver is dropped (client disconnect).
    pub async fn subscribe(&self) -> (Uuid, mpsc::Receiver<Quake>) {
        let (tx, rx) = mpsc::channel::<Quake>(SUBSCRIBER_BUFFER);
        let id = Uuid::now_v7();

        {
            let mut subscribers = self.subscribers.write().await;
            subscribers.insert(id, tx.clone());
        }
        tracing::info!("Stream subscriber {} connected", id);

        let subscribers = self.subscribers.clone();
        tokio::spawn(async move {
            tx.closed().await;
            let mut subscribers = subscribers.write().await;
            if subscribers.remove(&id).is_some() {
                tracing::info!("Stream subscriber {} disconnected", id);
            }
        });

        (id, rx)
    }

    /// Explicitly remove a subscriber.
    pub async fn unsubscribe(&self, id: Uuid) {
        let mut subscribers = self.subscribers.write().await;
        if subscribers.remove(&id).is_some() {
            tracing::info!("Stream subscriber {} unsubscribed", id);
        }
    }

    /// Deliver one event to every live subscriber, best-effort.
    pub async fn broadcast(&self, quake: &Quake) {
        let subscribers = self.subscribers.read().await;

        for (id, tx) in subscribers.iter() {
            match tx.try_send(quake.clone()) {
                Ok(()) => {}
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!("Subscriber {} is lagging, dropping event {}", id, quake.id);
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    // Disconnected between registry snapshot and write;
                    // its monitor task handles removal.
                    tracing::debug!("Subscriber {} already closed", id);
                }
            }
        }
    }

    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.read().await.len()
    }
}
