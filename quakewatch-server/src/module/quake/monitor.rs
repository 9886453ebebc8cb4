///! Change detection and delta broadcast
///!
///! Compares each newly fetched snapshot against the previously seen id
///! set and pushes only newly appeared entries to stream subscribers.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Mutex;

use super::registry::SubscriberRegistry;
use super::types::QuakeSnapshot;

pub struct QuakeMonitor {
    registry: Arc<SubscriberRegistry>,
    /// Ids of the previously adopted snapshot; None until the first
    /// ingestion. Held across broadcast so ingestions are serialized and
    /// every new entry is broadcast at most once.
    seen_ids: Mutex<Option<HashSet<String>>>,
}

impl QuakeMonitor {
    pub fn new(registry: Arc<SubscriberRegistry>) -> Self {
        Self {
            registry,
            seen_ids: Mutex::new(None),
        }
    }

    /// Ingest a freshly fetched snapshot and broadcast its new entries,
    /// in snapshot order. Returns the number of entries broadcast.
    ///
    /// The first-ever ingestion adopts the snapshot silently so early
    /// subscribers are not flooded with the full current bulletin. A
    /// snapshot with no unseen ids leaves the held id set untouched: an
    /// entry is immutable once seen, so a same-id revision (e.g. a
    /// magnitude correction) is neither re-broadcast nor re-adopted.
    pub async fn ingest(&self, snapshot: &QuakeSnapshot) -> usize {
        let mut seen = self.seen_ids.lock().await;

        let snapshot_ids: HashSet<String> =
            snapshot.quakes.iter().map(|q| q.id.clone()).collect();

        let Some(previous) = seen.as_ref() else {
            tracing::info!(
                "Adopted initial snapshot of {} entries, nothing broadcast",
                snapshot.quakes.len()
            );
            *seen = Some(snapshot_ids);
            return 0;
        };

        let new_quakes: Vec<_> = snapshot
            .quakes
            .iter()
            .filter(|q| !previous.contains(&q.id))
            .collect();

        if new_quakes.is_empty() {
            return 0;
        }

        tracing::info!(
            "Detected {} new earthquake(s), broadcasting to {} subscriber(s)",
            new_quakes.len(),
            self.registry.subscriber_count().await
        );

        for quake in &new_quakes {
            self.registry.broadcast(quake).await;
        }

        let count = new_quakes.len();
        *seen = Some(snapshot_ids);
        count
    }
}
