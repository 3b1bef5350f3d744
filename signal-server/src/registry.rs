use std::collections::HashMap;
use std::time::Instant;

use rendezvous_proto::{ContactFrame, IDLE_TIMEOUT};
use tokio::sync::Mutex;

/// A single client's published contact frame and the time it was last
/// refreshed. Keyed by nickname in [`ClientRegistry`].
#[derive(Debug, Clone)]
struct ClientRecord {
    frame: ContactFrame,
    last_seen: Instant,
}

/// The signal server's entire piece of shared mutable state: `nickname ->
/// (frame, last_seen)`.
///
/// Guarded by a single mutex ("a single mutex serializes all access,
/// readers and writers alike") — adequate at the hundreds-of-peers scale this
/// system targets. A striped map or reader/writer lock would help GET
/// concurrency at larger scale, but that's future work, not this rewrite
/// (see DESIGN.md).
#[derive(Debug, Default)]
pub struct ClientRegistry {
    clients: Mutex<HashMap<String, ClientRecord>>,
}

impl ClientRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert a client's contact frame, refreshing `last_seen` regardless of
    /// whether the frame content changed (ADD idempotence).
    pub async fn upsert(&self, nickname: String, frame: ContactFrame) {
        let mut clients = self.clients.lock().await;
        clients.insert(
            nickname,
            ClientRecord {
                frame,
                last_seen: Instant::now(),
            },
        );
    }

    /// Snapshot of every currently-stored frame, for building a GET response.
    /// Iteration order is whatever the underlying map gives us; callers must
    /// not depend on it.
    pub async fn snapshot_frames(&self) -> Vec<ContactFrame> {
        let clients = self.clients.lock().await;
        clients.values().map(|r| r.frame.clone()).collect()
    }

    pub async fn len(&self) -> usize {
        self.clients.lock().await.len()
    }

    /// Remove every record whose `last_seen` is older than [`IDLE_TIMEOUT`],
    /// returning the nicknames that were evicted so the caller can log them.
    pub async fn evict_stale(&self) -> Vec<String> {
        let mut clients = self.clients.lock().await;
        let now = Instant::now();
        let stale: Vec<String> = clients
            .iter()
            .filter(|(_, record)| now.duration_since(record.last_seen) > IDLE_TIMEOUT)
            .map(|(nickname, _)| nickname.clone())
            .collect();
        for nickname in &stale {
            clients.remove(nickname);
        }
        stale
    }
}
