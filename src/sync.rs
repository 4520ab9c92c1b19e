//! Cross-window sync bus.
//!
//! Messages are JSON envelopes on a broadcast transport shared by every
//! window in the process. Delivery is fire-and-forget with no ordering
//! guarantee across publishers; duplicates are expected, so every subscriber
//! keeps a bounded set of recently-seen message ids and applies each id at
//! most once. Unparseable payloads are treated as noise and dropped.

use std::collections::{HashSet, VecDeque};

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::{SEEN_IDS_CAPACITY, SYNC_CHANNEL_CAPACITY};
use crate::entity::Entity;

/// Typed payloads carried between windows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncPayload {
    /// Pause state toggled by the primary window; satellites follow.
    Paused { value: bool },
    /// A satellite window went away; drop it from local rosters.
    WindowClosed { id: String },
    /// Enemy left its window; position is in monitor space.
    EnemyTransfer { enemy: Entity },
    /// Projectile left its window; position is in monitor space.
    TransferProjectile { projectile: Entity },
    /// Authoritative boss count after a spawn (set, don't add).
    BossSpawned { window_id: String, count: u32 },
    /// Authoritative boss count after a removal.
    BossRemoved { window_id: String, count: u32 },
    /// Kills made in a satellite window, credited to the primary.
    KillcountIncrease { amount: u32 },
    /// The tutorial window was dismissed; persist the flag.
    TutorialSeen,
}

/// Wire envelope: a typed payload stamped with a globally unique id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncMessage {
    #[serde(rename = "messageId")]
    pub message_id: String,
    #[serde(flatten)]
    pub payload: SyncPayload,
}

/// Handle to the process-wide broadcast transport.
#[derive(Clone)]
pub struct SyncBus {
    tx: broadcast::Sender<String>,
}

impl SyncBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(SYNC_CHANNEL_CAPACITY);
        Self { tx }
    }

    /// Stamps a fresh message id and broadcasts. No acknowledgement; a send
    /// with no subscribers is fine. Returns the id so the publisher can mark
    /// its own echo as seen.
    pub fn publish(&self, payload: SyncPayload) -> String {
        let msg = SyncMessage {
            message_id: Uuid::new_v4().to_string(),
            payload,
        };
        let id = msg.message_id.clone();
        self.publish_envelope(&msg);
        id
    }

    /// Broadcasts a pre-built envelope, re-using its id. Re-publishing the
    /// same envelope is safe: receivers dedup by id.
    pub fn publish_envelope(&self, msg: &SyncMessage) {
        match serde_json::to_string(msg) {
            Ok(text) => {
                let _ = self.tx.send(text);
            }
            Err(e) => warn!(error = %e, "failed to encode sync message"),
        }
    }

    pub fn subscribe(&self) -> SyncSubscriber {
        SyncSubscriber {
            rx: self.tx.subscribe(),
            seen: SeenIds::new(SEEN_IDS_CAPACITY),
        }
    }
}

impl Default for SyncBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving side of the bus with per-subscriber dedup state.
pub struct SyncSubscriber {
    rx: broadcast::Receiver<String>,
    seen: SeenIds,
}

impl SyncSubscriber {
    /// Non-blocking poll used inside tick loops. Skips noise, duplicates and
    /// lagged slots; returns the next fresh message if one is queued.
    pub fn try_next(&mut self) -> Option<SyncMessage> {
        loop {
            let text = match self.rx.try_recv() {
                Ok(text) => text,
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Closed) => return None,
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "sync subscriber lagged, messages dropped");
                    continue;
                }
            };
            if let Some(msg) = self.accept(&text) {
                return Some(msg);
            }
        }
    }

    /// Awaits the next fresh message; `None` once the bus is gone.
    pub async fn next(&mut self) -> Option<SyncMessage> {
        loop {
            let text = match self.rx.recv().await {
                Ok(text) => text,
                Err(broadcast::error::RecvError::Closed) => return None,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "sync subscriber lagged, messages dropped");
                    continue;
                }
            };
            if let Some(msg) = self.accept(&text) {
                return Some(msg);
            }
        }
    }

    /// Marks an id as already applied, so the publisher's own echo of the
    /// message is not handled a second time.
    pub fn mark_seen(&mut self, message_id: &str) {
        self.seen.insert(message_id);
    }

    fn accept(&mut self, text: &str) -> Option<SyncMessage> {
        let msg: SyncMessage = match serde_json::from_str(text) {
            Ok(msg) => msg,
            Err(_) => {
                // Stale or foreign broadcast; ignore.
                debug!("discarding unparseable sync message");
                return None;
            }
        };
        if !self.seen.insert(&msg.message_id) {
            return None;
        }
        Some(msg)
    }
}

/// Bounded FIFO set of message ids.
struct SeenIds {
    capacity: usize,
    order: VecDeque<String>,
    ids: HashSet<String>,
}

impl SeenIds {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            order: VecDeque::with_capacity(capacity),
            ids: HashSet::with_capacity(capacity),
        }
    }

    /// Returns false if the id was already present.
    fn insert(&mut self, id: &str) -> bool {
        if self.ids.contains(id) {
            return false;
        }
        if self.order.len() == self.capacity {
            if let Some(evicted) = self.order.pop_front() {
                self.ids.remove(&evicted);
            }
        }
        self.order.push_back(id.to_string());
        self.ids.insert(id.to_string());
        true
    }
}
