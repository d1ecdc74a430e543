//! Document store seam
//!
//! The bridge talks to the remote document store only through
//! [`DocumentStore`]. Two implementations ship with the crate:
//!
//! - [`MemoryStore`]: in-process documents, for tests and embedding hosts
//! - [`RedbStore`]: documents persisted to a redb database file
//!
//! Documents are JSON objects addressed by `(collection, document_id)`.
//! Writes always replace the whole document.

mod memory;
mod redb_store;

pub use self::memory::MemoryStore;
pub use self::redb_store::RedbStore;

use std::collections::HashMap;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::{BridgeError, BridgeResult};

/// A remote document store with change notifications
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Subscribe to changes of one document.
    ///
    /// The first item delivered is the document's current state (which may
    /// be absent). Every later write to the document yields one more item.
    async fn subscribe(&self, collection: &str, document_id: &str) -> BridgeResult<Subscription>;

    /// Replace the whole document.
    async fn set(&self, collection: &str, document_id: &str, document: Value) -> BridgeResult<()>;

    /// Read the document once.
    async fn get(&self, collection: &str, document_id: &str) -> BridgeResult<Snapshot>;
}

/// Point-in-time view of one document: its contents, or its absence
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    document_id: String,
    data: Option<Value>,
}

impl Snapshot {
    /// Snapshot of an existing document
    pub fn existing(document_id: impl Into<String>, data: Value) -> Self {
        Self {
            document_id: document_id.into(),
            data: Some(data),
        }
    }

    /// Snapshot of a document that does not exist
    pub fn missing(document_id: impl Into<String>) -> Self {
        Self {
            document_id: document_id.into(),
            data: None,
        }
    }

    pub fn document_id(&self) -> &str {
        &self.document_id
    }

    /// Whether the document exists
    pub fn exists(&self) -> bool {
        self.data.is_some()
    }

    /// Raw document contents, if the document exists
    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }

    /// Decode the document contents.
    ///
    /// Returns `Ok(None)` when the document does not exist.
    pub fn decode<T: DeserializeOwned>(&self) -> BridgeResult<Option<T>> {
        match &self.data {
            Some(value) => Ok(Some(T::deserialize(value)?)),
            None => Ok(None),
        }
    }
}

/// Stream of snapshots for one document
///
/// Ends (`next` returns `None`) when the store drops the subscription.
pub struct Subscription {
    rx: mpsc::UnboundedReceiver<BridgeResult<Snapshot>>,
}

impl Subscription {
    /// Create a subscription and the sender a store feeds it through
    pub fn channel() -> (SnapshotSender, Subscription) {
        let (tx, rx) = mpsc::unbounded_channel();
        (SnapshotSender { tx }, Subscription { rx })
    }

    /// Next snapshot or subscription error
    pub async fn next(&mut self) -> Option<BridgeResult<Snapshot>> {
        self.rx.recv().await
    }
}

/// Feeding end of a [`Subscription`]
#[derive(Clone)]
pub struct SnapshotSender {
    tx: mpsc::UnboundedSender<BridgeResult<Snapshot>>,
}

impl SnapshotSender {
    /// Deliver a snapshot. Returns `false` if the subscriber is gone.
    pub fn send(&self, snapshot: Snapshot) -> bool {
        self.tx.send(Ok(snapshot)).is_ok()
    }

    /// Deliver a subscription error. Returns `false` if the subscriber is gone.
    pub fn fail(&self, err: BridgeError) -> bool {
        self.tx.send(Err(err)).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Subscribers per document key.
///
/// Not synchronized itself: stores keep it under the same lock as their
/// writes so notifications follow commit order.
#[derive(Default)]
pub(crate) struct Watchers {
    by_key: HashMap<String, Vec<SnapshotSender>>,
}

impl Watchers {
    /// Register a subscriber and deliver `initial` to it first
    pub(crate) fn register(&mut self, key: String, initial: Snapshot) -> Subscription {
        let (tx, subscription) = Subscription::channel();
        tx.send(initial);
        self.by_key.entry(key).or_default().push(tx);
        subscription
    }

    /// Deliver `snapshot` to every live subscriber of `key`, forgetting dead ones
    pub(crate) fn notify(&mut self, key: &str, snapshot: &Snapshot) -> usize {
        let Some(senders) = self.by_key.get_mut(key) else {
            return 0;
        };
        senders.retain(|tx| tx.send(snapshot.clone()));
        let delivered = senders.len();
        if senders.is_empty() {
            self.by_key.remove(key);
        }
        delivered
    }

    /// Number of live subscribers of `key`
    pub(crate) fn count(&mut self, key: &str) -> usize {
        let Some(senders) = self.by_key.get_mut(key) else {
            return 0;
        };
        senders.retain(|tx| !tx.is_closed());
        senders.len()
    }
}

/// Storage key for a document
pub(crate) fn document_key(collection: &str, document_id: &str) -> String {
    format!("{}/{}", collection, document_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::GameState;

    #[test]
    fn test_snapshot_missing() {
        let snap = Snapshot::missing("/g1");
        assert!(!snap.exists());
        assert!(snap.data().is_none());
        assert_eq!(snap.decode::<GameState>().unwrap(), None);
    }

    #[test]
    fn test_snapshot_decode() {
        let snap = Snapshot::existing(
            "/g1",
            serde_json::json!({"plays": [1, 0, 0, 0, 0, 0, 0, 0, 0], "turn": 2}),
        );
        assert!(snap.exists());
        let state: GameState = snap.decode().unwrap().unwrap();
        assert_eq!(state.plays[0], 1);
        assert_eq!(state.turn, 2);
    }

    #[test]
    fn test_snapshot_decode_malformed() {
        let snap = Snapshot::existing("/g1", serde_json::json!({"board": "nope"}));
        let err = snap.decode::<GameState>().unwrap_err();
        assert!(matches!(err, BridgeError::Serialization(_)));
    }

    #[tokio::test]
    async fn test_watchers_deliver_initial_then_updates() {
        let mut watchers = Watchers::default();
        let mut sub = watchers.register("games/a".into(), Snapshot::missing("a"));

        let update = Snapshot::existing("a", serde_json::json!({"turn": 1}));
        assert_eq!(watchers.notify("games/a", &update), 1);
        assert_eq!(watchers.notify("games/b", &update), 0);

        assert_eq!(sub.next().await.unwrap().unwrap(), Snapshot::missing("a"));
        assert_eq!(sub.next().await.unwrap().unwrap(), update);
    }

    #[test]
    fn test_watchers_forget_dropped_subscribers() {
        let mut watchers = Watchers::default();
        let sub = watchers.register("games/a".into(), Snapshot::missing("a"));
        assert_eq!(watchers.count("games/a"), 1);

        drop(sub);
        assert_eq!(watchers.count("games/a"), 0);
        assert_eq!(watchers.notify("games/a", &Snapshot::missing("a")), 0);
    }

    #[test]
    fn test_document_key() {
        assert_eq!(document_key("games", "/abc"), "games//abc");
    }
}
