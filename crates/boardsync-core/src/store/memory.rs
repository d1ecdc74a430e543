//! In-process document store

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::debug;

use super::{document_key, DocumentStore, Snapshot, Subscription, Watchers};
use crate::error::BridgeResult;

#[derive(Default)]
struct Inner {
    documents: HashMap<String, Value>,
    watchers: Watchers,
}

/// Document store that keeps everything in memory
///
/// Clones share the same documents, so one clone can be handed to a
/// bridge while another inspects or mutates the store.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove a document, notifying subscribers that it no longer exists
    pub fn delete(&self, collection: &str, document_id: &str) {
        let key = document_key(collection, document_id);
        let mut inner = self.inner.lock();
        if inner.documents.remove(&key).is_some() {
            inner
                .watchers
                .notify(&key, &Snapshot::missing(document_id));
        }
    }

    /// Number of live subscriptions on a document
    pub fn subscriber_count(&self, collection: &str, document_id: &str) -> usize {
        let key = document_key(collection, document_id);
        self.inner.lock().watchers.count(&key)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn subscribe(&self, collection: &str, document_id: &str) -> BridgeResult<Subscription> {
        let key = document_key(collection, document_id);
        let mut inner = self.inner.lock();
        let initial = match inner.documents.get(&key) {
            Some(data) => Snapshot::existing(document_id, data.clone()),
            None => Snapshot::missing(document_id),
        };
        debug!(%key, exists = initial.exists(), "Subscribed to document");
        Ok(inner.watchers.register(key, initial))
    }

    async fn set(&self, collection: &str, document_id: &str, document: Value) -> BridgeResult<()> {
        let key = document_key(collection, document_id);
        let snapshot = Snapshot::existing(document_id, document.clone());
        let mut inner = self.inner.lock();
        inner.documents.insert(key.clone(), document);
        let notified = inner.watchers.notify(&key, &snapshot);
        debug!(%key, notified, "Document replaced");
        Ok(())
    }

    async fn get(&self, collection: &str, document_id: &str) -> BridgeResult<Snapshot> {
        let key = document_key(collection, document_id);
        let inner = self.inner.lock();
        Ok(match inner.documents.get(&key) {
            Some(data) => Snapshot::existing(document_id, data.clone()),
            None => Snapshot::missing(document_id),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_get_missing() {
        let store = MemoryStore::new();
        let snap = store.get("games", "/a").await.unwrap();
        assert!(!snap.exists());
    }

    #[tokio::test]
    async fn test_set_replaces_whole_document() {
        let store = MemoryStore::new();
        store
            .set("games", "/a", json!({"plays": [1], "turn": 2, "stale": true}))
            .await
            .unwrap();
        store
            .set("games", "/a", json!({"plays": [0], "turn": 1}))
            .await
            .unwrap();

        let snap = store.get("games", "/a").await.unwrap();
        assert_eq!(snap.data(), Some(&json!({"plays": [0], "turn": 1})));
    }

    #[tokio::test]
    async fn test_collections_are_separate() {
        let store = MemoryStore::new();
        store.set("games", "/a", json!({"turn": 1})).await.unwrap();

        assert!(store.get("games", "/a").await.unwrap().exists());
        assert!(!store.get("lobby", "/a").await.unwrap().exists());
    }

    #[tokio::test]
    async fn test_subscribe_sees_initial_and_updates() {
        let store = MemoryStore::new();
        let mut sub = store.subscribe("games", "/a").await.unwrap();

        let first = sub.next().await.unwrap().unwrap();
        assert!(!first.exists());

        store.set("games", "/a", json!({"turn": 2})).await.unwrap();
        let second = sub.next().await.unwrap().unwrap();
        assert_eq!(second.data(), Some(&json!({"turn": 2})));

        store.delete("games", "/a");
        let third = sub.next().await.unwrap().unwrap();
        assert!(!third.exists());
    }

    #[tokio::test]
    async fn test_subscriber_count_tracks_drops() {
        let store = MemoryStore::new();
        let sub = store.subscribe("games", "/a").await.unwrap();
        assert_eq!(store.subscriber_count("games", "/a"), 1);

        drop(sub);
        assert_eq!(store.subscriber_count("games", "/a"), 0);
    }
}
