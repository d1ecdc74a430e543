//! Document store persisted with redb.
//!
//! Documents are stored as JSON bytes keyed `"<collection>/<document_id>"`.
//! Change notifications are delivered to subscribers in this process only,
//! after each write has been committed.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use redb::{Database, TableDefinition};
use serde_json::Value;
use tracing::{debug, info};

use super::{document_key, DocumentStore, Snapshot, Subscription, Watchers};
use crate::error::{BridgeError, BridgeResult};

const DOCUMENTS_TABLE: TableDefinition<&str, &[u8]> = TableDefinition::new("documents");

/// Persistent document store backed by a redb database file
#[derive(Clone)]
pub struct RedbStore {
    db: Arc<Database>,
    watchers: Arc<Mutex<Watchers>>,
    path: PathBuf,
}

impl RedbStore {
    /// Open (or create) the store at the given path.
    ///
    /// This will:
    /// - Create the parent directory if it doesn't exist
    /// - Initialize the database file
    /// - Create the documents table
    pub fn open(path: impl AsRef<Path>) -> Result<Self, BridgeError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::create(path)?;

        let write_txn = db.begin_write()?;
        {
            let _ = write_txn.open_table(DOCUMENTS_TABLE)?;
        }
        write_txn.commit()?;

        info!(path = %path.display(), "Opened document store");

        Ok(Self {
            db: Arc::new(db),
            watchers: Arc::new(Mutex::new(Watchers::default())),
            path: path.to_path_buf(),
        })
    }

    /// Path of the database file
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self, key: &str, document_id: &str) -> Result<Snapshot, BridgeError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(DOCUMENTS_TABLE)?;

        match table.get(key)? {
            Some(v) => {
                let data: Value = serde_json::from_slice(v.value())?;
                Ok(Snapshot::existing(document_id, data))
            }
            None => Ok(Snapshot::missing(document_id)),
        }
    }

    fn store(&self, key: &str, document: &Value) -> Result<(), BridgeError> {
        let data = serde_json::to_vec(document)?;
        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(DOCUMENTS_TABLE)?;
            table.insert(key, data.as_slice())?;
        }
        write_txn.commit()?;
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for RedbStore {
    async fn subscribe(&self, collection: &str, document_id: &str) -> BridgeResult<Subscription> {
        let key = document_key(collection, document_id);
        let mut watchers = self.watchers.lock();
        let initial = self.load(&key, document_id)?;
        debug!(%key, exists = initial.exists(), "Subscribed to document");
        Ok(watchers.register(key, initial))
    }

    async fn set(&self, collection: &str, document_id: &str, document: Value) -> BridgeResult<()> {
        let key = document_key(collection, document_id);
        let mut watchers = self.watchers.lock();
        self.store(&key, &document)
            .map_err(|e| BridgeError::Write(format!("{}: {}", key, e)))?;
        let notified = watchers.notify(&key, &Snapshot::existing(document_id, document));
        debug!(%key, notified, "Document replaced");
        Ok(())
    }

    async fn get(&self, collection: &str, document_id: &str) -> BridgeResult<Snapshot> {
        let key = document_key(collection, document_id);
        self.load(&key, document_id)
    }
}
