//! Error types for Board Sync

use thiserror::Error;

/// Main error type for Board Sync operations
#[derive(Error, Debug)]
pub enum BridgeError {
    /// The page path does not name a game
    #[error("Invalid game id: {0:?}")]
    InvalidGameId(String),

    /// The document subscription failed or closed
    #[error("Subscription error: {0}")]
    Subscription(String),

    /// A full-document replace was not applied
    #[error("Write error: {0}")]
    Write(String),

    /// Error during storage operations (redb)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Database creation/opening error
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    /// Transaction error
    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    /// Table error
    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    /// Storage operation error
    #[error("Storage operation error: {0}")]
    StorageOp(#[from] redb::StorageError),

    /// Commit error
    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    /// Error during serialization/deserialization
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// General I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The UI runtime dropped one of its ports
    #[error("Port closed: {0}")]
    PortClosed(&'static str),
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        BridgeError::Serialization(err.to_string())
    }
}

/// Result type alias using BridgeError
pub type BridgeResult<T> = Result<T, BridgeError>;
