//! Board Sync Core Library
//!
//! Keeps a shared tic-tac-toe board in sync between a UI runtime and a
//! real-time document store.
//!
//! ## Overview
//!
//! A page binds to one game document, keyed by a [`GameId`] taken from
//! the page path. The [`StateBridge`] forwards every snapshot of that
//! document to the UI runtime's inbound port, and writes every state the
//! UI emits on its outbound port back to the store as a full replace.
//! Failures are delivered to the UI as [`PullMessage::Failure`] instead of
//! being dropped.
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use boardsync_core::{BridgeConfig, GameId, GameState, MemoryStore, StateBridge};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(MemoryStore::new());
//!     let bridge = StateBridge::new(store, GameId::from_path("/abc")?, BridgeConfig::default());
//!
//!     let (ports, mut ui) = bridge.open_ports();
//!     let handle = bridge.start(ports).await;
//!
//!     while let Some(msg) = ui.recv().await {
//!         println!("{:?}", msg);
//!     }
//!
//!     handle.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod bridge;
pub mod config;
pub mod error;
pub mod events;
pub mod ports;
pub mod store;
pub mod types;

// Re-exports
pub use bridge::{BridgeHandle, StateBridge};
pub use config::BridgeConfig;
pub use error::{BridgeError, BridgeResult};
pub use events::{BridgeStatus, FailureKind, PullMessage, SyncFailure};
pub use ports::{BridgePorts, PullSender, PushReceiver, UiPorts};
pub use store::{DocumentStore, MemoryStore, RedbStore, Snapshot, SnapshotSender, Subscription};
pub use types::*;
