//! Bidirectional sync between one game document and a UI runtime
//!
//! The `StateBridge` forwards every snapshot of the bound document to the
//! UI inbound port, and every state the UI emits on its outbound port to
//! the store as a full-document replace.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  sync loop (one task per bridge)                                │
//! │  ├── Subscription ──▶ on_remote_change ──▶ PullSender           │
//! │  ├── PushReceiver ──▶ on_local_change  ──▶ DocumentStore::set   │
//! │  ├── failures      ──▶ PullMessage::Failure                     │
//! │  └── CancellationToken (shutdown)                               │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Events are handled one at a time, and snapshots already queued on the
//! subscription are always forwarded before the next local state is taken.
//! A snapshot that was produced before a local write therefore reaches the
//! UI before that write starts, unless it arrives while the write is in
//! flight. In that case it is forwarded after the write completes and is
//! followed by the write's own echo, so the UI still ends on the written
//! state. Conflicts between different clients are last-write-wins at the
//! store.

use std::sync::Arc;

use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::BridgeConfig;
use crate::error::{BridgeError, BridgeResult};
use crate::events::{BridgeStatus, FailureKind, PullMessage, SyncFailure};
use crate::ports::{self, BridgePorts, PullSender, UiPorts};
use crate::store::{DocumentStore, Snapshot, Subscription};
use crate::types::{GameId, GameState};

/// Keeps one game document and one UI runtime in sync
///
/// # Example
///
/// ```ignore
/// let store = Arc::new(MemoryStore::new());
/// let bridge = StateBridge::new(store, GameId::from_path("/abc")?, BridgeConfig::default());
/// let (bridge_ports, mut ui) = bridge.open_ports();
/// let handle = bridge.start(bridge_ports).await;
///
/// // First message is the current board (an empty one for a new game)
/// let first = ui.recv().await;
///
/// ui.push_state(GameState::new(vec![1, 0, 0, 0, 0, 0, 0, 0, 0], 2)).await?;
/// handle.shutdown().await;
/// ```
pub struct StateBridge {
    store: Arc<dyn DocumentStore>,
    game_id: GameId,
    config: BridgeConfig,
    status: Arc<RwLock<BridgeStatus>>,
}

impl StateBridge {
    /// Create a bridge for one game. Nothing happens until [`start`](Self::start).
    pub fn new(store: Arc<dyn DocumentStore>, game_id: GameId, config: BridgeConfig) -> Self {
        Self {
            store,
            game_id,
            config,
            status: Arc::new(RwLock::new(BridgeStatus::Idle)),
        }
    }

    /// Derive the game from a page path, bind to it and start syncing.
    ///
    /// An unusable path is reported to the UI as an `InvalidGameId`
    /// failure before the error is returned.
    pub async fn bind_path(
        store: Arc<dyn DocumentStore>,
        path: &str,
        config: BridgeConfig,
        ports: BridgePorts,
    ) -> BridgeResult<BridgeHandle> {
        let game_id = match GameId::from_path(path) {
            Ok(id) => id,
            Err(e) => {
                warn!(path, "Refusing to bind to page path");
                let failure = SyncFailure::from_error(&e, FailureKind::InvalidGameId);
                // The caller gets the error either way
                let _ = ports.pull.send(PullMessage::Failure(failure)).await;
                return Err(e);
            }
        };
        Ok(Self::new(store, game_id, config).start(ports).await)
    }

    pub fn game_id(&self) -> &GameId {
        &self.game_id
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Current lifecycle status
    pub fn status(&self) -> BridgeStatus {
        self.status.read().clone()
    }

    /// Create UI ports sized by this bridge's configuration
    pub fn open_ports(&self) -> (BridgePorts, UiPorts) {
        ports::channel(self.config.port_capacity)
    }

    /// Forward one snapshot of the bound document to the UI.
    ///
    /// A missing document is delivered as [`GameState::new_game`]. An
    /// existing one is delivered exactly as stored. Identical consecutive
    /// snapshots are each forwarded.
    ///
    /// # Errors
    ///
    /// `BridgeError::Subscription` if the document cannot be decoded as a
    /// game state, `BridgeError::PortClosed` if the UI dropped its port.
    pub async fn on_remote_change(
        &self,
        snapshot: &Snapshot,
        pull: &PullSender,
    ) -> BridgeResult<()> {
        let state = match snapshot.decode::<GameState>() {
            Ok(Some(state)) => state,
            Ok(None) => {
                debug!(game_id = %self.game_id, "Document absent, delivering new game");
                GameState::new_game()
            }
            Err(e) => {
                return Err(BridgeError::Subscription(format!(
                    "malformed document {}: {}",
                    snapshot.document_id(),
                    e
                )));
            }
        };

        if !state.is_well_formed() {
            debug!(game_id = %self.game_id, ?state, "Forwarding state with unexpected shape");
        }

        pull.send(PullMessage::State(state)).await
    }

    /// Replace the bound document with a state the UI produced.
    ///
    /// # Errors
    ///
    /// `BridgeError::Write` if the store did not apply the write.
    pub async fn on_local_change(&self, state: &GameState) -> BridgeResult<()> {
        let document = serde_json::to_value(state)?;
        self.store
            .set(&self.config.collection, self.game_id.as_str(), document)
            .await
            .map_err(|e| match e {
                BridgeError::Write(_) => e,
                other => BridgeError::Write(other.to_string()),
            })?;
        debug!(game_id = %self.game_id, turn = state.turn, "Local state written");
        Ok(())
    }

    /// Open the subscription and spawn the sync loop.
    ///
    /// If the subscription cannot be opened the failure is sent to the UI
    /// and the bridge runs degraded, still forwarding local writes.
    pub async fn start(self, ports: BridgePorts) -> BridgeHandle {
        info!(game_id = %self.game_id, collection = %self.config.collection, "Starting state bridge");

        let subscription = match self
            .store
            .subscribe(&self.config.collection, self.game_id.as_str())
            .await
        {
            Ok(sub) => {
                self.set_status(BridgeStatus::Subscribed);
                Some(sub)
            }
            Err(e) => {
                error!(game_id = %self.game_id, error = %e, "Failed to subscribe");
                self.set_status(BridgeStatus::Degraded(e.to_string()));
                let failure = SyncFailure::from_error(&e, FailureKind::Subscription);
                let _ = ports.pull.send(PullMessage::Failure(failure)).await;
                None
            }
        };

        let cancel = CancellationToken::new();
        let status = self.status.clone();
        let game_id = self.game_id.clone();
        let loop_cancel = cancel.clone();

        let task = tokio::spawn(async move {
            self.run(subscription, ports, loop_cancel).await;
        });

        BridgeHandle {
            task,
            cancel,
            status,
            game_id,
        }
    }

    async fn run(
        self,
        mut subscription: Option<Subscription>,
        mut ports: BridgePorts,
        cancel: CancellationToken,
    ) {
        loop {
            // Queued snapshots are drained before the next local state is taken
            tokio::select! {
                biased;

                _ = cancel.cancelled() => {
                    info!(game_id = %self.game_id, "Bridge shutdown requested");
                    break;
                }
                remote = next_snapshot(&mut subscription) => {
                    match remote {
                        Some(Ok(snapshot)) => match self.on_remote_change(&snapshot, &ports.pull).await {
                            Ok(()) => {}
                            Err(BridgeError::PortClosed(port)) => {
                                info!(game_id = %self.game_id, port, "UI port closed");
                                break;
                            }
                            Err(e) => {
                                warn!(game_id = %self.game_id, error = %e, "Snapshot not forwarded");
                                if !self.surface(&ports.pull, &e, FailureKind::Subscription).await {
                                    break;
                                }
                            }
                        },
                        Some(Err(e)) => {
                            warn!(game_id = %self.game_id, error = %e, "Subscription reported an error");
                            self.set_status(BridgeStatus::Degraded(e.to_string()));
                            if !self.surface(&ports.pull, &e, FailureKind::Subscription).await {
                                break;
                            }
                        }
                        None => {
                            warn!(game_id = %self.game_id, "Subscription closed by store");
                            subscription = None;
                            let e = BridgeError::Subscription("subscription closed by store".into());
                            self.set_status(BridgeStatus::Degraded(e.to_string()));
                            if !self.surface(&ports.pull, &e, FailureKind::Subscription).await {
                                break;
                            }
                        }
                    }
                }
                local = ports.push.recv() => {
                    let Some(state) = local else {
                        info!(game_id = %self.game_id, "UI push port closed");
                        break;
                    };
                    if let Err(e) = self.on_local_change(&state).await {
                        warn!(game_id = %self.game_id, error = %e, "Local state not written");
                        if !self.surface(&ports.pull, &e, FailureKind::Write).await {
                            break;
                        }
                    }
                }
            }
        }

        self.set_status(BridgeStatus::Stopped);
        info!(game_id = %self.game_id, "State bridge stopped");
    }

    /// Send a failure to the UI. Returns `false` if the UI is gone.
    async fn surface(&self, pull: &PullSender, err: &BridgeError, side: FailureKind) -> bool {
        let failure = SyncFailure::from_error(err, side);
        pull.send(PullMessage::Failure(failure)).await.is_ok()
    }

    fn set_status(&self, status: BridgeStatus) {
        *self.status.write() = status;
    }
}

/// Waits forever once the subscription is gone, so the loop keeps serving writes
async fn next_snapshot(subscription: &mut Option<Subscription>) -> Option<BridgeResult<Snapshot>> {
    match subscription {
        Some(sub) => sub.next().await,
        None => std::future::pending().await,
    }
}

/// Handle to a running bridge
pub struct BridgeHandle {
    task: JoinHandle<()>,
    cancel: CancellationToken,
    status: Arc<RwLock<BridgeStatus>>,
    game_id: GameId,
}

impl BridgeHandle {
    pub fn game_id(&self) -> &GameId {
        &self.game_id
    }

    /// Current lifecycle status
    pub fn status(&self) -> BridgeStatus {
        self.status.read().clone()
    }

    /// Whether the sync loop has exited
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop the sync loop and drop the subscription.
    ///
    /// A write already in progress is allowed to finish.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        self.wait().await;
    }

    /// Wait for the loop to exit on its own (the UI dropped its ports)
    pub async fn wait(self) {
        if let Err(e) = self.task.await {
            error!(game_id = %self.game_id, error = %e, "Bridge task failed");
            *self.status.write() = BridgeStatus::Stopped;
        }
    }
}
