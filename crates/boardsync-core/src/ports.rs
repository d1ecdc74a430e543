//! Message ports between the bridge and a UI runtime
//!
//! A UI runtime exposes two ports: an inbound "pull" port that accepts
//! [`PullMessage`]s and an outbound "push" port that emits [`GameState`]s
//! whenever the UI changes state. [`channel`] creates both ports and hands
//! one end of each to the bridge and the other to the UI.
//!
//! ```text
//!   StateBridge                      UI runtime
//!   ┌──────────────┐  PullMessage   ┌──────────────┐
//!   │ PullSender   │ ─────────────▶ │ pull_rx      │
//!   │ PushReceiver │ ◀───────────── │ push_tx      │
//!   └──────────────┘   GameState    └──────────────┘
//! ```

use tokio::sync::mpsc;
use tracing::debug;

use crate::error::{BridgeError, BridgeResult};
use crate::events::PullMessage;
use crate::types::GameState;

/// Create a connected pair of port ends with the given buffer capacity
pub fn channel(capacity: usize) -> (BridgePorts, UiPorts) {
    let capacity = capacity.max(1);
    let (pull_tx, pull_rx) = mpsc::channel(capacity);
    let (push_tx, push_rx) = mpsc::channel(capacity);

    let bridge = BridgePorts {
        pull: PullSender { tx: pull_tx },
        push: PushReceiver { rx: push_rx },
    };
    let ui = UiPorts { pull_rx, push_tx };
    (bridge, ui)
}

/// Writes to the UI inbound port
#[derive(Clone)]
pub struct PullSender {
    tx: mpsc::Sender<PullMessage>,
}

impl PullSender {
    /// Deliver a message to the UI runtime
    ///
    /// Waits for buffer space. Fails only if the UI dropped its end.
    pub async fn send(&self, msg: PullMessage) -> BridgeResult<()> {
        self.tx
            .send(msg)
            .await
            .map_err(|_| BridgeError::PortClosed("pull"))
    }
}

/// Reads from the UI outbound port
///
/// Polled by a single task.
pub struct PushReceiver {
    rx: mpsc::Receiver<GameState>,
}

impl PushReceiver {
    /// Next state emitted by the UI, or `None` once the UI dropped its end
    pub async fn recv(&mut self) -> Option<GameState> {
        let state = self.rx.recv().await;
        if state.is_none() {
            debug!("Push port closed by UI runtime");
        }
        state
    }
}

/// The bridge's ends of the two ports
pub struct BridgePorts {
    pub pull: PullSender,
    pub push: PushReceiver,
}

/// The UI runtime's ends of the two ports
pub struct UiPorts {
    pull_rx: mpsc::Receiver<PullMessage>,
    push_tx: mpsc::Sender<GameState>,
}

impl UiPorts {
    /// Emit a new local state on the outbound port
    pub async fn push_state(&self, state: GameState) -> BridgeResult<()> {
        self.push_tx
            .send(state)
            .await
            .map_err(|_| BridgeError::PortClosed("push"))
    }

    /// Wait for the next inbound message
    pub async fn recv(&mut self) -> Option<PullMessage> {
        self.pull_rx.recv().await
    }

    /// Take an inbound message if one is already buffered
    pub fn try_recv(&mut self) -> Option<PullMessage> {
        self.pull_rx.try_recv().ok()
    }

    /// Split into the raw inbound receiver and outbound sender
    pub fn split(self) -> (mpsc::Receiver<PullMessage>, mpsc::Sender<GameState>) {
        (self.pull_rx, self.push_tx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pull_reaches_ui() {
        let (bridge, mut ui) = channel(4);
        bridge
            .pull
            .send(PullMessage::State(GameState::new_game()))
            .await
            .unwrap();

        let msg = ui.recv().await.unwrap();
        assert_eq!(msg, PullMessage::State(GameState::new_game()));
    }

    #[tokio::test]
    async fn test_push_reaches_bridge() {
        let (mut bridge, ui) = channel(4);
        let state = GameState::new(vec![1, 0, 0, 0, 0, 0, 0, 0, 0], 2);
        ui.push_state(state.clone()).await.unwrap();

        assert_eq!(bridge.push.recv().await, Some(state));
    }

    #[tokio::test]
    async fn test_dropped_ui_closes_ports() {
        let (mut bridge, ui) = channel(1);
        drop(ui);

        let err = bridge
            .pull
            .send(PullMessage::State(GameState::new_game()))
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::PortClosed("pull")));
        assert_eq!(bridge.push.recv().await, None);
    }

    #[tokio::test]
    async fn test_try_recv_empty() {
        let (_bridge, mut ui) = channel(1);
        assert!(ui.try_recv().is_none());
    }
}
