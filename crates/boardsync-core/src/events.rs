//! Messages delivered to the UI runtime and bridge status tracking
//!
//! ## Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  PullMessage: what the UI inbound port receives                 │
//! │  ├── State: current board (or the default for a new game)       │
//! │  └── Failure: a sync failure the UI should know about           │
//! │                                                                 │
//! │  BridgeStatus: lifecycle of one bridge                          │
//! │  ├── Idle: constructed, not started                             │
//! │  ├── Subscribed: receiving snapshots                            │
//! │  ├── Degraded: subscription lost, writes still flow             │
//! │  └── Stopped: loop finished                                     │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use std::fmt;

use crate::error::BridgeError;
use crate::types::GameState;

/// Category of a failure surfaced to the UI runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Snapshots stopped arriving or could not be decoded
    Subscription,
    /// A local state was not written to the store
    Write,
    /// The page path does not name a game
    InvalidGameId,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Subscription => write!(f, "subscription"),
            FailureKind::Write => write!(f, "write"),
            FailureKind::InvalidGameId => write!(f, "invalid game id"),
        }
    }
}

/// A failure delivered on the UI inbound port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl SyncFailure {
    /// Classify an error for the UI. Anything that is not a game id
    /// problem falls into `fallback`, which is the side of the bridge
    /// that observed it.
    pub fn from_error(err: &BridgeError, fallback: FailureKind) -> Self {
        let kind = match err {
            BridgeError::InvalidGameId(_) => FailureKind::InvalidGameId,
            BridgeError::Subscription(_) => FailureKind::Subscription,
            BridgeError::Write(_) => FailureKind::Write,
            _ => fallback,
        };
        Self {
            kind,
            message: err.to_string(),
        }
    }
}

impl fmt::Display for SyncFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failure: {}", self.kind, self.message)
    }
}

/// Message sent to the UI runtime's inbound ("pull") port
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PullMessage {
    /// The document's current state
    State(GameState),
    /// Something went wrong while syncing
    Failure(SyncFailure),
}

impl PullMessage {
    /// The carried state, if this is a state message
    pub fn state(&self) -> Option<&GameState> {
        match self {
            PullMessage::State(state) => Some(state),
            PullMessage::Failure(_) => None,
        }
    }

    /// The carried failure, if this is a failure message
    pub fn failure(&self) -> Option<&SyncFailure> {
        match self {
            PullMessage::State(_) => None,
            PullMessage::Failure(failure) => Some(failure),
        }
    }
}

/// Lifecycle status of a bridge
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeStatus {
    /// Constructed but not started
    Idle,
    /// Subscribed and forwarding in both directions
    Subscribed,
    /// The subscription failed; local writes are still forwarded
    Degraded(String),
    /// The sync loop has finished
    Stopped,
}

impl Default for BridgeStatus {
    fn default() -> Self {
        BridgeStatus::Idle
    }
}

impl fmt::Display for BridgeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BridgeStatus::Idle => write!(f, "Idle"),
            BridgeStatus::Subscribed => write!(f, "Subscribed"),
            BridgeStatus::Degraded(reason) => write!(f, "Degraded: {}", reason),
            BridgeStatus::Stopped => write!(f, "Stopped"),
        }
    }
}
