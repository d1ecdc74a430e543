//! Property-based tests for the state bridge
//!
//! Uses proptest to check that states pass through the bridge unmodified
//! in both directions and that writes fully replace the document.

use std::sync::Arc;

use boardsync_core::{
    BridgeConfig, DocumentStore, GameId, GameState, MemoryStore, PullMessage, Snapshot,
    StateBridge,
};
use proptest::prelude::*;

// ============================================================================
// Strategy Generators
// ============================================================================

/// Boards with nine cells holding 0, 1 or 2
fn board_strategy() -> impl Strategy<Value = GameState> {
    (prop::collection::vec(0i64..=2, 9), 1i64..=2).prop_map(|(plays, turn)| GameState::new(plays, turn))
}

/// Any shape at all, since the bridge does not validate
fn any_state_strategy() -> impl Strategy<Value = GameState> {
    (prop::collection::vec(any::<i64>(), 0..16), any::<i64>())
        .prop_map(|(plays, turn)| GameState::new(plays, turn))
}

/// Documents with fields the board does not use next to `plays` and `turn`
fn document_with_extras_strategy() -> impl Strategy<Value = serde_json::Value> {
    (
        board_strategy(),
        prop::collection::btree_map("x_[a-z]{1,8}", any::<i64>(), 0..4),
    )
        .prop_map(|(state, extras)| {
            let mut doc = serde_json::to_value(&state).unwrap();
            for (key, value) in extras {
                doc[key] = serde_json::json!(value);
            }
            doc
        })
}

/// Paths a page could be served from
fn path_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("/[a-zA-Z0-9_-]{1,24}").expect("valid regex")
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn bridge_for(store: &MemoryStore, path: &str) -> StateBridge {
    StateBridge::new(
        Arc::new(store.clone()),
        GameId::from_path(path).unwrap(),
        BridgeConfig::default(),
    )
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    /// Whatever the store holds is what the UI receives
    #[test]
    fn stored_state_is_delivered_unmodified(state in any_state_strategy(), path in path_strategy()) {
        let received = runtime().block_on(async {
            let store = MemoryStore::new();
            store
                .set("games", &path, serde_json::to_value(&state).unwrap())
                .await
                .unwrap();

            let bridge = bridge_for(&store, &path);
            let (ports, mut ui) = bridge.open_ports();
            let snapshot = store.get("games", &path).await.unwrap();
            bridge.on_remote_change(&snapshot, &ports.pull).await.unwrap();
            ui.recv().await
        });

        prop_assert_eq!(received, Some(PullMessage::State(state)));
    }

    /// Fields outside the board reach the UI along with it
    #[test]
    fn stored_document_round_trips_through_ui(doc in document_with_extras_strategy()) {
        let received = runtime().block_on(async {
            let store = MemoryStore::new();
            store.set("games", "/g", doc.clone()).await.unwrap();

            let bridge = bridge_for(&store, "/g");
            let (ports, mut ui) = bridge.open_ports();
            let snapshot = store.get("games", "/g").await.unwrap();
            bridge.on_remote_change(&snapshot, &ports.pull).await.unwrap();
            ui.recv().await
        });

        let state = received.and_then(|msg| msg.state().cloned());
        prop_assert_eq!(state.map(|s| serde_json::to_value(&s).unwrap()), Some(doc));
    }

    /// A local write leaves exactly the written state in the store
    #[test]
    fn local_change_fully_replaces(before in board_strategy(), after in board_strategy()) {
        let stored = runtime().block_on(async {
            let store = MemoryStore::new();
            let mut stale = serde_json::to_value(&before).unwrap();
            stale["winner"] = serde_json::json!(1);
            store.set("games", "/g", stale).await.unwrap();

            let bridge = bridge_for(&store, "/g");
            bridge.on_local_change(&after).await.unwrap();
            store.get("games", "/g").await.unwrap()
        });

        prop_assert_eq!(stored, Snapshot::existing("/g", serde_json::to_value(&after).unwrap()));
    }

    /// Writing the same state twice is the same as writing it once
    #[test]
    fn local_change_is_idempotent(state in board_strategy()) {
        let (once, twice) = runtime().block_on(async {
            let store = MemoryStore::new();
            let bridge = bridge_for(&store, "/g");

            bridge.on_local_change(&state).await.unwrap();
            let once = store.get("games", "/g").await.unwrap();
            bridge.on_local_change(&state).await.unwrap();
            let twice = store.get("games", "/g").await.unwrap();
            (once, twice)
        });

        prop_assert_eq!(once, twice);
    }

    /// Any non-root path is used as the document id verbatim
    #[test]
    fn game_id_is_the_path(path in path_strategy()) {
        let id = GameId::from_path(path.clone()).unwrap();
        prop_assert_eq!(id.as_str(), path.as_str());
    }
}
