//! Core types for Board Sync

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::BridgeError;

/// Number of cells on the board
pub const BOARD_CELLS: usize = 9;

/// Cell mark for an empty cell
pub const EMPTY: i64 = 0;

/// The synchronized document payload: board cell marks plus whose turn it is.
///
/// The board is expected to hold exactly [`BOARD_CELLS`] marks and `turn`
/// to be 1 or 2, but neither is enforced here. Values are passed through
/// exactly as the UI runtime or the store produced them, including any
/// fields other than `plays` and `turn`, which are kept in `extra`.
///
/// Marks and turn accept any integral JSON number, so `1.0` reads as `1`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    /// Cell marks in row-major order (0 = empty)
    #[serde(deserialize_with = "integral::marks")]
    pub plays: Vec<i64>,
    /// Player whose move is next
    #[serde(deserialize_with = "integral::mark")]
    pub turn: i64,
    /// Document fields the board does not use, carried along unchanged
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl GameState {
    /// A state with the given board and turn and no other fields
    pub fn new(plays: Vec<i64>, turn: i64) -> Self {
        Self {
            plays,
            turn,
            extra: Map::new(),
        }
    }

    /// The state of a game nobody has played yet: an empty board, player 1 to move.
    pub fn new_game() -> Self {
        Self::new(vec![EMPTY; BOARD_CELLS], 1)
    }

    /// Whether the state has the expected board shape and turn value.
    ///
    /// Diagnostic only. The bridge never rejects a state that fails this.
    pub fn is_well_formed(&self) -> bool {
        self.plays.len() == BOARD_CELLS && matches!(self.turn, 1 | 2)
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new_game()
    }
}

/// Integer decoding that also takes integral floats such as `1.0`
mod integral {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    fn to_i64(value: &Value) -> Option<i64> {
        let n = value.as_number()?;
        n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64)
                .map(|f| f as i64)
        })
    }

    fn require<E: Error>(value: &Value) -> Result<i64, E> {
        to_i64(value).ok_or_else(|| E::custom(format!("expected an integer, found {}", value)))
    }

    pub(super) fn mark<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        require(&Value::deserialize(deserializer)?)
    }

    pub(super) fn marks<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<i64>, D::Error> {
        Vec::<Value>::deserialize(deserializer)?
            .iter()
            .map(require)
            .collect()
    }
}

/// Key identifying which shared document a page binds to.
///
/// Derived from the page path, which is used as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GameId(String);

impl GameId {
    /// Build a GameId from the page path.
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::InvalidGameId` for an empty path or the bare
    /// root path `/`, which would otherwise bind every such page to one
    /// shared document.
    pub fn from_path(path: impl Into<String>) -> Result<Self, BridgeError> {
        let path = path.into();
        if path.trim().is_empty() || path == "/" {
            return Err(BridgeError::InvalidGameId(path));
        }
        Ok(Self(path))
    }

    /// The document key as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for GameId {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_path(s)
    }
}

impl std::fmt::Display for GameId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
