//! Bridge configuration

use serde::{Deserialize, Serialize};

/// Collection all game documents live in
pub const DEFAULT_COLLECTION: &str = "games";

/// Default buffer size of the UI port channels
pub const DEFAULT_PORT_CAPACITY: usize = 64;

/// Configuration for a [`StateBridge`](crate::StateBridge)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Store collection holding the game documents
    pub collection: String,
    /// Buffer size of each UI port channel
    pub port_capacity: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            collection: DEFAULT_COLLECTION.to_string(),
            port_capacity: DEFAULT_PORT_CAPACITY,
        }
    }
}

impl BridgeConfig {
    /// Use a different collection name
    pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
        self.collection = collection.into();
        self
    }

    /// Use a different channel capacity (clamped to at least 1)
    pub fn with_port_capacity(mut self, capacity: usize) -> Self {
        self.port_capacity = capacity.max(1);
        self
    }
}
