use std::time::Duration;

use hybro_protocol::{CHUNK_SIZE, MESSAGE_CATEGORY};
use serde_json::{Map, Value};

/// Controls bridge behavior.
#[derive(Debug, Clone, PartialEq)]
pub struct BridgeConfig {
    /// Maximum characters of serialized result per channel message. Zero is treated as one.
    pub chunk_size: usize,
    /// Category tag the router listens on.
    pub message_category: String,
    /// Upper bound on a single invocation. `None` waits forever.
    pub invoke_timeout: Option<Duration>,
    /// Configuration for the embedded view, passed through untouched.
    pub view_options: Map<String, Value>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            chunk_size: CHUNK_SIZE,
            message_category: MESSAGE_CATEGORY.to_string(),
            invoke_timeout: None,
            view_options: Map::new(),
        }
    }
}
