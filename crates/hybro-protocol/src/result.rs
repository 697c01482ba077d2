use serde::{Deserialize, Serialize};

use crate::command::CommandId;
use crate::types::ResultType;

/// One channel message carrying (part of) a logical result.
///
/// Every chunk of the same logical result shares `id`, `command_id`, `parts`
/// and `result_type`; `index` runs `0..parts` in send order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutgoingResult {
    #[serde(rename = "type")]
    pub result_type: ResultType,
    /// Chunk-group id, fresh for every logical result.
    pub id: String,
    /// Echo of the originating command's id.
    pub command_id: CommandId,
    /// This chunk's slice of the serialized result.
    pub result: String,
    pub parts: usize,
    pub index: usize,
}

/// Body of an `ERROR` result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ErrorPayload {
    /// Human-readable failure description, empty when none is available.
    pub message: String,
}

impl ErrorPayload {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
