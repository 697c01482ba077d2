/// Errors that can occur while decoding commands or encoding results.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The `args` field could not be deserialized.
    #[error("invalid command args: {0}")]
    InvalidArgs(String),

    /// A required positional argument is missing.
    #[error("missing argument at position {position} ({name})")]
    MissingArgument { position: usize, name: &'static str },

    /// A positional argument has the wrong JSON type.
    #[error("argument at position {position} ({name}) must be {expected}")]
    ArgumentType {
        position: usize,
        name: &'static str,
        expected: &'static str,
    },

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ProtocolError>;
