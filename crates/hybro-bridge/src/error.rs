use std::time::Duration;

use hybro_protocol::ProtocolError;

/// Failure reported by an exposed method or event source.
///
/// The message is forwarded to the guest verbatim; an empty message is
/// allowed when no description is available.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct MethodError {
    message: String,
}

impl MethodError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// A failure without description.
    pub fn empty() -> Self {
        Self::new(String::new())
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<&str> for MethodError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for MethodError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<serde_json::Error> for MethodError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(err.to_string())
    }
}

/// Errors raised while handling a command.
///
/// All of these are caught at the handler boundary and sent to the guest as
/// an `ERROR` result; none of them propagates out of the bridge.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// No package registered under this name.
    #[error("package '{0}' not found")]
    PackageNotFound(String),

    /// The package has no module with this name.
    #[error("module '{module}' not found in package '{package}'")]
    ModuleNotFound { package: String, module: String },

    /// The module exposes no method with this name.
    #[error("method '{method}' not found in {package}.{module}")]
    MethodNotFound {
        package: String,
        module: String,
        method: String,
    },

    /// The module does not declare this event.
    #[error("event '{0}' not found")]
    EventNotFound(String),

    /// The module has no event-subscription capability.
    #[error("module does not support event listeners")]
    EventsUnsupported,

    /// An ADD for the same listener key is still active.
    #[error("listener already registered: {0}")]
    ListenerExists(String),

    /// The resolved method or event source failed.
    #[error(transparent)]
    Method(#[from] MethodError),

    /// The invocation exceeded the configured timeout.
    #[error("invocation timed out after {0:?}")]
    Timeout(Duration),

    /// The method panicked instead of returning.
    #[error("method panicked: {0}")]
    Panicked(String),

    /// No tokio runtime is available to drive the invocation.
    #[error("no async runtime available for invocation")]
    NoRuntime,

    /// The command envelope or its arguments are malformed.
    #[error("invalid command: {0}")]
    Protocol(#[from] ProtocolError),
}

/// Errors reported by a channel's send primitive.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// The channel no longer accepts messages.
    #[error("channel closed")]
    Closed,

    /// The underlying transport rejected the message.
    #[error("channel send failed: {0}")]
    Send(String),

    /// JSON serialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_error_displays_bare_message() {
        assert_eq!(MethodError::new("division by zero").to_string(), "division by zero");
        assert_eq!(MethodError::empty().to_string(), "");
    }

    #[test]
    fn bridge_error_messages_name_the_target() {
        let err = BridgeError::MethodNotFound {
            package: "math".to_string(),
            module: "calc".to_string(),
            method: "missingMethod".to_string(),
        };
        assert_eq!(err.to_string(), "method 'missingMethod' not found in math.calc");

        let err = BridgeError::from(MethodError::new("boom"));
        assert_eq!(err.to_string(), "boom");
    }
}
