//! Command and result type tags.
//!
//! The string forms are exchanged with guest-side script verbatim.

use serde::{Deserialize, Serialize};

/// Category tag the message sub-channel uses for structured payloads.
pub const MESSAGE_CATEGORY: &str = "json";

/// Wire tag: invoke a method.
pub const INVOKE: &str = "INVOKE";
/// Wire tag: subscribe to an event.
pub const ADD_EVENT_LISTENER: &str = "ADD_EVENT_LISTENER";
/// Wire tag: unsubscribe from an event.
pub const REMOVE_EVENT_LISTENER: &str = "REMOVE_EVENT_LISTENER";

/// Wire tag: successful completion.
pub const SUCCESS: &str = "SUCCESS";
/// Wire tag: failed completion.
pub const ERROR: &str = "ERROR";
/// Wire tag: event fired on a live subscription.
pub const EVENT: &str = "EVENT";

/// Kind of an incoming command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommandType {
    #[serde(rename = "INVOKE")]
    Invoke,
    #[serde(rename = "ADD_EVENT_LISTENER")]
    AddEventListener,
    #[serde(rename = "REMOVE_EVENT_LISTENER")]
    RemoveEventListener,
}

impl CommandType {
    /// Parse a wire tag. Unknown tags yield `None`.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            INVOKE => Some(Self::Invoke),
            ADD_EVENT_LISTENER => Some(Self::AddEventListener),
            REMOVE_EVENT_LISTENER => Some(Self::RemoveEventListener),
            _ => None,
        }
    }

    /// The wire tag for this command type.
    pub fn as_tag(self) -> &'static str {
        match self {
            Self::Invoke => INVOKE,
            Self::AddEventListener => ADD_EVENT_LISTENER,
            Self::RemoveEventListener => REMOVE_EVENT_LISTENER,
        }
    }
}

/// Kind of an outgoing result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResultType {
    #[serde(rename = "SUCCESS")]
    Success,
    #[serde(rename = "ERROR")]
    Error,
    #[serde(rename = "EVENT")]
    Event,
}

impl ResultType {
    /// The wire tag for this result type.
    pub fn as_tag(self) -> &'static str {
        match self {
            Self::Success => SUCCESS,
            Self::Error => ERROR,
            Self::Event => EVENT,
        }
    }
}
