use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::codec::parse;
use crate::error::{ProtocolError, Result};
use crate::types::CommandType;

/// Guest-supplied correlation token.
///
/// The host never interprets it: it is echoed back as `commandId` on every
/// result and used as one component of a listener key. Uniqueness is the
/// guest's business.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct CommandId(Value);

impl CommandId {
    /// Wrap an arbitrary JSON value.
    pub fn new(value: impl Into<Value>) -> Self {
        Self(value.into())
    }

    /// Borrow the raw JSON value.
    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Canonical text form, stable for equal ids.
    ///
    /// Strings keep their bare contents so `"c1"` and `c1` log the same way;
    /// every other JSON value uses its serialized form.
    pub fn key(&self) -> String {
        match &self.0 {
            Value::String(text) => text.clone(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

impl From<&str> for CommandId {
    fn from(value: &str) -> Self {
        Self(Value::String(value.to_string()))
    }
}

impl From<String> for CommandId {
    fn from(value: String) -> Self {
        Self(Value::String(value))
    }
}

impl From<u64> for CommandId {
    fn from(value: u64) -> Self {
        Self(Value::from(value))
    }
}

/// Structured payload as delivered by the message sub-channel.
///
/// `args` normally carries the serialized argument sequence as a string; an
/// already-structured array is accepted too.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawMessage {
    #[serde(default)]
    pub id: CommandId,
    #[serde(rename = "type")]
    pub msg_type: String,
    #[serde(default)]
    pub args: Value,
}

impl RawMessage {
    /// Build a raw message the way guest script does, serializing `args`.
    pub fn new(id: impl Into<CommandId>, kind: CommandType, args: &[Value]) -> Self {
        Self {
            id: id.into(),
            msg_type: kind.as_tag().to_string(),
            args: Value::String(Value::Array(args.to_vec()).to_string()),
        }
    }
}

/// A decoded command ready for dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub id: CommandId,
    pub kind: CommandType,
    pub args: Vec<Value>,
}

impl Command {
    /// Create a command from already-decoded parts.
    pub fn new(id: impl Into<CommandId>, kind: CommandType, args: Vec<Value>) -> Self {
        Self {
            id: id.into(),
            kind,
            args,
        }
    }

    /// Decode a raw message.
    ///
    /// Returns `Ok(None)` for unknown command types so newer guests can send
    /// message kinds an older host does not understand.
    pub fn from_raw(raw: RawMessage) -> Result<Option<Self>> {
        let Some(kind) = CommandType::from_tag(&raw.msg_type) else {
            return Ok(None);
        };

        let args = match raw.args {
            Value::String(text) => parse::<Vec<Value>>(&text)
                .map_err(|err| ProtocolError::InvalidArgs(err.to_string()))?,
            Value::Array(items) => items,
            Value::Null => Vec::new(),
            other => {
                return Err(ProtocolError::InvalidArgs(format!(
                    "expected serialized array, got {other}"
                )))
            }
        };

        Ok(Some(Self {
            id: raw.id,
            kind,
            args,
        }))
    }

    /// Copy of this command with its type overwritten.
    pub fn with_kind(&self, kind: CommandType) -> Self {
        Self {
            id: self.id.clone(),
            kind,
            args: self.args.clone(),
        }
    }
}

/// Arguments of an `INVOKE` command: `[package, module, method, params?]`.
#[derive(Debug, Clone, PartialEq)]
pub struct InvokeArgs {
    pub package: String,
    pub module: String,
    pub method: String,
    pub params: Vec<Value>,
}

impl InvokeArgs {
    pub fn from_args(args: &[Value]) -> Result<Self> {
        let params = match args.get(3) {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items.clone(),
            Some(_) => {
                return Err(ProtocolError::ArgumentType {
                    position: 3,
                    name: "params",
                    expected: "an array",
                })
            }
        };

        Ok(Self {
            package: string_arg(args, 0, "package")?,
            module: string_arg(args, 1, "module")?,
            method: string_arg(args, 2, "method")?,
            params,
        })
    }
}

/// Arguments of a listener command: `[package, module, event]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListenerArgs {
    pub package: String,
    pub module: String,
    pub event: String,
}

impl ListenerArgs {
    pub fn from_args(args: &[Value]) -> Result<Self> {
        Ok(Self {
            package: string_arg(args, 0, "package")?,
            module: string_arg(args, 1, "module")?,
            event: string_arg(args, 2, "event")?,
        })
    }
}

fn string_arg(args: &[Value], position: usize, name: &'static str) -> Result<String> {
    match args.get(position) {
        Some(Value::String(value)) => Ok(value.clone()),
        Some(_) => Err(ProtocolError::ArgumentType {
            position,
            name,
            expected: "a string",
        }),
        None => Err(ProtocolError::MissingArgument { position, name }),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn raw_message_deserializes_from_guest_payload() {
        let raw: RawMessage = serde_json::from_value(json!({
            "id": "c1",
            "type": "INVOKE",
            "args": "[\"math\",\"calc\",\"add\",[2,3]]"
        }))
        .expect("guest payload should parse");

        let command = Command::from_raw(raw)
            .expect("args should decode")
            .expect("INVOKE is a known type");
        assert_eq!(command.id, CommandId::from("c1"));
        assert_eq!(command.kind, CommandType::Invoke);

        let args = InvokeArgs::from_args(&command.args).expect("invoke args should parse");
        assert_eq!(args.package, "math");
        assert_eq!(args.module, "calc");
        assert_eq!(args.method, "add");
        assert_eq!(args.params, vec![json!(2), json!(3)]);
    }

    #[test]
    fn unknown_type_is_not_an_error() {
        let raw = RawMessage {
            id: CommandId::from("x"),
            msg_type: "PING".to_string(),
            args: Value::String("not even json".to_string()),
        };
        assert!(Command::from_raw(raw).unwrap().is_none());
    }

    #[test]
    fn malformed_args_for_known_type_fail() {
        let raw = RawMessage {
            id: CommandId::from("x"),
            msg_type: "INVOKE".to_string(),
            args: Value::String("[\"math\"".to_string()),
        };
        assert!(matches!(
            Command::from_raw(raw),
            Err(ProtocolError::InvalidArgs(_))
        ));
    }

    #[test]
    fn structured_args_are_accepted() {
        let raw = RawMessage {
            id: CommandId::new(7),
            msg_type: "ADD_EVENT_LISTENER".to_string(),
            args: json!(["clock", "ticker", "tick"]),
        };
        let command = Command::from_raw(raw).unwrap().unwrap();
        let args = ListenerArgs::from_args(&command.args).unwrap();
        assert_eq!(args.event, "tick");
        assert_eq!(command.id.key(), "7");
    }

    #[test]
    fn missing_params_default_to_empty() {
        let args = InvokeArgs::from_args(&[json!("a"), json!("b"), json!("c")]).unwrap();
        assert!(args.params.is_empty());

        let args =
            InvokeArgs::from_args(&[json!("a"), json!("b"), json!("c"), Value::Null]).unwrap();
        assert!(args.params.is_empty());
    }

    #[test]
    fn argument_errors_name_the_position() {
        let err = ListenerArgs::from_args(&[json!("a"), json!("b")]).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::MissingArgument {
                position: 2,
                name: "event"
            }
        ));

        let err = InvokeArgs::from_args(&[json!("a"), json!(1), json!("c")]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "argument at position 1 (module) must be a string"
        );
    }

    #[test]
    fn with_kind_keeps_id_and_args() {
        let add = Command::new("l1", CommandType::AddEventListener, vec![json!("p")]);
        let remove = add.with_kind(CommandType::RemoveEventListener);
        assert_eq!(remove.id, add.id);
        assert_eq!(remove.args, add.args);
        assert_eq!(remove.kind, CommandType::RemoveEventListener);
    }

    #[test]
    fn raw_message_new_serializes_args() {
        let raw = RawMessage::new("c9", CommandType::Invoke, &[json!("p"), json!("m")]);
        assert_eq!(raw.msg_type, "INVOKE");
        assert_eq!(raw.args, Value::String("[\"p\",\"m\"]".to_string()));
    }
}
