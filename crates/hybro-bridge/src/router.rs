use hybro_protocol::{Command, CommandType, RawMessage};

use crate::bridge::Bridge;
use crate::error::BridgeError;

impl Bridge {
    /// Decode and dispatch one incoming message.
    ///
    /// Unknown command types are ignored so newer guests do not break older
    /// hosts. Malformed arguments for a known type produce an `ERROR` result.
    pub fn handle_message(&self, message: RawMessage) {
        let command_id = message.id.clone();
        let msg_type = message.msg_type.clone();

        match Command::from_raw(message) {
            Ok(Some(command)) => self.dispatch(command),
            Ok(None) => {
                tracing::debug!(
                    command_id = %command_id,
                    msg_type = %msg_type,
                    "ignoring unknown command type"
                );
            }
            Err(err) => {
                tracing::warn!(
                    command_id = %command_id,
                    msg_type = %msg_type,
                    error = %err,
                    "malformed command"
                );
                self.inner
                    .transport
                    .send_error(&command_id, &BridgeError::from(err));
            }
        }
    }

    /// Route a decoded command to its handler.
    pub fn dispatch(&self, command: Command) {
        tracing::trace!(
            command_id = %command.id,
            kind = command.kind.as_tag(),
            "dispatching command"
        );
        match command.kind {
            CommandType::Invoke => self.invoke(command),
            CommandType::AddEventListener => self.add_listener(command),
            CommandType::RemoveEventListener => self.remove_listener(&command),
        }
    }
}
