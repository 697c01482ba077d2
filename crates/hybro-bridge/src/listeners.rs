use std::sync::Arc;

use hybro_protocol::{Command, CommandId, ListenerArgs, ResultType};
use serde_json::Value;

use crate::bridge::Bridge;
use crate::error::{BridgeError, Result};
use crate::event::EventHandler;
use crate::registry::ListenerKey;

impl Bridge {
    /// Subscribe the guest to an event for an `ADD_EVENT_LISTENER` command.
    pub(crate) fn add_listener(&self, command: Command) {
        match self.try_add_listener(&command) {
            Ok(value) => {
                self.inner
                    .transport
                    .send(&command.id, ResultType::Success, &value);
            }
            Err(err) => {
                tracing::debug!(command_id = %command.id, error = %err, "add listener failed");
                self.inner.transport.send_error(&command.id, &err);
            }
        }
    }

    /// Unsubscribe for a `REMOVE_EVENT_LISTENER` command.
    pub(crate) fn remove_listener(&self, command: &Command) {
        match self.try_remove_listener(command) {
            Ok(value) => {
                self.inner
                    .transport
                    .send(&command.id, ResultType::Success, &value);
            }
            Err(err) => {
                tracing::debug!(command_id = %command.id, error = %err, "remove listener failed");
                self.inner.transport.send_error(&command.id, &err);
            }
        }
    }

    fn try_add_listener(&self, command: &Command) -> Result<Value> {
        let target = ListenerArgs::from_args(&command.args)?;
        let module = self
            .inner
            .packages
            .resolve(&target.package, &target.module)?;
        let key = ListenerKey::new(&target, &command.id);

        if self.inner.registry().contains(&key) {
            return Err(BridgeError::ListenerExists(key.to_string()));
        }

        // Subscribe without the registry lock held. Sources may emit
        // synchronously and the channel may re-enter the bridge.
        let handler = self.event_handler(command.id.clone());
        let value = module.add_event_listener(&target.event, handler.clone())?;

        {
            let mut registry = self.inner.registry();
            if !registry.contains(&key) {
                tracing::debug!(command_id = %command.id, listener = %key, "listener added");
                registry.insert(key, target, handler, command.clone());
                return Ok(value);
            }
        }

        tracing::warn!(
            listener = %key,
            "listener registered concurrently, unsubscribing duplicate"
        );
        if let Err(err) = module.remove_event_listener(&target.event, Some(&handler)) {
            tracing::warn!(listener = %key, error = %err, "failed to unsubscribe duplicate");
        }
        Err(BridgeError::ListenerExists(key.to_string()))
    }

    fn try_remove_listener(&self, command: &Command) -> Result<Value> {
        let target = ListenerArgs::from_args(&command.args)?;
        let key = ListenerKey::new(&target, &command.id);

        let handler = {
            let mut registry = self.inner.registry();
            registry.forget_target(&target);
            registry.take_handler(&key)
        };

        if handler.is_none() {
            tracing::warn!(
                command_id = %command.id,
                listener = %key,
                "no callback registered, passing absent handler to event source"
            );
        }

        let module = self
            .inner
            .packages
            .resolve(&target.package, &target.module)?;
        let value = module.remove_event_listener(&target.event, handler.as_ref())?;

        tracing::debug!(command_id = %command.id, listener = %key, "listener removed");
        Ok(value)
    }

    /// Callback forwarding each event payload to the guest, correlated to
    /// the adding command.
    fn event_handler(&self, command_id: CommandId) -> EventHandler {
        let weak = Arc::downgrade(&self.inner);
        EventHandler::new(move |payload| {
            if let Some(inner) = weak.upgrade() {
                inner
                    .transport
                    .send(&command_id, ResultType::Event, &payload);
            }
        })
    }
}
