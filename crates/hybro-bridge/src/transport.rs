//! Chunked delivery of results over the attached channel.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use hybro_protocol::{
    split_chunks, stringify, CommandId, ErrorPayload, OutgoingResult, ResultType,
};
use serde::Serialize;
use uuid::Uuid;

use crate::channel::Channel;
use crate::error::BridgeError;

/// Whether the bridge currently has a channel to send on.
#[derive(Clone, Default)]
pub enum LinkState {
    #[default]
    Detached,
    Attached(Arc<dyn Channel>),
}

impl fmt::Debug for LinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Detached => f.write_str("Detached"),
            Self::Attached(_) => f.write_str("Attached"),
        }
    }
}

/// Splits serialized results into size-bounded chunks and sends them.
#[derive(Debug)]
pub struct ResultTransport {
    link: Mutex<LinkState>,
    chunk_size: usize,
}

impl ResultTransport {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            link: Mutex::new(LinkState::Detached),
            chunk_size: chunk_size.max(1),
        }
    }

    /// Start sending on `channel`. Returns the previous state.
    pub fn attach(&self, channel: Arc<dyn Channel>) -> LinkState {
        std::mem::replace(&mut *self.lock(), LinkState::Attached(channel))
    }

    /// Stop sending. Returns the previous state.
    pub fn detach(&self) -> LinkState {
        std::mem::take(&mut *self.lock())
    }

    pub fn is_attached(&self) -> bool {
        matches!(*self.lock(), LinkState::Attached(_))
    }

    /// The attached channel, whether or not its sub-channel is live.
    pub fn channel(&self) -> Option<Arc<dyn Channel>> {
        match &*self.lock() {
            LinkState::Attached(channel) => Some(Arc::clone(channel)),
            LinkState::Detached => None,
        }
    }

    /// The attached channel, only while its message sub-channel is live.
    fn live_channel(&self) -> Option<Arc<dyn Channel>> {
        self.channel()
            .filter(|channel| channel.message_channel().is_some())
    }

    /// Send `result` for `command_id` as one or more chunks.
    ///
    /// Returns `false` when nothing (or not everything) reached the channel;
    /// the guest is not told, so the drop is only logged.
    pub fn send<T: Serialize + ?Sized>(
        &self,
        command_id: &CommandId,
        result_type: ResultType,
        result: &T,
    ) -> bool {
        let Some(channel) = self.live_channel() else {
            tracing::warn!(
                command_id = %command_id,
                result_type = result_type.as_tag(),
                "no live channel, dropping result"
            );
            return false;
        };

        let payload = match stringify(result) {
            Ok(payload) => payload,
            Err(err) if result_type != ResultType::Error => {
                tracing::warn!(
                    command_id = %command_id,
                    error = %err,
                    "result is not serializable"
                );
                return self.send(
                    command_id,
                    ResultType::Error,
                    &ErrorPayload::new(err.to_string()),
                );
            }
            Err(err) => {
                tracing::warn!(
                    command_id = %command_id,
                    error = %err,
                    "error payload is not serializable"
                );
                return false;
            }
        };

        let group_id = Uuid::new_v4().to_string();
        let chunks = split_chunks(&payload, self.chunk_size);
        let parts = chunks.len();

        for (index, chunk) in chunks.into_iter().enumerate() {
            let message = OutgoingResult {
                result_type,
                id: group_id.clone(),
                command_id: command_id.clone(),
                result: chunk.to_string(),
                parts,
                index,
            };

            let sent = serde_json::to_value(&message)
                .map_err(Into::into)
                .and_then(|value| channel.send(value));
            if let Err(err) = sent {
                tracing::warn!(
                    command_id = %command_id,
                    index,
                    parts,
                    error = %err,
                    "channel send failed, abandoning result"
                );
                return false;
            }
        }

        tracing::debug!(
            command_id = %command_id,
            result_type = result_type.as_tag(),
            parts,
            "result sent"
        );
        true
    }

    /// Send `err` as an `ERROR` result.
    pub fn send_error(&self, command_id: &CommandId, err: &BridgeError) -> bool {
        self.send(
            command_id,
            ResultType::Error,
            &ErrorPayload::new(err.to_string()),
        )
    }

    fn lock(&self) -> MutexGuard<'_, LinkState> {
        self.link.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
