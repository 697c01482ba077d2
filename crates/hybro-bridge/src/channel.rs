//! Interfaces the bridge consumes from the host/guest transport.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use hybro_protocol::RawMessage;
use serde_json::Value;

use crate::error::ChannelError;

static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

/// Callback registered on a [`MessageChannel`].
///
/// Compared by identity so the same listener can be unregistered later.
#[derive(Clone)]
pub struct MessageListener {
    id: u64,
    callback: Arc<dyn Fn(RawMessage) + Send + Sync>,
}

impl MessageListener {
    pub fn new(callback: impl Fn(RawMessage) + Send + Sync + 'static) -> Self {
        Self {
            id: NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed),
            callback: Arc::new(callback),
        }
    }

    /// Deliver one incoming message.
    pub fn call(&self, message: RawMessage) {
        (self.callback)(message);
    }
}

impl PartialEq for MessageListener {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for MessageListener {}

impl fmt::Debug for MessageListener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MessageListener")
            .field("id", &self.id)
            .finish()
    }
}

/// Registerable sub-channel delivering structured guest messages.
///
/// Implementations deliver messages one at a time, in arrival order.
pub trait MessageChannel: Send + Sync {
    fn add_listener(&self, category: &str, listener: MessageListener);
    fn remove_listener(&self, category: &str, listener: &MessageListener);
}

/// Bidirectional transport between host and guest view.
pub trait Channel: Send + Sync {
    /// The live message sub-channel, or `None` once the view is gone.
    fn message_channel(&self) -> Option<Arc<dyn MessageChannel>>;

    /// Send one structured payload to the guest.
    fn send(&self, message: Value) -> Result<(), ChannelError>;
}
