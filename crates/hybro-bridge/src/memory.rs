//! In-process [`Channel`] implementation.
//!
//! Delivery is synchronous and ordered. Sent payloads are captured so callers
//! can inspect exactly what reached the guest side.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use hybro_protocol::{OutgoingResult, RawMessage, MESSAGE_CATEGORY};
use serde_json::Value;
use tokio::sync::Notify;

use crate::channel::{Channel, MessageChannel, MessageListener};
use crate::error::ChannelError;

#[derive(Default)]
struct Messages {
    listeners: Mutex<Vec<(String, MessageListener)>>,
}

impl MessageChannel for Messages {
    fn add_listener(&self, category: &str, listener: MessageListener) {
        lock(&self.listeners).push((category.to_string(), listener));
    }

    fn remove_listener(&self, category: &str, listener: &MessageListener) {
        lock(&self.listeners).retain(|(existing_category, existing)| {
            existing_category != category || existing != listener
        });
    }
}

struct Inner {
    messages: Mutex<Option<Arc<Messages>>>,
    sent: Mutex<Vec<Value>>,
    sent_notify: Notify,
}

/// Reliable, ordered, in-process channel.
#[derive(Clone)]
pub struct MemoryChannel {
    inner: Arc<Inner>,
}

impl MemoryChannel {
    /// A channel with a live message sub-channel.
    pub fn new() -> Self {
        Self::build(Some(Arc::new(Messages::default())))
    }

    /// A channel whose view never exposed a message sub-channel.
    pub fn without_messages() -> Self {
        Self::build(None)
    }

    fn build(messages: Option<Arc<Messages>>) -> Self {
        Self {
            inner: Arc::new(Inner {
                messages: Mutex::new(messages),
                sent: Mutex::new(Vec::new()),
                sent_notify: Notify::new(),
            }),
        }
    }

    /// Deliver `message` to every listener of `category`.
    ///
    /// Returns the number of listeners reached.
    pub fn deliver_on(&self, category: &str, message: RawMessage) -> usize {
        let Some(messages) = lock(&self.inner.messages).clone() else {
            return 0;
        };
        let targets: Vec<MessageListener> = lock(&messages.listeners)
            .iter()
            .filter(|(existing, _)| existing == category)
            .map(|(_, listener)| listener.clone())
            .collect();

        for listener in &targets {
            listener.call(message.clone());
        }
        targets.len()
    }

    /// Deliver on the default `json` category.
    pub fn deliver(&self, message: RawMessage) -> usize {
        self.deliver_on(MESSAGE_CATEGORY, message)
    }

    /// Number of listeners registered for `category`.
    pub fn listener_count(&self, category: &str) -> usize {
        lock(&self.inner.messages).as_ref().map_or(0, |messages| {
            lock(&messages.listeners)
                .iter()
                .filter(|(existing, _)| existing == category)
                .count()
        })
    }

    /// Drop the message sub-channel, as when the view goes away.
    pub fn close(&self) {
        lock(&self.inner.messages).take();
    }

    /// Every payload sent so far.
    pub fn sent(&self) -> Vec<Value> {
        lock(&self.inner.sent).clone()
    }

    /// Drain captured payloads.
    pub fn take_sent(&self) -> Vec<Value> {
        std::mem::take(&mut *lock(&self.inner.sent))
    }

    /// Captured payloads decoded as result chunks. Others are skipped.
    pub fn sent_results(&self) -> Vec<OutgoingResult> {
        self.sent()
            .into_iter()
            .filter_map(|value| serde_json::from_value(value).ok())
            .collect()
    }

    /// Wait until at least `count` payloads have been sent.
    ///
    /// Returns `false` if `timeout` elapses first.
    pub async fn wait_for_sent(&self, count: usize, timeout: Duration) -> bool {
        let wait = async {
            loop {
                let notified = self.inner.sent_notify.notified();
                if lock(&self.inner.sent).len() >= count {
                    return;
                }
                notified.await;
            }
        };
        tokio::time::timeout(timeout, wait).await.is_ok()
    }
}

impl Default for MemoryChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl Channel for MemoryChannel {
    fn message_channel(&self) -> Option<Arc<dyn MessageChannel>> {
        lock(&self.inner.messages)
            .clone()
            .map(|messages| messages as Arc<dyn MessageChannel>)
    }

    fn send(&self, message: Value) -> Result<(), ChannelError> {
        if lock(&self.inner.messages).is_none() {
            return Err(ChannelError::Closed);
        }
        lock(&self.inner.sent).push(message);
        self.inner.sent_notify.notify_waiters();
        Ok(())
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
