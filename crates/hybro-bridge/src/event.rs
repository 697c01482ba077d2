//! Event callbacks and a reusable event source.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;

static NEXT_HANDLER_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of an [`EventHandler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(u64);

/// Host-side callback registered with an event source.
///
/// Clones share identity, so a source can find the handler it was given when
/// asked to remove it.
#[derive(Clone)]
pub struct EventHandler {
    id: HandlerId,
    callback: Arc<dyn Fn(Value) + Send + Sync>,
}

impl EventHandler {
    pub fn new(callback: impl Fn(Value) + Send + Sync + 'static) -> Self {
        Self {
            id: HandlerId(NEXT_HANDLER_ID.fetch_add(1, Ordering::Relaxed)),
            callback: Arc::new(callback),
        }
    }

    pub fn id(&self) -> HandlerId {
        self.id
    }

    /// Deliver one event payload.
    pub fn call(&self, payload: Value) {
        (self.callback)(payload);
    }
}

impl PartialEq for EventHandler {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for EventHandler {}

impl fmt::Debug for EventHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHandler").field("id", &self.id).finish()
    }
}

/// Event source keyed by event name.
///
/// Cloning yields another handle to the same handler table, so a module can
/// hand one clone to a background task that emits.
#[derive(Clone, Default)]
pub struct EventEmitter {
    handlers: Arc<Mutex<BTreeMap<String, Vec<EventHandler>>>>,
}

impl EventEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `handler` to `event`. Returns the event's handler count.
    pub fn add(&self, event: &str, handler: EventHandler) -> usize {
        let mut handlers = self.lock();
        let list = handlers.entry(event.to_string()).or_default();
        list.push(handler);
        list.len()
    }

    /// Unsubscribe `handler` from `event`.
    ///
    /// An absent or unknown handler is tolerated and reported as `false`.
    pub fn remove(&self, event: &str, handler: Option<&EventHandler>) -> bool {
        let Some(handler) = handler else {
            return false;
        };

        let mut handlers = self.lock();
        let Some(list) = handlers.get_mut(event) else {
            return false;
        };

        let before = list.len();
        list.retain(|existing| existing != handler);
        let removed = list.len() != before;
        if list.is_empty() {
            handlers.remove(event);
        }
        removed
    }

    /// Fire `event` on every subscribed handler. Returns the number notified.
    pub fn emit(&self, event: &str, payload: Value) -> usize {
        // Handlers run without the table lock so they may re-enter the emitter.
        let targets = self.lock().get(event).cloned().unwrap_or_default();
        for handler in &targets {
            handler.call(payload.clone());
        }
        targets.len()
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.lock().get(event).map_or(0, Vec::len)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, Vec<EventHandler>>> {
        self.handlers.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let handlers = self.lock();
        let counts: BTreeMap<&str, usize> = handlers
            .iter()
            .map(|(event, list)| (event.as_str(), list.len()))
            .collect();
        f.debug_struct("EventEmitter")
            .field("handlers", &counts)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use serde_json::json;

    use super::*;

    fn counting_handler() -> (EventHandler, Arc<AtomicUsize>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&hits);
        let handler = EventHandler::new(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });
        (handler, hits)
    }

    #[test]
    fn clones_share_identity() {
        let (handler, _) = counting_handler();
        let (other, _) = counting_handler();
        assert_eq!(handler.clone(), handler);
        assert_ne!(handler, other);
    }

    #[test]
    fn emit_reaches_subscribed_handlers_only() {
        let emitter = EventEmitter::new();
        let (tick, tick_hits) = counting_handler();
        let (tock, tock_hits) = counting_handler();

        emitter.add("tick", tick);
        emitter.add("tock", tock);

        assert_eq!(emitter.emit("tick", json!(1)), 1);
        assert_eq!(emitter.emit("tick", json!(2)), 1);
        assert_eq!(tick_hits.load(Ordering::SeqCst), 2);
        assert_eq!(tock_hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn remove_stops_delivery() {
        let emitter = EventEmitter::new();
        let (handler, hits) = counting_handler();

        emitter.add("tick", handler.clone());
        assert!(emitter.remove("tick", Some(&handler)));
        assert_eq!(emitter.listener_count("tick"), 0);

        assert_eq!(emitter.emit("tick", Value::Null), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn remove_tolerates_absent_or_unknown_handler() {
        let emitter = EventEmitter::new();
        let (handler, _) = counting_handler();

        assert!(!emitter.remove("tick", None));
        assert!(!emitter.remove("tick", Some(&handler)));

        emitter.add("tick", handler);
        let (stranger, _) = counting_handler();
        assert!(!emitter.remove("tick", Some(&stranger)));
        assert_eq!(emitter.listener_count("tick"), 1);
    }
}
