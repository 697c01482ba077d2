//! Closure-backed [`Module`] implementation.

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{BridgeError, MethodError, Result};
use crate::event::{EventEmitter, EventHandler};
use crate::package::{MethodFuture, Module, ModuleInfo};

type SyncMethod = Arc<dyn Fn(Vec<Value>) -> std::result::Result<Value, MethodError> + Send + Sync>;
type AsyncMethod = Arc<dyn Fn(Vec<Value>) -> MethodFuture + Send + Sync>;

#[derive(Clone)]
enum MethodImpl {
    Sync(SyncMethod),
    Async(AsyncMethod),
}

/// A module assembled from named closures and an optional event source.
///
/// ```
/// use hybro_bridge::{FnModule, MethodError};
/// use serde_json::{json, Value};
///
/// let calc = FnModule::new().method("add", |params: Vec<Value>| {
///     let a = params.first().and_then(Value::as_f64).ok_or("a must be a number")?;
///     let b = params.get(1).and_then(Value::as_f64).ok_or("b must be a number")?;
///     Ok::<_, MethodError>(json!(a + b))
/// });
/// # let _ = calc;
/// ```
#[derive(Clone, Default)]
pub struct FnModule {
    methods: BTreeMap<String, MethodImpl>,
    emitter: Option<EventEmitter>,
    events: BTreeSet<String>,
}

impl FnModule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a synchronous method. It runs when the call is dispatched.
    pub fn method<F>(mut self, name: impl Into<String>, method: F) -> Self
    where
        F: Fn(Vec<Value>) -> std::result::Result<Value, MethodError> + Send + Sync + 'static,
    {
        self.methods
            .insert(name.into(), MethodImpl::Sync(Arc::new(method)));
        self
    }

    /// Register an asynchronous method.
    pub fn async_method<F, Fut>(mut self, name: impl Into<String>, method: F) -> Self
    where
        F: Fn(Vec<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<Value, MethodError>> + Send + 'static,
    {
        let boxed: AsyncMethod =
            Arc::new(move |params| -> MethodFuture { Box::pin(method(params)) });
        self.methods.insert(name.into(), MethodImpl::Async(boxed));
        self
    }

    /// Expose `events` from `emitter`. Other event names are rejected.
    pub fn with_events<I, S>(mut self, emitter: EventEmitter, events: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.emitter = Some(emitter);
        self.events.extend(events.into_iter().map(Into::into));
        self
    }

    fn emitter_for(&self, event: &str) -> Result<&EventEmitter> {
        let emitter = self
            .emitter
            .as_ref()
            .ok_or(BridgeError::EventsUnsupported)?;
        if !self.events.contains(event) {
            return Err(BridgeError::EventNotFound(event.to_string()));
        }
        Ok(emitter)
    }
}

impl Module for FnModule {
    fn call(&self, method: &str, params: Vec<Value>) -> Option<MethodFuture> {
        let future: MethodFuture = match self.methods.get(method)? {
            MethodImpl::Sync(method) => Box::pin(std::future::ready(method(params))),
            MethodImpl::Async(method) => method(params),
        };
        Some(future)
    }

    fn add_event_listener(&self, event: &str, handler: EventHandler) -> Result<Value> {
        let count = self.emitter_for(event)?.add(event, handler);
        Ok(Value::from(count))
    }

    fn remove_event_listener(&self, event: &str, handler: Option<&EventHandler>) -> Result<Value> {
        let removed = self.emitter_for(event)?.remove(event, handler);
        Ok(Value::Bool(removed))
    }

    fn describe(&self) -> ModuleInfo {
        ModuleInfo {
            methods: self.methods.keys().cloned().collect(),
            events: self.events.iter().cloned().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use super::*;

    fn calc() -> FnModule {
        FnModule::new()
            .method("add", |params| {
                let sum: i64 = params.iter().filter_map(Value::as_i64).sum();
                Ok(json!(sum))
            })
            .async_method("fail", |_params| async { Err::<Value, _>(MethodError::new("nope")) })
    }

    #[tokio::test]
    async fn sync_and_async_methods_are_awaited_alike() {
        let module = calc();

        let sum = module
            .call("add", vec![json!(2), json!(3)])
            .expect("add exists")
            .await
            .expect("add succeeds");
        assert_eq!(sum, json!(5));

        let err = module
            .call("fail", Vec::new())
            .expect("fail exists")
            .await
            .expect_err("fail fails");
        assert_eq!(err.message(), "nope");

        assert!(module.call("missing", Vec::new()).is_none());
    }

    #[test]
    fn events_require_declaration() {
        let emitter = EventEmitter::new();
        let module = FnModule::new().with_events(emitter.clone(), ["tick"]);

        let hits = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&hits);
        let handler = EventHandler::new(move |_| {
            seen.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(
            module.add_event_listener("tick", handler.clone()).unwrap(),
            json!(1)
        );
        assert!(matches!(
            module.add_event_listener("tock", handler.clone()),
            Err(BridgeError::EventNotFound(name)) if name == "tock"
        ));

        emitter.emit("tick", json!({ "n": 1 }));
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        assert_eq!(
            module.remove_event_listener("tick", Some(&handler)).unwrap(),
            json!(true)
        );
        assert_eq!(
            module.remove_event_listener("tick", None).unwrap(),
            json!(false)
        );
    }

    #[test]
    fn module_without_emitter_rejects_events() {
        let err = calc()
            .add_event_listener("tick", EventHandler::new(|_| {}))
            .unwrap_err();
        assert!(matches!(err, BridgeError::EventsUnsupported));
    }

    #[test]
    fn describe_lists_names() {
        let info = calc().with_events(EventEmitter::new(), ["b", "a"]).describe();
        assert_eq!(info.methods, vec!["add".to_string(), "fail".to_string()]);
        assert_eq!(info.events, vec!["a".to_string(), "b".to_string()]);
    }
}
