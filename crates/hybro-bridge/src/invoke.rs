use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures_util::FutureExt;
use hybro_protocol::{Command, CommandId, InvokeArgs, ResultType};
use serde_json::Value;

use crate::bridge::{Bridge, BridgeInner};
use crate::error::{BridgeError, MethodError, Result};
use crate::package::MethodFuture;

impl Bridge {
    /// Resolve and call the method named by an `INVOKE` command.
    ///
    /// Exactly one `SUCCESS` or `ERROR` result follows, unless the method
    /// never completes and no timeout is configured. Resolution failures and
    /// calls that complete on their first poll are answered before this
    /// returns; anything still pending runs on the current tokio runtime and
    /// may finish after later commands. A panicking method is reported as an
    /// `ERROR`.
    pub(crate) fn invoke(&self, command: Command) {
        let mut future = match self.resolve_method(&command) {
            Ok(future) => future,
            Err(err) => {
                report(&self.inner, &command.id, Err(err));
                return;
            }
        };

        if let Some(outcome) = poll_once(&mut future) {
            report(&self.inner, &command.id, outcome);
            return;
        }

        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                tracing::warn!(command_id = %command.id, "invocation outside a tokio runtime");
                report(&self.inner, &command.id, Err(BridgeError::NoRuntime));
                return;
            }
        };

        let pending = Pending::start(Arc::clone(&self.inner));
        runtime.spawn(async move {
            let inner = &pending.0;
            let outcome = await_outcome(future, inner.config.invoke_timeout).await;
            report(inner, &command.id, outcome);
        });
    }

    fn resolve_method(&self, command: &Command) -> Result<MethodFuture> {
        let InvokeArgs {
            package,
            module,
            method,
            params,
        } = InvokeArgs::from_args(&command.args)?;
        let target = self.inner.packages.resolve(&package, &module)?;

        tracing::debug!(
            command_id = %command.id,
            package = %package,
            module = %module,
            method = %method,
            "invoking"
        );

        // Sync methods run inside `call`.
        let started =
            std::panic::catch_unwind(AssertUnwindSafe(|| target.call(&method, params)));
        match started {
            Ok(Some(future)) => Ok(future),
            Ok(None) => Err(BridgeError::MethodNotFound {
                package,
                module,
                method,
            }),
            Err(panic) => Err(BridgeError::Panicked(panic_message(&*panic))),
        }
    }
}

fn report(inner: &BridgeInner, command_id: &CommandId, outcome: Result<Value>) {
    match outcome {
        Ok(value) => {
            inner.transport.send(command_id, ResultType::Success, &value);
        }
        Err(err) => {
            tracing::debug!(command_id = %command_id, error = %err, "invocation failed");
            inner.transport.send_error(command_id, &err);
        }
    }
}

/// Poll `future` once. `None` means it is still pending.
fn poll_once(future: &mut MethodFuture) -> Option<Result<Value>> {
    let polled = AssertUnwindSafe(future.as_mut())
        .catch_unwind()
        .now_or_never()?;
    Some(settle(polled))
}

type Caught = std::result::Result<std::result::Result<Value, MethodError>, Box<dyn Any + Send>>;

fn settle(caught: Caught) -> Result<Value> {
    match caught {
        Ok(outcome) => outcome.map_err(BridgeError::from),
        Err(panic) => Err(BridgeError::Panicked(panic_message(&*panic))),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        String::new()
    }
}

/// Counts one spawned invocation until dropped.
struct Pending(Arc<BridgeInner>);

impl Pending {
    fn start(inner: Arc<BridgeInner>) -> Self {
        inner.in_flight.send_modify(|count| *count += 1);
        Self(inner)
    }
}

impl Drop for Pending {
    fn drop(&mut self) {
        self.0
            .in_flight
            .send_modify(|count| *count = count.saturating_sub(1));
    }
}

async fn await_outcome(future: MethodFuture, limit: Option<Duration>) -> Result<Value> {
    let guarded = AssertUnwindSafe(future).catch_unwind();
    let caught = match limit {
        Some(limit) => tokio::time::timeout(limit, guarded)
            .await
            .map_err(|_| BridgeError::Timeout(limit))?,
        None => guarded.await,
    };
    settle(caught)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_message_reads_common_payloads() {
        assert_eq!(panic_message(&"boom"), "boom");
        assert_eq!(
            panic_message(&String::from("index out of bounds")),
            "index out of bounds"
        );
        assert_eq!(panic_message(&42u8), "");
    }

    #[test]
    fn poll_once_settles_ready_futures_only() {
        let mut ready: MethodFuture =
            Box::pin(std::future::ready(Ok::<_, MethodError>(Value::from(5))));
        assert_eq!(
            poll_once(&mut ready).map(|outcome| outcome.ok()),
            Some(Some(Value::from(5)))
        );

        let mut pending: MethodFuture =
            Box::pin(std::future::pending::<std::result::Result<Value, MethodError>>());
        assert!(poll_once(&mut pending).is_none());

        let mut panicking: MethodFuture = Box::pin(async {
            if Value::Null.is_null() {
                panic!("exploded");
            }
            Ok::<_, MethodError>(Value::Null)
        });
        match poll_once(&mut panicking) {
            Some(Err(BridgeError::Panicked(message))) => assert_eq!(message, "exploded"),
            other => panic!("expected panic outcome, got {other:?}"),
        }
    }
}
