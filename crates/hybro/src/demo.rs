//! Built-in packages exposed by `hybro serve`.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use hybro_bridge::{EventEmitter, FnModule, MethodError, Package, PackageTree};
use serde_json::{json, Value};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Event emitted by `clock.ticker`.
pub const TICK: &str = "tick";

/// Upper bound on `demo.echo.repeat` output, in characters.
const MAX_REPEAT_LEN: usize = 16 * 1024 * 1024;

pub struct Demo {
    pub packages: PackageTree,
    pub ticker: EventEmitter,
}

pub fn demo() -> Demo {
    let ticker = EventEmitter::new();
    let packages = PackageTree::new()
        .package("math", Package::new().module("calc", calc()))
        .package("demo", Package::new().module("echo", echo()))
        .package(
            "clock",
            Package::new().module(
                "ticker",
                FnModule::new()
                    .method("now", |_| Ok(json!(unix_millis())))
                    .with_events(ticker.clone(), [TICK]),
            ),
        );
    Demo { packages, ticker }
}

fn calc() -> FnModule {
    FnModule::new()
        .method("add", |params| {
            let (a, b) = operands(&params)?;
            Ok(arith(a, b, i64::checked_add, |x, y| x + y))
        })
        .method("multiply", |params| {
            let (a, b) = operands(&params)?;
            Ok(arith(a, b, i64::checked_mul, |x, y| x * y))
        })
        .method("divide", |params| {
            let (a, b) = operands(&params)?;
            if b.as_f64() == Some(0.0) {
                return Err(MethodError::new("division by zero"));
            }
            let exact = |x: i64, y: i64| x.checked_rem(y).filter(|r| *r == 0).and(x.checked_div(y));
            Ok(arith(a, b, exact, |x, y| x / y))
        })
        .async_method("delay", |params| async move {
            let Some(millis) = params.first().and_then(Value::as_u64) else {
                return Err(MethodError::new("delay expects milliseconds as first argument"));
            };
            tokio::time::sleep(Duration::from_millis(millis)).await;
            Ok::<_, MethodError>(params.get(1).cloned().unwrap_or_else(|| json!(millis)))
        })
}

fn echo() -> FnModule {
    FnModule::new()
        .method("echo", |params| Ok(params.into_iter().next().unwrap_or(Value::Null)))
        .method("repeat", |params| {
            let text = params
                .first()
                .and_then(Value::as_str)
                .ok_or("repeat expects a string as first argument")?;
            let count = params
                .get(1)
                .and_then(Value::as_u64)
                .ok_or("repeat expects a count as second argument")?;
            let len = usize::try_from(count)
                .ok()
                .and_then(|count| count.checked_mul(text.chars().count()))
                .filter(|len| *len <= MAX_REPEAT_LEN)
                .ok_or_else(|| {
                    MethodError::new(format!("result exceeds {MAX_REPEAT_LEN} characters"))
                })?;
            let mut out = String::with_capacity(len);
            for _ in 0..count {
                out.push_str(text);
            }
            Ok(Value::String(out))
        })
}

fn operands(params: &[Value]) -> Result<(&Value, &Value), MethodError> {
    match params {
        [a, b, ..] if a.is_number() && b.is_number() => Ok((a, b)),
        _ => Err(MethodError::new("expected two numeric arguments")),
    }
}

/// Integer arithmetic when both operands are integers and the result fits,
/// float arithmetic otherwise.
fn arith(
    a: &Value,
    b: &Value,
    int_op: impl Fn(i64, i64) -> Option<i64>,
    float_op: impl Fn(f64, f64) -> f64,
) -> Value {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        if let Some(result) = int_op(x, y) {
            return json!(result);
        }
    }
    let x = a.as_f64().unwrap_or(f64::NAN);
    let y = b.as_f64().unwrap_or(f64::NAN);
    json!(float_op(x, y))
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}

/// Emit `tick` on `ticker` every `interval` until `shutdown` fires.
pub fn spawn_ticker(
    ticker: EventEmitter,
    interval: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval);
        timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // The first tick completes immediately.
        timer.tick().await;

        let mut seq = 0u64;
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = timer.tick() => {
                    seq += 1;
                    let payload = json!({ "seq": seq, "unixMillis": unix_millis() });
                    let delivered = ticker.emit(TICK, payload);
                    tracing::trace!(seq, delivered, "tick");
                }
            }
        }
        tracing::debug!(ticks = seq, "ticker stopped");
    })
}

#[cfg(test)]
mod tests {
    use hybro_bridge::{EventHandler, Module};

    use super::*;

    async fn call(
        package: &str,
        module: &str,
        method: &str,
        params: Value,
    ) -> Result<Value, MethodError> {
        let demo = demo();
        let module = demo
            .packages
            .resolve(package, module)
            .expect("demo module should resolve");
        let params = match params {
            Value::Array(items) => items,
            other => vec![other],
        };
        module
            .call(method, params)
            .expect("demo method should exist")
            .await
    }

    #[tokio::test]
    async fn calc_keeps_integers_integral() {
        assert_eq!(call("math", "calc", "add", json!([2, 3])).await, Ok(json!(5)));
        assert_eq!(call("math", "calc", "multiply", json!([4, 2.5])).await, Ok(json!(10.0)));
        assert_eq!(call("math", "calc", "divide", json!([9, 3])).await, Ok(json!(3)));
        assert_eq!(call("math", "calc", "divide", json!([1, 4])).await, Ok(json!(0.25)));
    }

    #[tokio::test]
    async fn calc_reports_bad_input() {
        assert_eq!(
            call("math", "calc", "divide", json!([1, 0])).await,
            Err(MethodError::new("division by zero"))
        );
        assert_eq!(
            call("math", "calc", "add", json!(["1", 2])).await,
            Err(MethodError::new("expected two numeric arguments"))
        );
    }

    #[tokio::test]
    async fn delay_returns_payload_after_sleeping() {
        assert_eq!(call("math", "calc", "delay", json!([5, "done"])).await, Ok(json!("done")));
        assert_eq!(call("math", "calc", "delay", json!([1])).await, Ok(json!(1)));
    }

    #[tokio::test]
    async fn repeat_builds_large_strings() {
        let value = call("demo", "echo", "repeat", json!(["ab", 3])).await;
        assert_eq!(value, Ok(json!("ababab")));

        let err = call("demo", "echo", "repeat", json!(["ab", u64::MAX])).await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn ticker_emits_until_cancelled() {
        let demo = demo();
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        demo.ticker.add(
            TICK,
            EventHandler::new(move |payload| {
                let _ = tx.send(payload);
            }),
        );

        let shutdown = CancellationToken::new();
        let task = spawn_ticker(demo.ticker.clone(), Duration::from_millis(5), shutdown.clone());

        let first = rx.recv().await.expect("first tick");
        let second = rx.recv().await.expect("second tick");
        assert_eq!(first["seq"], 1);
        assert_eq!(second["seq"], 2);

        shutdown.cancel();
        task.await.expect("ticker task should finish");
    }

    #[test]
    fn describes_demo_tree() {
        let modules = demo().packages.describe();
        let names: Vec<String> = modules
            .iter()
            .map(|module| format!("{}.{}", module.package, module.module))
            .collect();
        assert_eq!(names, ["clock.ticker", "demo.echo", "math.calc"]);
        assert_eq!(modules[0].events, ["tick"]);
    }
}
