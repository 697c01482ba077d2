#![cfg(feature = "cli")]

use std::io::Write;
use std::process::{Command, Output, Stdio};
use std::thread;
use std::time::Duration;

use serde_json::{json, Value};

fn command_line(id: &str, kind: &str, args: Value) -> String {
    let message = json!({ "id": id, "type": kind, "args": args.to_string() });
    format!("{message}\n")
}

/// Run `hybro serve`, feed `input`, keep stdin open for `hold`, then close it.
fn serve_session(extra_args: &[&str], input: &str, hold: Duration) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_hybro"))
        .args(["--log-level", "error", "serve"])
        .args(extra_args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("serve command should start");

    {
        let mut stdin = child.stdin.take().expect("stdin should be piped");
        stdin
            .write_all(input.as_bytes())
            .expect("input should be writable");
        stdin.flush().expect("input should flush");
        thread::sleep(hold);
    }

    child.wait_with_output().expect("serve should exit")
}

fn result_lines(output: &Output) -> Vec<Value> {
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|line| serde_json::from_str(line).expect("stdout line should be json"))
        .collect()
}

#[test]
fn serve_answers_invocations_on_stdout() {
    let input = [
        command_line("c1", "INVOKE", json!(["math", "calc", "add", [2, 3]])),
        command_line("c2", "INVOKE", json!(["math", "calc", "missingMethod", []])),
        command_line("c3", "INVOKE", json!(["math", "calc", "divide", [1, 0]])),
    ]
    .concat();

    let output = serve_session(&[], &input, Duration::ZERO);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let results = result_lines(&output);
    assert_eq!(results.len(), 3);

    let by_id = |id: &str| {
        results
            .iter()
            .find(|result| result["commandId"] == id)
            .unwrap_or_else(|| panic!("missing result for {id}"))
    };

    assert_eq!(by_id("c1")["type"], "SUCCESS");
    assert_eq!(by_id("c1")["result"], "5");
    assert_eq!(by_id("c1")["parts"], 1);
    assert_eq!(by_id("c1")["index"], 0);

    assert_eq!(by_id("c2")["type"], "ERROR");
    let c2_text = by_id("c2")["result"].as_str().expect("result is text");
    let message: Value = serde_json::from_str(c2_text).expect("error payload is json");
    assert_eq!(message["message"], "method 'missingMethod' not found in math.calc");

    assert_eq!(by_id("c3")["type"], "ERROR");
    assert!(by_id("c3")["result"]
        .as_str()
        .expect("result is text")
        .contains("division by zero"));
}

#[test]
fn serve_chunks_large_results() {
    let input = command_line("big", "INVOKE", json!(["demo", "echo", "repeat", ["xy", 100]]));

    let output = serve_session(&["--chunk-size", "50"], &input, Duration::ZERO);
    assert!(output.status.success());

    let chunks = result_lines(&output);
    // 200 characters plus quotes.
    assert_eq!(chunks.len(), 5);
    let group = chunks[0]["id"].clone();
    let mut text = String::new();
    for (index, chunk) in chunks.iter().enumerate() {
        assert_eq!(chunk["id"], group);
        assert_eq!(chunk["index"], index);
        assert_eq!(chunk["parts"], 5);
        text.push_str(chunk["result"].as_str().expect("chunk is text"));
    }
    assert_eq!(text, format!("\"{}\"", "xy".repeat(100)));
}

#[test]
fn serve_streams_events_and_removes_listener_on_eof() {
    let input = command_line("l1", "ADD_EVENT_LISTENER", json!(["clock", "ticker", "tick"]));

    let output = serve_session(
        &["--tick-interval", "20ms"],
        &input,
        Duration::from_millis(200),
    );
    assert!(output.status.success());

    let results = result_lines(&output);
    assert!(results.iter().all(|result| result["commandId"] == "l1"));
    assert_eq!(results.first().map(|r| r["type"].clone()), Some(json!("SUCCESS")));
    assert!(results.iter().any(|result| result["type"] == "EVENT"));

    let last = results.last().expect("removal result");
    assert_eq!(last["type"], "SUCCESS");
    assert_eq!(last["result"], "true");
}

#[test]
fn serve_rejects_bad_duration() {
    let output = Command::new(env!("CARGO_BIN_EXE_hybro"))
        .args(["serve", "--invoke-timeout", "whenever"])
        .stdin(Stdio::null())
        .output()
        .expect("serve should run");

    assert_eq!(output.status.code(), Some(64));
    assert!(String::from_utf8_lossy(&output.stderr).contains("invalid duration value"));
}

#[test]
fn packages_lists_demo_tree_as_json() {
    let output = Command::new(env!("CARGO_BIN_EXE_hybro"))
        .args(["--format", "json", "packages"])
        .output()
        .expect("packages should run");

    assert!(output.status.success());
    let value: Value = serde_json::from_slice(&output.stdout).expect("packages output is json");
    let modules = value["modules"].as_array().expect("modules array");
    assert!(modules
        .iter()
        .any(|module| module["package"] == "math" && module["module"] == "calc"));
    assert!(modules
        .iter()
        .any(|module| module["events"] == json!(["tick"])));
}

#[test]
fn version_prints_package_version() {
    let output = Command::new(env!("CARGO_BIN_EXE_hybro"))
        .arg("version")
        .output()
        .expect("version should run");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim(), format!("hybro {}", env!("CARGO_PKG_VERSION")));
}
