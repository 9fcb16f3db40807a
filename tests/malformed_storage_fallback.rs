use serde_json::json;
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let p = std::env::temp_dir().join(format!(
        "{}-{}",
        prefix,
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("clock")
            .as_nanos()
    ));
    std::fs::create_dir_all(&p).expect("create temp dir");
    p
}

fn spawn_sidecar() -> (Child, ChildStdin, BufReader<ChildStdout>) {
    let exe = env!("CARGO_BIN_EXE_reportcardd");
    let mut child = Command::new(exe)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .expect("spawn reportcardd");
    let stdin = child.stdin.take().expect("child stdin");
    let stdout = child.stdout.take().expect("child stdout");
    (child, stdin, BufReader::new(stdout))
}

fn request(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let payload = json!({
        "id": id,
        "method": method,
        "params": params,
    });
    writeln!(stdin, "{}", payload).expect("write request");
    stdin.flush().expect("flush request");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("id").and_then(|v| v.as_str()), Some(id));
    value
}

fn request_ok(
    stdin: &mut ChildStdin,
    reader: &mut BufReader<ChildStdout>,
    id: &str,
    method: &str,
    params: serde_json::Value,
) -> serde_json::Value {
    let value = request(stdin, reader, id, method, params);
    assert!(
        value.get("ok").and_then(|v| v.as_bool()).unwrap_or(false),
        "{} failed: {}",
        method,
        value
    );
    value.get("result").cloned().unwrap_or_else(|| json!({}))
}

/// Seeds the workspace database directly, planting values the daemon's
/// decoders will refuse.
fn plant_corrupt_values(workspace: &PathBuf) {
    let conn = rusqlite::Connection::open(workspace.join("reportcard.sqlite3"))
        .expect("open workspace db");
    conn.execute(
        "CREATE TABLE IF NOT EXISTS kv(
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        [],
    )
    .expect("create kv table");
    conn.execute(
        "INSERT INTO kv(key, value) VALUES(?, ?)",
        ("draft/P3", "{this is not json"),
    )
    .expect("plant corrupt draft");
    conn.execute(
        "INSERT INTO kv(key, value) VALUES(?, ?)",
        ("reports/P3", "[{\"id\": 42, \"shape\": \"wrong\"}]"),
    )
    .expect("plant corrupt archive list");
}

#[test]
fn corrupt_stored_state_is_treated_as_absent() {
    let workspace = temp_dir("reportcard-corrupt-store");
    plant_corrupt_values(&workspace);

    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "session.open",
        json!({ "classId": "P3" }),
    );

    // The corrupt draft never surfaces; startup falls through to blank.
    let resolved = request_ok(&mut stdin, &mut reader, "3", "report.resolve", json!({}));
    assert_eq!(resolved.get("source").and_then(|v| v.as_str()), Some("blank"));

    // Same for the archive list.
    let listed = request_ok(&mut stdin, &mut reader, "4", "archive.list", json!({}));
    assert_eq!(
        listed.get("reports").and_then(|v| v.as_array()).map(|a| a.len()),
        Some(0)
    );

    // The store stays usable: a commit rebuilds the list from scratch.
    let committed = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "report.commit",
        json!({ "record": { "bio": { "name": "Recovered Kid" } } }),
    );
    assert!(committed.get("id").and_then(|v| v.as_str()).is_some());

    let listed = request_ok(&mut stdin, &mut reader, "6", "archive.list", json!({}));
    assert_eq!(
        listed.get("reports").and_then(|v| v.as_array()).map(|a| a.len()),
        Some(1)
    );

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn unparseable_request_line_gets_a_bad_json_reply() {
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    writeln!(stdin, "this is not a request").expect("write garbage line");
    stdin.flush().expect("flush");

    let mut line = String::new();
    reader.read_line(&mut line).expect("read response line");
    let value: serde_json::Value = serde_json::from_str(line.trim()).expect("parse response json");
    assert_eq!(value.get("ok").and_then(|v| v.as_bool()), Some(false));
    assert_eq!(
        value.pointer("/error/code").and_then(|v| v.as_str()),
        Some("bad_json")
    );

    // The loop survives the garbage and keeps answering.
    let health = request(&mut stdin, &mut reader, "1", "health", json!({}));
    assert_eq!(health.get("ok").and_then(|v| v.as_bool()), Some(true));
}
