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

#[test]
fn archived_id_beats_draft_and_forced_new_beats_both() {
    let workspace = temp_dir("reportcard-resolution");
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

    // Archive one report, then leave a different draft behind.
    let committed = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "report.commit",
        json!({ "record": { "bio": { "name": "Archived Kid" } } }),
    );
    let report_id = committed
        .get("id")
        .and_then(|v| v.as_str())
        .expect("id")
        .to_string();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "draft.schedule",
        json!({
            "record": { "bio": { "name": "Draft Kid" } },
            "debounceMs": 0
        }),
    );
    let _ = request_ok(&mut stdin, &mut reader, "5", "draft.flush", json!({}));

    // No params: draft wins over blank.
    let resolved = request_ok(&mut stdin, &mut reader, "6", "report.resolve", json!({}));
    assert_eq!(resolved.get("source").and_then(|v| v.as_str()), Some("draft"));
    assert_eq!(
        resolved.pointer("/record/bio/name").and_then(|v| v.as_str()),
        Some("Draft Kid")
    );

    // Explicit id wins over the draft.
    let resolved = request_ok(
        &mut stdin,
        &mut reader,
        "7",
        "report.resolve",
        json!({ "id": report_id }),
    );
    assert_eq!(
        resolved.get("source").and_then(|v| v.as_str()),
        Some("archive")
    );
    assert_eq!(
        resolved.get("sourceId").and_then(|v| v.as_str()),
        Some(report_id.as_str())
    );
    assert_eq!(
        resolved.pointer("/record/bio/name").and_then(|v| v.as_str()),
        Some("Archived Kid")
    );

    // An unknown id falls back to the draft, not an error.
    let resolved = request_ok(
        &mut stdin,
        &mut reader,
        "8",
        "report.resolve",
        json!({ "id": "no-such-report" }),
    );
    assert_eq!(resolved.get("source").and_then(|v| v.as_str()), Some("draft"));
    assert!(resolved.get("sourceId").map(|v| v.is_null()).unwrap_or(false));

    // new=true wins over both and discards the draft.
    let resolved = request_ok(
        &mut stdin,
        &mut reader,
        "9",
        "report.resolve",
        json!({ "new": "true", "id": report_id }),
    );
    assert_eq!(resolved.get("source").and_then(|v| v.as_str()), Some("new"));
    assert_eq!(resolved.get("clearedNew").and_then(|v| v.as_bool()), Some(true));
    assert_eq!(
        resolved.pointer("/record/bio/name").and_then(|v| v.as_str()),
        Some("")
    );

    // The draft is gone: a plain resolve is blank now.
    let resolved = request_ok(&mut stdin, &mut reader, "10", "report.resolve", json!({}));
    assert_eq!(resolved.get("source").and_then(|v| v.as_str()), Some("blank"));

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn forced_new_accepts_boolean_flag() {
    let workspace = temp_dir("reportcard-resolution-bool");
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

    let resolved = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "report.resolve",
        json!({ "new": true }),
    );
    assert_eq!(resolved.get("source").and_then(|v| v.as_str()), Some("new"));

    // Anything other than true / "true" is not a forced-new request.
    let resolved = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "report.resolve",
        json!({ "new": "false" }),
    );
    assert_eq!(resolved.get("source").and_then(|v| v.as_str()), Some("blank"));

    let _ = std::fs::remove_dir_all(workspace);
}

#[test]
fn resolve_without_session_is_a_blank_noop() {
    let workspace = temp_dir("reportcard-resolution-noscope");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );

    let resolved = request_ok(&mut stdin, &mut reader, "2", "report.resolve", json!({}));
    assert_eq!(resolved.get("source").and_then(|v| v.as_str()), Some("blank"));
    assert!(resolved.get("sourceId").map(|v| v.is_null()).unwrap_or(false));

    let _ = std::fs::remove_dir_all(workspace);
}
