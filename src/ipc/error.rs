use serde_json::json;

use crate::persist::PersistError;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

/// Persistence-layer errors carry their own wire code (validation vs
/// storage); this keeps that taxonomy intact across the protocol boundary.
pub fn persist_err(id: &str, e: PersistError) -> serde_json::Value {
    err(id, e.code, e.message, None)
}
