use crate::ipc::error::err;
use crate::ipc::types::AppState;
use crate::model::ReportRecord;

pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl HandlerErr {
    pub fn new(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: None,
        }
    }

    pub fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }
}

pub fn get_required_str(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| HandlerErr::new("bad_params", format!("missing {}", key)))
}

pub fn get_optional_str(
    params: &serde_json::Value,
    key: &str,
) -> Result<Option<String>, HandlerErr> {
    match params.get(key) {
        None => Ok(None),
        Some(v) if v.is_null() => Ok(None),
        Some(v) => v
            .as_str()
            .map(|s| Some(s.to_string()))
            .ok_or_else(|| HandlerErr::new("bad_params", format!("{} must be a string", key))),
    }
}

/// Decodes `params.record` as a report record. The record decode itself is
/// tolerant (missing sections default, scores clamp); only a structurally
/// alien value is rejected.
pub fn get_record(params: &serde_json::Value) -> Result<ReportRecord, HandlerErr> {
    let raw = params
        .get("record")
        .ok_or_else(|| HandlerErr::new("bad_params", "missing record"))?;
    let mut record: ReportRecord = serde_json::from_value(raw.clone())
        .map_err(|e| HandlerErr::new("bad_params", format!("invalid record: {}", e)))?;
    record.normalize();
    Ok(record)
}

pub fn require_scope(state: &AppState) -> Result<String, HandlerErr> {
    state
        .current_scope()
        .map(|s| s.to_string())
        .ok_or_else(|| HandlerErr::new("no_session", "no active class session"))
}
