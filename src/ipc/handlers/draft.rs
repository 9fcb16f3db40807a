use serde_json::json;
use std::time::{Duration, Instant};

use crate::debounce::DEFAULT_AUTOSAVE_WINDOW;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::get_record;
use crate::ipc::types::{AppState, Request};
use crate::persist;

/// Writes the pending autosave if its quiet period has elapsed. The main
/// loop runs this before dispatching each request.
pub fn flush_due_autosave(state: &mut AppState) {
    let Some(pending) = state.autosave.take_due(Instant::now()) else {
        return;
    };
    if let Some(conn) = state.store.as_ref() {
        persist::save_draft(conn, &pending.scope, &pending.record);
    }
}

/// Writes the pending autosave unconditionally (shutdown path).
pub fn drain_autosave(state: &mut AppState) {
    let Some(pending) = state.autosave.take_any() else {
        return;
    };
    if let Some(conn) = state.store.as_ref() {
        persist::save_draft(conn, &pending.scope, &pending.record);
    }
}

fn handle_schedule(state: &mut AppState, req: &Request) -> serde_json::Value {
    if state.store.is_none() {
        return err(&req.id, "no_workspace", "no workspace selected", None);
    }
    let record = match get_record(&req.params) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };

    // Without a scope there is nothing to namespace the draft under;
    // autosave is silently skipped.
    let Some(scope) = state.current_scope().map(str::to_string) else {
        return ok(&req.id, json!({ "scheduled": false, "skipped": true }));
    };

    let window_ms = req
        .params
        .get("debounceMs")
        .and_then(|v| v.as_u64())
        .unwrap_or(DEFAULT_AUTOSAVE_WINDOW.as_millis() as u64);
    state.autosave.schedule(
        &scope,
        record,
        Duration::from_millis(window_ms),
        Instant::now(),
    );

    ok(
        &req.id,
        json!({ "scheduled": true, "debounceMs": window_ms }),
    )
}

fn handle_flush(state: &mut AppState, req: &Request) -> serde_json::Value {
    if state.store.is_none() {
        return err(&req.id, "no_workspace", "no workspace selected", None);
    }
    let pending = state.autosave.take_any();
    let flushed = match (&pending, state.store.as_ref()) {
        (Some(p), Some(conn)) => {
            persist::save_draft(conn, &p.scope, &p.record);
            true
        }
        _ => false,
    };
    ok(&req.id, json!({ "flushed": flushed }))
}

fn handle_discard(state: &mut AppState, req: &Request) -> serde_json::Value {
    if state.store.is_none() {
        return err(&req.id, "no_workspace", "no workspace selected", None);
    }
    let Some(scope) = state.current_scope().map(str::to_string) else {
        return ok(&req.id, json!({ "discarded": false, "skipped": true }));
    };

    if let Some(conn) = state.store.as_ref() {
        if let Err(e) = persist::discard_draft(conn, &scope) {
            tracing::warn!(scope = scope.as_str(), error = %e, "draft discard failed");
        }
    }
    state.autosave.cancel_scope(&scope);
    ok(&req.id, json!({ "discarded": true }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "draft.schedule" => Some(handle_schedule(state, req)),
        "draft.flush" => Some(handle_flush(state, req)),
        "draft.discard" => Some(handle_discard(state, req)),
        _ => None,
    }
}
