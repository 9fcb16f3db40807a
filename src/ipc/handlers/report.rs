use serde_json::json;

use crate::grading;
use crate::ipc::error::{err, ok, persist_err};
use crate::ipc::helpers::{get_optional_str, get_record, get_required_str, require_scope};
use crate::ipc::types::{AppState, Request};
use crate::persist::{self, StartupParams};

// URL query params arrive as strings; a JSON client may send a real bool.
fn force_new_param(params: &serde_json::Value) -> bool {
    match params.get("new") {
        Some(v) if v.as_bool() == Some(true) => true,
        Some(v) => v.as_str().map(|s| s == "true").unwrap_or(false),
        None => false,
    }
}

fn handle_resolve(state: &mut AppState, req: &Request) -> serde_json::Value {
    let force_new = force_new_param(&req.params);
    let id = match get_optional_str(&req.params, "id") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };

    // Without a scope there is nothing stored to resolve against.
    let Some(scope) = state.current_scope().map(str::to_string) else {
        return ok(
            &req.id,
            json!({
                "record": crate::model::ReportRecord::blank(),
                "sourceId": null,
                "source": "blank",
                "clearedNew": false,
            }),
        );
    };

    if force_new {
        // A forced-new must also kill any autosave still in flight, or the
        // stale draft would reappear right after being discarded.
        state.autosave.cancel_scope(&scope);
    }

    let Some(conn) = state.store.as_ref() else {
        return err(&req.id, "no_workspace", "no workspace selected", None);
    };
    let params = StartupParams { force_new, id };
    match persist::resolve_on_startup(conn, &scope, &params) {
        Ok(resolved) => match serde_json::to_value(&resolved) {
            Ok(v) => ok(&req.id, v),
            Err(e) => err(&req.id, "internal", e.to_string(), None),
        },
        Err(e) => err(&req.id, "storage_write_failed", e.to_string(), None),
    }
}

fn handle_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let scope = match require_scope(state) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let id = match get_required_str(&req.params, "id") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let Some(conn) = state.store.as_ref() else {
        return err(&req.id, "no_workspace", "no workspace selected", None);
    };

    match persist::load_by_id(conn, &scope, &id) {
        // A miss is an absence, not an error; the caller decides what to
        // fall back to.
        Ok(record) => ok(&req.id, json!({ "record": record })),
        Err(e) => err(&req.id, "storage_write_failed", e.to_string(), None),
    }
}

fn handle_commit(state: &mut AppState, req: &Request) -> serde_json::Value {
    // An explicit save with no scope would be silent data loss; refuse it.
    let scope = match require_scope(state) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let record = match get_record(&req.params) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let existing_id = match get_optional_str(&req.params, "id") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let Some(conn) = state.store.as_ref() else {
        return err(&req.id, "no_workspace", "no workspace selected", None);
    };

    match persist::commit_archive(conn, &scope, record, existing_id.as_deref()) {
        Ok(id) => {
            // The commit cleared the stored draft; a pending autosave for
            // this scope must not write it back.
            state.autosave.cancel_scope(&scope);
            ok(&req.id, json!({ "id": id }))
        }
        Err(e) => persist_err(&req.id, e),
    }
}

fn handle_display_model(_state: &mut AppState, req: &Request) -> serde_json::Value {
    let record = match get_record(&req.params) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let model = grading::display_model(&record);
    match serde_json::to_value(&model) {
        Ok(v) => ok(&req.id, v),
        Err(e) => err(&req.id, "internal", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "report.resolve" => Some(handle_resolve(state, req)),
        "report.get" => Some(handle_get(state, req)),
        "report.commit" => Some(handle_commit(state, req)),
        "report.displayModel" => Some(handle_display_model(state, req)),
        _ => None,
    }
}
