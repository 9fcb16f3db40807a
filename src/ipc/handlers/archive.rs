use serde_json::json;

use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{get_required_str, require_scope};
use crate::ipc::types::{AppState, Request};
use crate::persist;

fn handle_list(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(scope) = state.current_scope().map(str::to_string) else {
        return ok(&req.id, json!({ "reports": [] }));
    };
    let Some(conn) = state.store.as_ref() else {
        return err(&req.id, "no_workspace", "no workspace selected", None);
    };

    match persist::list_archive(conn, &scope) {
        Ok(reports) => ok(&req.id, json!({ "reports": reports })),
        Err(e) => err(&req.id, "storage_write_failed", e.to_string(), None),
    }
}

fn handle_delete(state: &mut AppState, req: &Request) -> serde_json::Value {
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

    match persist::delete_archived(conn, &scope, &id) {
        Ok(deleted) => ok(&req.id, json!({ "deleted": deleted })),
        Err(e) => err(&req.id, "storage_write_failed", e.to_string(), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "archive.list" => Some(handle_list(state, req)),
        "archive.delete" => Some(handle_delete(state, req)),
        _ => None,
    }
}
