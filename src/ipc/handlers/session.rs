use serde_json::json;

use crate::ipc::error::ok;
use crate::ipc::helpers::get_required_str;
use crate::ipc::types::{ActiveSession, AppState, Request};

// The session surface is identity only: it names the class scope records
// are namespaced under. Credential checking lives in the shell.

fn handle_open(state: &mut AppState, req: &Request) -> serde_json::Value {
    let class_id = match get_required_str(&req.params, "classId") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let class_id = class_id.trim().to_string();
    if class_id.is_empty() {
        return crate::ipc::error::err(&req.id, "bad_params", "classId must be non-empty", None);
    }

    let login_time = chrono::Utc::now().to_rfc3339();
    state.session = Some(ActiveSession {
        class_id: class_id.clone(),
        login_time: login_time.clone(),
    });
    ok(&req.id, json!({ "scope": class_id, "loginTime": login_time }))
}

fn handle_close(state: &mut AppState, req: &Request) -> serde_json::Value {
    // A pending autosave keeps its captured scope and may still flush;
    // closing the session only drops the identity.
    state.session = None;
    ok(&req.id, json!({ "closed": true }))
}

fn handle_current(state: &mut AppState, req: &Request) -> serde_json::Value {
    match &state.session {
        Some(s) => ok(
            &req.id,
            json!({ "scope": s.class_id, "loginTime": s.login_time }),
        ),
        None => ok(&req.id, json!({ "scope": null })),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "session.open" => Some(handle_open(state, req)),
        "session.close" => Some(handle_close(state, req)),
        "session.current" => Some(handle_current(state, req)),
        _ => None,
    }
}
