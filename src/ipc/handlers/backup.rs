use serde_json::json;
use std::path::PathBuf;

use crate::backup;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{get_required_str, require_scope};
use crate::ipc::types::{AppState, Request};

fn handle_export(state: &mut AppState, req: &Request) -> serde_json::Value {
    let scope = match require_scope(state) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let out_path = match get_required_str(&req.params, "outPath") {
        Ok(v) => PathBuf::from(v),
        Err(e) => return e.response(&req.id),
    };
    let Some(conn) = state.store.as_ref() else {
        return err(&req.id, "no_workspace", "no workspace selected", None);
    };

    match backup::export_scope_bundle(conn, &scope, &out_path) {
        Ok(summary) => ok(
            &req.id,
            json!({
                "bundleFormat": summary.bundle_format,
                "reportCount": summary.report_count,
                "outPath": out_path.to_string_lossy(),
            }),
        ),
        Err(e) => err(&req.id, "bundle_failed", format!("{e:#}"), None),
    }
}

fn handle_import(state: &mut AppState, req: &Request) -> serde_json::Value {
    let scope = match require_scope(state) {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let in_path = match get_required_str(&req.params, "inPath") {
        Ok(v) => PathBuf::from(v),
        Err(e) => return e.response(&req.id),
    };
    let Some(conn) = state.store.as_ref() else {
        return err(&req.id, "no_workspace", "no workspace selected", None);
    };

    match backup::import_scope_bundle(conn, &scope, &in_path) {
        Ok(summary) => ok(
            &req.id,
            json!({
                "reportCount": summary.report_count,
                "added": summary.added,
                "replaced": summary.replaced,
            }),
        ),
        Err(e) => err(&req.id, "bundle_failed", format!("{e:#}"), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "backup.exportScope" => Some(handle_export(state, req)),
        "backup.importScope" => Some(handle_import(state, req)),
        _ => None,
    }
}
