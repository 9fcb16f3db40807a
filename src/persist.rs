use chrono::Utc;
use rusqlite::Connection;
use serde::Serialize;
use uuid::Uuid;

use crate::model::{ArchiveEntry, ArchiveSummary, ReportRecord};
use crate::store::{kv_get_decoded, kv_remove, kv_set, Decoded};

/// One draft slot per class scope.
pub fn draft_key(scope: &str) -> String {
    format!("draft/{}", scope)
}

/// One archive list per class scope; each entry embeds its own id.
pub fn reports_key(scope: &str) -> String {
    format!("reports/{}", scope)
}

#[derive(Debug, Clone)]
pub struct PersistError {
    pub code: &'static str,
    pub message: String,
}

impl PersistError {
    fn validation(message: impl Into<String>) -> Self {
        Self {
            code: "validation_failed",
            message: message.into(),
        }
    }

    fn storage(e: impl std::fmt::Display) -> Self {
        Self {
            code: "storage_write_failed",
            message: e.to_string(),
        }
    }
}

/// Overwrites the scope's single draft slot. Best-effort: a failed draft
/// write only loses autosave history, so it is logged and swallowed here.
pub fn save_draft(conn: &Connection, scope: &str, record: &ReportRecord) {
    let raw = match serde_json::to_string(record) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(scope, error = %e, "draft encode failed; autosave skipped");
            return;
        }
    };
    if let Err(e) = kv_set(conn, &draft_key(scope), &raw) {
        tracing::warn!(scope, error = %e, "draft write failed; autosave skipped");
    }
}

/// Returns the stored draft, or `None` when absent or malformed.
pub fn load_draft(conn: &Connection, scope: &str) -> anyhow::Result<Option<ReportRecord>> {
    let decoded: Decoded<ReportRecord> = kv_get_decoded(conn, &draft_key(scope))?;
    Ok(decoded.into_option().map(|mut r| {
        r.normalize();
        r
    }))
}

pub fn discard_draft(conn: &Connection, scope: &str) -> anyhow::Result<()> {
    kv_remove(conn, &draft_key(scope))
}

fn load_archive_list(conn: &Connection, scope: &str) -> anyhow::Result<Vec<ArchiveEntry>> {
    let decoded: Decoded<Vec<ArchiveEntry>> = kv_get_decoded(conn, &reports_key(scope))?;
    Ok(decoded.into_option().unwrap_or_default())
}

/// Promotes a record into the scope's archive.
///
/// Reuses `existing_id` when the caller is editing a previously archived
/// report, otherwise mints a fresh id. The archive list is rewritten in a
/// single store write: the entry with a matching id is replaced in place,
/// so re-saving never accumulates duplicates. On success the scope's draft
/// is cleared; the next startup begins blank unless an id is requested.
pub fn commit_archive(
    conn: &Connection,
    scope: &str,
    mut record: ReportRecord,
    existing_id: Option<&str>,
) -> Result<String, PersistError> {
    record.normalize();
    if record.bio.name.trim().is_empty() {
        return Err(PersistError::validation(
            "student name is required before saving",
        ));
    }

    let mut list = load_archive_list(conn, scope).map_err(PersistError::storage)?;

    let id = existing_id
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let entry = ArchiveEntry {
        id: id.clone(),
        name: record.bio.name.clone(),
        term: record.bio.term.clone(),
        session: record.bio.session.clone(),
        timestamp: Utc::now().to_rfc3339(),
        data: record,
    };

    match list.iter().position(|e| e.id == id) {
        Some(i) => list[i] = entry,
        None => list.push(entry),
    }

    let raw = serde_json::to_string(&list).map_err(PersistError::storage)?;
    kv_set(conn, &reports_key(scope), &raw).map_err(PersistError::storage)?;

    // The archive write has landed; draft clearing is best-effort like any
    // other draft operation.
    if let Err(e) = kv_remove(conn, &draft_key(scope)) {
        tracing::warn!(scope, error = %e, "draft clear after commit failed");
    }

    Ok(id)
}

/// Linear id scan of the scope's archive; a miss is `None`, not an error.
pub fn load_by_id(conn: &Connection, scope: &str, id: &str) -> anyhow::Result<Option<ReportRecord>> {
    let list = load_archive_list(conn, scope)?;
    Ok(list.into_iter().find(|e| e.id == id).map(|e| {
        let mut r = e.data;
        r.normalize();
        r
    }))
}

pub fn list_archive(conn: &Connection, scope: &str) -> anyhow::Result<Vec<ArchiveSummary>> {
    let list = load_archive_list(conn, scope)?;
    Ok(list.iter().map(ArchiveSummary::of).collect())
}

pub fn delete_archived(conn: &Connection, scope: &str, id: &str) -> anyhow::Result<bool> {
    let mut list = load_archive_list(conn, scope)?;
    let before = list.len();
    list.retain(|e| e.id != id);
    if list.len() == before {
        return Ok(false);
    }
    let raw = serde_json::to_string(&list)?;
    kv_set(conn, &reports_key(scope), &raw)?;
    Ok(true)
}

/// Merges archive entries (from a bundle import) under the commit rule:
/// same id replaces in place, new ids append. Returns (added, replaced).
pub fn merge_archive_entries(
    conn: &Connection,
    scope: &str,
    entries: Vec<ArchiveEntry>,
) -> anyhow::Result<(usize, usize)> {
    let mut list = load_archive_list(conn, scope)?;
    let mut added = 0usize;
    let mut replaced = 0usize;
    for entry in entries {
        match list.iter().position(|e| e.id == entry.id) {
            Some(i) => {
                list[i] = entry;
                replaced += 1;
            }
            None => {
                list.push(entry);
                added += 1;
            }
        }
    }
    let raw = serde_json::to_string(&list)?;
    kv_set(conn, &reports_key(scope), &raw)?;
    Ok((added, replaced))
}

pub fn archive_entries(conn: &Connection, scope: &str) -> anyhow::Result<Vec<ArchiveEntry>> {
    load_archive_list(conn, scope)
}

#[derive(Debug, Clone, Default)]
pub struct StartupParams {
    pub force_new: bool,
    pub id: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolvedSource {
    New,
    Archive,
    Draft,
    Blank,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolved {
    pub record: ReportRecord,
    pub source_id: Option<String>,
    pub source: ResolvedSource,
    /// Set when a `new=true` request was honored; the shell should strip
    /// the marker from its own URL.
    pub cleared_new: bool,
}

#[derive(Debug, Clone)]
enum StartupStrategy {
    ForceNew,
    ArchiveById(String),
    Draft,
    Blank,
}

fn strategy_order(params: &StartupParams) -> Vec<StartupStrategy> {
    let mut order = Vec::with_capacity(4);
    if params.force_new {
        order.push(StartupStrategy::ForceNew);
    }
    if let Some(id) = &params.id {
        order.push(StartupStrategy::ArchiveById(id.clone()));
    }
    order.push(StartupStrategy::Draft);
    order.push(StartupStrategy::Blank);
    order
}

fn apply_strategy(
    conn: &Connection,
    scope: &str,
    strategy: &StartupStrategy,
) -> anyhow::Result<Option<Resolved>> {
    match strategy {
        StartupStrategy::ForceNew => {
            if let Err(e) = discard_draft(conn, scope) {
                tracing::warn!(scope, error = %e, "draft discard on forced-new failed");
            }
            Ok(Some(Resolved {
                record: ReportRecord::blank(),
                source_id: None,
                source: ResolvedSource::New,
                cleared_new: true,
            }))
        }
        StartupStrategy::ArchiveById(id) => match load_by_id(conn, scope, id)? {
            Some(record) => Ok(Some(Resolved {
                record,
                source_id: Some(id.clone()),
                source: ResolvedSource::Archive,
                cleared_new: false,
            })),
            None => {
                tracing::warn!(scope, id, "requested report id not found; falling back");
                Ok(None)
            }
        },
        StartupStrategy::Draft => Ok(load_draft(conn, scope)?.map(|record| Resolved {
            record,
            source_id: None,
            source: ResolvedSource::Draft,
            cleared_new: false,
        })),
        StartupStrategy::Blank => Ok(Some(Resolved {
            record: ReportRecord::blank(),
            source_id: None,
            source: ResolvedSource::Blank,
            cleared_new: false,
        })),
    }
}

/// Deterministic startup precedence: forced-new beats an explicit id,
/// which beats the autosaved draft, which beats the blank form. Strategies
/// are tried in order; the first one that yields a record wins.
pub fn resolve_on_startup(
    conn: &Connection,
    scope: &str,
    params: &StartupParams,
) -> anyhow::Result<Resolved> {
    for strategy in strategy_order(params) {
        if let Some(resolved) = apply_strategy(conn, scope, &strategy)? {
            return Ok(resolved);
        }
    }
    // Blank is always in the list; this is unreachable in practice.
    Ok(Resolved {
        record: ReportRecord::blank(),
        source_id: None,
        source: ResolvedSource::Blank,
        cleared_new: false,
    })
}
