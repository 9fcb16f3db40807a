use std::path::PathBuf;

use rusqlite::Connection;
use serde::Deserialize;

use crate::debounce::Autosave;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// The active teaching session. Held in memory only: it vanishes with the
/// process, the way a session-scoped store vanishes with its tab.
#[derive(Debug, Clone)]
pub struct ActiveSession {
    pub class_id: String,
    pub login_time: String,
}

pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub store: Option<Connection>,
    pub session: Option<ActiveSession>,
    pub autosave: Autosave,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            workspace: None,
            store: None,
            session: None,
            autosave: Autosave::new(),
        }
    }

    /// The class scope persistence is namespaced under, if any.
    pub fn current_scope(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.class_id.as_str())
    }
}
