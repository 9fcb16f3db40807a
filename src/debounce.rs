use std::time::{Duration, Instant};

use crate::model::ReportRecord;

pub const DEFAULT_AUTOSAVE_WINDOW: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone)]
pub struct PendingSave {
    pub scope: String,
    pub record: ReportRecord,
    pub due: Instant,
}

/// Debounced autosave state: at most one save is ever pending.
///
/// Scheduling replaces whatever was pending, so a burst of edits collapses
/// to a single write of the latest state once the quiet period elapses.
/// The clock is passed in, not read here, so the invariant is testable.
#[derive(Debug, Default)]
pub struct Autosave {
    pending: Option<PendingSave>,
}

impl Autosave {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels any pending save and arms a new one.
    pub fn schedule(&mut self, scope: &str, record: ReportRecord, window: Duration, now: Instant) {
        self.pending = Some(PendingSave {
            scope: scope.to_string(),
            record,
            due: now + window,
        });
    }

    /// Takes the pending save if its quiet period has elapsed.
    pub fn take_due(&mut self, now: Instant) -> Option<PendingSave> {
        if self.pending.as_ref().map(|p| p.due <= now).unwrap_or(false) {
            return self.pending.take();
        }
        None
    }

    /// Drains the pending save regardless of deadline (flush / shutdown).
    pub fn take_any(&mut self) -> Option<PendingSave> {
        self.pending.take()
    }

    /// Drops a pending save for `scope`; a commit or an explicit discard
    /// must not be overwritten by a stale autosave firing afterwards.
    pub fn cancel_scope(&mut self, scope: &str) {
        if self
            .pending
            .as_ref()
            .map(|p| p.scope == scope)
            .unwrap_or(false)
        {
            self.pending = None;
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}
