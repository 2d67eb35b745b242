//! The per-run outcome tally (spec §5.4). A plain returned value, not an
//! ambient global — the reference keeps similar run reports as owned
//! structs threaded through a command's return path rather than globals.

use serde::Serialize;

use crate::differ::ActionKind;

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct SyncSummary {
    pub pushed: u64,
    pub pulled: u64,
    pub deleted_local: u64,
    pub deleted_remote: u64,
    pub conflicts: u64,
    pub skipped: u64,
    pub errors: u64,
}

impl SyncSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, kind: ActionKind) {
        match kind {
            ActionKind::Push => self.pushed += 1,
            ActionKind::Pull => self.pulled += 1,
            ActionKind::DeleteLocal => self.deleted_local += 1,
            ActionKind::DeleteRemote => self.deleted_remote += 1,
            ActionKind::Conflict => self.conflicts += 1,
            ActionKind::Unchanged => {}
        }
    }

    pub fn record_skip(&mut self) {
        self.skipped += 1;
    }

    pub fn record_error(&mut self) {
        self.errors += 1;
    }

    pub fn total_actions(&self) -> u64 {
        self.pushed + self.pulled + self.deleted_local + self.deleted_remote
    }

    pub fn had_failures(&self) -> bool {
        self.errors > 0
    }

    pub fn to_human(&self) -> String {
        format!(
            "pushed {} pulled {} deleted_local {} deleted_remote {} conflicts {} skipped {} errors {}",
            self.pushed, self.pulled, self.deleted_local, self.deleted_remote, self.conflicts, self.skipped, self.errors
        )
    }
}
