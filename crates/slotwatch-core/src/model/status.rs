// ── Sync health ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::SlotField;

/// The most recent failed read that has not been superseded by a
/// successful read of the same field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncFailure {
    pub field: SlotField,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// Per-entity record of sync attempts, independent of value changes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStatus {
    /// Last time any field read was attempted, successful or not.
    pub last_checked: Option<DateTime<Utc>>,
    /// Field reads attempted since registration.
    pub check_count: u64,
    pub last_error: Option<SyncFailure>,
}

impl SyncStatus {
    /// Note one attempt on `field`. A success clears a standing failure
    /// of the same field only.
    pub(crate) fn record(&mut self, field: SlotField, error: Option<String>, at: DateTime<Utc>) {
        self.last_checked = Some(at);
        self.check_count += 1;
        match error {
            Some(message) => self.last_error = Some(SyncFailure { field, message, at }),
            None => {
                if self.last_error.as_ref().is_some_and(|f| f.field == field) {
                    self.last_error = None;
                }
            }
        }
    }
}
