// ── Cron task bindings ──

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

use super::EntityId;

/// Schedule shape of a node cron task.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum TaskKind {
    /// Single run.
    Once,
    /// Recurring run at [`EVERY_INTERVAL`].
    Every,
}

/// Interval, in node notation, used for every recurring task.
pub const EVERY_INTERVAL: &str = "5-minutes";

/// The task currently bound to an entity. An entity holds at most one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskBinding {
    pub task_id: String,
    pub kind: TaskKind,
}

/// Successful outcome of stopping an entity's task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopOutcome {
    /// The node stopped the task.
    Stopped,
    /// The node no longer knew the task; the local binding was stale and
    /// has been cleared.
    StaleTaskCleared,
}

/// Result of reconciling local bindings against the node's task list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    /// Bindings whose task the node still lists.
    pub kept: usize,
    /// Entities whose binding was cleared because the task is gone.
    pub cleared: Vec<EntityId>,
}
