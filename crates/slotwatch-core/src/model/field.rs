// ── Mirrored numeric fields ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};

/// A numeric field mirrored from the node for every tracked entity.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SlotField {
    /// Latest slot the node has scheduled for the process.
    Slot,
    /// Slot the process has been computed up to.
    ComputeSlot,
}

impl SlotField {
    /// Every field, in the order a poll visits them.
    pub const ALL: [Self; 2] = [Self::Slot, Self::ComputeSlot];

    /// Path below `{id}~process@1.0/` that serves this field.
    pub fn node_path(self) -> &'static str {
        match self {
            Self::Slot => "slot/current",
            Self::ComputeSlot => "compute/at-slot",
        }
    }
}

/// Cached value of one field plus the time it last changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRecord {
    pub value: u64,
    /// Last time `value` actually changed; not the last poll.
    pub updated_at: DateTime<Utc>,
}

impl FieldRecord {
    /// Zero value stamped at the Unix epoch, used for fresh registrations.
    pub fn sentinel() -> Self {
        Self {
            value: 0,
            updated_at: DateTime::<Utc>::UNIX_EPOCH,
        }
    }
}

impl Default for FieldRecord {
    fn default() -> Self {
        Self::sentinel()
    }
}
