// ── Read model ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{EntityId, FieldRecord, SyncStatus, TaskBinding, TrackedEntity};

/// Point-in-time view of one entity's cached state, as handed to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub id: EntityId,
    pub name: String,
    pub category: String,
    pub slot: u64,
    pub slot_updated_at: DateTime<Utc>,
    pub compute_slot: u64,
    pub compute_slot_updated_at: DateTime<Utc>,
    pub task: Option<TaskBinding>,
    #[serde(default)]
    pub sync: SyncStatus,
}

impl EntitySnapshot {
    pub(crate) fn assemble(
        entity: &TrackedEntity,
        slot: FieldRecord,
        compute_slot: FieldRecord,
        task: Option<TaskBinding>,
        sync: SyncStatus,
    ) -> Self {
        Self {
            id: entity.id.clone(),
            name: entity.name.clone(),
            category: entity.category.clone(),
            slot: slot.value,
            slot_updated_at: slot.updated_at,
            compute_slot: compute_slot.value,
            compute_slot_updated_at: compute_slot.updated_at,
            task,
            sync,
        }
    }

    /// How far computation trails the scheduled slot.
    pub fn deficit(&self) -> u64 {
        self.slot.saturating_sub(self.compute_slot)
    }

    /// Computation has caught up with the scheduled slot.
    pub fn is_synced(&self) -> bool {
        self.slot == self.compute_slot
    }
}
