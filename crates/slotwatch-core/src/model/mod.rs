// ── Domain model ──
//
// Typed records for everything the mirror tracks: entity identity, the
// mirrored slot fields, sync health, and the optional cron task binding.

pub mod entity;
pub mod field;
pub mod snapshot;
pub mod status;
pub mod task;

pub use entity::{EntityId, Registration, TrackedEntity};
pub use field::{FieldRecord, SlotField};
pub use snapshot::EntitySnapshot;
pub use status::{SyncFailure, SyncStatus};
pub use task::{EVERY_INTERVAL, ReconcileReport, StopOutcome, TaskBinding, TaskKind};
