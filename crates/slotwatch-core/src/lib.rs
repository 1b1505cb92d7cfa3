// slotwatch-core: Slot mirror cache, poller, and cron task lifecycle over slotwatch-api.

pub mod config;
pub mod error;
pub mod mirror;
pub mod model;
pub mod poller;
pub mod store;
pub mod sync;
pub mod tasks;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{DEFAULT_NODE_URL, MirrorConfig};
pub use error::CoreError;
pub use mirror::Mirror;
pub use poller::{Poller, PollerStats, TickOutcome, TickReport};
pub use store::{EntityRegistry, StateFile, StateLock, StateStore};
pub use sync::Synchronizer;
pub use tasks::TaskController;

// Re-export model types at the crate root for ergonomics.
pub use model::{
    EVERY_INTERVAL, EntityId, EntitySnapshot, FieldRecord, ReconcileReport, Registration,
    SlotField, StopOutcome, SyncFailure, SyncStatus, TaskBinding, TaskKind, TrackedEntity,
};
