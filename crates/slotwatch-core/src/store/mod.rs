// ── Mirror state ──
//
// Entity registry, compare-then-write field cache, and the JSON state
// file they round-trip through.

pub mod persist;
mod registry;
mod state;

pub use persist::{EntityRecord, StateFile, StateLock};
pub use registry::EntityRegistry;
pub use state::StateStore;
