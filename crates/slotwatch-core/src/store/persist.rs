// ── State file ──
//
// JSON image of the registry and cache: one record per entity plus the
// ordered id set. Written to a per-process temp file and renamed into place.
// Writers coordinate through an advisory lock on a sibling `.lock` file,
// since the state file itself is replaced on every save.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{EntityRegistry, StateStore};
use crate::error::CoreError;
use crate::model::{
    EntityId, FieldRecord, SlotField, SyncStatus, TaskBinding, TaskKind, TrackedEntity,
};

const STATE_VERSION: &str = "1";

/// On-disk layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateFile {
    pub version: String,
    pub last_updated: DateTime<Utc>,
    /// Distinct ids in registration order.
    pub entity_ids: Vec<EntityId>,
    pub entities: BTreeMap<EntityId, EntityRecord>,
}

/// One entity's persisted record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub id: EntityId,
    pub name: String,
    pub category: String,
    pub slot: u64,
    pub slot_updated_at: DateTime<Utc>,
    pub compute_slot: u64,
    pub compute_slot_updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_kind: Option<TaskKind>,
    #[serde(default)]
    pub sync: SyncStatus,
}

impl StateFile {
    /// Capture the current registry and cache.
    pub fn capture(registry: &EntityRegistry, store: &StateStore) -> Self {
        let ids = registry.list_ids();
        let mut entities = BTreeMap::new();

        for id in ids.iter() {
            let Some(entity) = registry.get(id) else {
                continue;
            };
            let slot = store.get(id, SlotField::Slot).unwrap_or_default();
            let compute = store.get(id, SlotField::ComputeSlot).unwrap_or_default();
            let task = store.task(id);

            entities.insert(
                id.clone(),
                EntityRecord {
                    id: id.clone(),
                    name: entity.name.clone(),
                    category: entity.category.clone(),
                    slot: slot.value,
                    slot_updated_at: slot.updated_at,
                    compute_slot: compute.value,
                    compute_slot_updated_at: compute.updated_at,
                    task_id: task.as_ref().map(|t| t.task_id.clone()),
                    task_kind: task.map(|t| t.kind),
                    sync: store.sync_status(id).unwrap_or_default(),
                },
            );
        }

        Self {
            version: STATE_VERSION.into(),
            last_updated: Utc::now(),
            entity_ids: ids.to_vec(),
            entities,
        }
    }

    /// Register every entity in `entity_ids` order and restore its
    /// records and binding. Returns how many entities were restored.
    pub fn restore(&self, registry: &EntityRegistry, store: &StateStore) -> usize {
        let mut restored = 0;

        for id in &self.entity_ids {
            let Some(rec) = self.entities.get(id) else {
                warn!(entity = %id, "state file lists id without a record, skipping");
                continue;
            };

            store.restore(
                id,
                SlotField::Slot,
                FieldRecord {
                    value: rec.slot,
                    updated_at: rec.slot_updated_at,
                },
            );
            store.restore(
                id,
                SlotField::ComputeSlot,
                FieldRecord {
                    value: rec.compute_slot,
                    updated_at: rec.compute_slot_updated_at,
                },
            );

            let binding = match (&rec.task_id, rec.task_kind) {
                (Some(task_id), Some(kind)) => Some(TaskBinding {
                    task_id: task_id.clone(),
                    kind,
                }),
                _ => None,
            };
            store.set_task(id, binding);
            store.restore_status(id, rec.sync.clone());

            registry.register(TrackedEntity {
                id: id.clone(),
                name: rec.name.clone(),
                category: rec.category.clone(),
            });
            restored += 1;
        }

        restored
    }
}

/// Read a state file. A missing file is `Ok(None)`.
pub async fn load(path: &Path) -> Result<Option<StateFile>, CoreError> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "no state file yet");
            return Ok(None);
        }
        Err(e) => return Err(persistence(path, &e)),
    };

    let file: StateFile = serde_json::from_slice(&bytes).map_err(|e| persistence(path, &e))?;
    if file.version != STATE_VERSION {
        return Err(CoreError::Persistence {
            path: path.display().to_string(),
            message: format!(
                "unsupported state version {:?} (expected {STATE_VERSION:?})",
                file.version
            ),
        });
    }
    Ok(Some(file))
}

/// Write a state file via temp file + rename.
pub async fn save(path: &Path, file: &StateFile) -> Result<(), CoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| persistence(path, &e))?;
    }

    let json = serde_json::to_vec_pretty(file).map_err(|e| persistence(path, &e))?;
    let tmp = sibling(path, &format!(".{}.tmp", std::process::id()));

    tokio::fs::write(&tmp, json)
        .await
        .map_err(|e| persistence(path, &e))?;
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| persistence(path, &e))?;

    debug!(path = %path.display(), entities = file.entity_ids.len(), "state saved");
    Ok(())
}

// ── Writer lock ──────────────────────────────────────────────────────

/// Exclusive advisory lock over a state file, held until dropped.
///
/// Only one holder may exist per state file across processes. The lock
/// lives on `<state>.lock` so it survives the rename in [`save`].
#[derive(Debug)]
pub struct StateLock {
    state_path: PathBuf,
    file: File,
}

impl StateLock {
    /// Take the lock without waiting. Fails with
    /// [`CoreError::StateLocked`] if someone else holds it.
    pub fn acquire(state_path: &Path) -> Result<Self, CoreError> {
        if let Some(parent) = state_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| persistence(state_path, &e))?;
        }
        let lock_path = sibling(state_path, ".lock");
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(|e| persistence(&lock_path, &e))?;

        match FileExt::try_lock_exclusive(&file) {
            Ok(()) => {
                debug!(path = %state_path.display(), "state lock acquired");
                Ok(Self {
                    state_path: state_path.to_path_buf(),
                    file,
                })
            }
            Err(e)
                if e.kind() == ErrorKind::WouldBlock
                    || e.raw_os_error() == fs2::lock_contended_error().raw_os_error() =>
            {
                Err(CoreError::StateLocked {
                    path: state_path.display().to_string(),
                })
            }
            Err(e) => Err(persistence(&lock_path, &e)),
        }
    }

    /// The state file this lock guards.
    pub fn state_path(&self) -> &Path {
        &self.state_path
    }
}

impl Drop for StateLock {
    fn drop(&mut self) {
        if let Err(e) = FileExt::unlock(&self.file) {
            warn!(path = %self.state_path.display(), error = %e, "failed to release state lock");
        }
    }
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

fn persistence(path: &Path, err: &dyn std::fmt::Display) -> CoreError {
    CoreError::Persistence {
        path: path.display().to_string(),
        message: err.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn seeded() -> (EntityRegistry, StateStore) {
        let registry = EntityRegistry::new();
        let store = StateStore::new();
        for (raw, name) in [("zeta", "Zeta"), ("alpha", "Alpha")] {
            let id: EntityId = raw.parse().unwrap();
            store.init_entity(&id);
            registry.register(TrackedEntity {
                id,
                name: name.into(),
                category: "pool".into(),
            });
        }
        let zeta: EntityId = "zeta".parse().unwrap();
        store.compare_and_set(&zeta, SlotField::Slot, 105);
        store.compare_and_set(&zeta, SlotField::ComputeSlot, 99);
        store.set_task(
            &zeta,
            Some(TaskBinding {
                task_id: "t-1".into(),
                kind: TaskKind::Every,
            }),
        );
        (registry, store)
    }

    #[tokio::test]
    async fn save_then_load_restores_everything() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");

        let (registry, store) = seeded();
        let captured = StateFile::capture(&registry, &store);
        save(&path, &captured).await.unwrap();

        let loaded = load(&path).await.unwrap().unwrap();
        assert_eq!(loaded, captured);

        let registry2 = EntityRegistry::new();
        let store2 = StateStore::new();
        assert_eq!(loaded.restore(&registry2, &store2), 2);

        let binding = registry2.list_ids();
        let ids: Vec<&str> = binding.iter().map(EntityId::as_str).collect();
        assert_eq!(ids, ["zeta", "alpha"]);

        let zeta: EntityId = "zeta".parse().unwrap();
        assert_eq!(store2.get(&zeta, SlotField::Slot), store.get(&zeta, SlotField::Slot));
        assert_eq!(store2.task(&zeta).unwrap().task_id, "t-1");
        assert!(store2.task(&"alpha".parse().unwrap()).is_none());
    }

    #[tokio::test]
    async fn missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(load(&dir.path().join("absent.json")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn unknown_version_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let (registry, store) = seeded();
        let mut file = StateFile::capture(&registry, &store);
        file.version = "99".into();
        save(&path, &file).await.unwrap();

        assert!(matches!(
            load(&path).await,
            Err(CoreError::Persistence { .. })
        ));
    }

    #[test]
    fn lock_is_exclusive_until_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");

        let held = StateLock::acquire(&path).unwrap();
        assert_eq!(held.state_path(), path.as_path());
        assert!(matches!(
            StateLock::acquire(&path),
            Err(CoreError::StateLocked { .. })
        ));

        drop(held);
        assert!(StateLock::acquire(&path).is_ok());
    }

    #[tokio::test]
    async fn save_leaves_no_temp_file_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let (registry, store) = seeded();
        save(&path, &StateFile::capture(&registry, &store)).await.unwrap();

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["state.json"]);
    }

    #[tokio::test]
    async fn sync_status_survives_a_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let (registry, store) = seeded();
        let zeta: EntityId = "zeta".parse().unwrap();
        store.record_attempt(&zeta, SlotField::ComputeSlot, Some("node down".into()));

        save(&path, &StateFile::capture(&registry, &store)).await.unwrap();
        let store2 = StateStore::new();
        load(&path)
            .await
            .unwrap()
            .unwrap()
            .restore(&EntityRegistry::new(), &store2);

        let status = store2.sync_status(&zeta).unwrap();
        assert_eq!(status, store.sync_status(&zeta).unwrap());
        assert_eq!(status.last_error.unwrap().field, SlotField::ComputeSlot);
    }

    #[test]
    fn record_without_task_omits_task_fields() {
        let (registry, store) = seeded();
        let file = StateFile::capture(&registry, &store);
        let json = serde_json::to_value(&file).unwrap();

        assert!(json["entities"]["alpha"].get("task_id").is_none());
        assert_eq!(json["entities"]["zeta"]["task_kind"], "every");
        assert_eq!(json["entity_ids"], serde_json::json!(["zeta", "alpha"]));
    }
}
