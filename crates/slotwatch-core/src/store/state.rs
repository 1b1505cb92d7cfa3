// ── Field and task cache ──
//
// One map entry per (entity, field) so compare-and-set on a key only
// contends with writers of the same key (modulo DashMap sharding).
// Task bindings live in a separate map with plain overwrite semantics.
// Sync health is tracked per entity and never touches `updated_at`.

use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;

use crate::model::{EntityId, FieldRecord, SlotField, SyncStatus, TaskBinding};

type FieldKey = (EntityId, SlotField);

/// Per-entity, per-field cache of mirrored values and task bindings.
pub struct StateStore {
    fields: DashMap<FieldKey, FieldRecord>,
    tasks: DashMap<EntityId, TaskBinding>,
    health: DashMap<EntityId, SyncStatus>,
}

impl StateStore {
    pub fn new() -> Self {
        Self {
            fields: DashMap::new(),
            tasks: DashMap::new(),
            health: DashMap::new(),
        }
    }

    /// Seed sentinel records for every field. Existing records are kept.
    pub fn init_entity(&self, id: &EntityId) {
        for field in SlotField::ALL {
            self.fields
                .entry((id.clone(), field))
                .or_insert_with(FieldRecord::sentinel);
        }
        self.health.entry(id.clone()).or_default();
    }

    pub fn get(&self, id: &EntityId, field: SlotField) -> Option<FieldRecord> {
        self.fields.get(&(id.clone(), field)).map(|r| *r.value())
    }

    /// Compare-then-write. Replaces the value and stamps `updated_at`
    /// only when `value` differs from the cached one; returns whether it
    /// did. Unknown keys are left absent and report `false`.
    ///
    /// The entry guard makes the read and the write one step for
    /// concurrent callers on the same key.
    pub fn compare_and_set(&self, id: &EntityId, field: SlotField, value: u64) -> bool {
        let Some(mut record) = self.fields.get_mut(&(id.clone(), field)) else {
            return false;
        };
        if record.value == value {
            return false;
        }
        record.value = value;
        record.updated_at = next_stamp(record.updated_at);
        true
    }

    /// Overwrite a record as-is. Used when restoring a state file.
    pub(crate) fn restore(&self, id: &EntityId, field: SlotField, record: FieldRecord) {
        self.fields.insert((id.clone(), field), record);
    }

    // ── Sync health ──────────────────────────────────────────────────

    pub fn sync_status(&self, id: &EntityId) -> Option<SyncStatus> {
        self.health.get(id).map(|r| r.value().clone())
    }

    /// Note a read attempt on `field`, with the error message if it
    /// failed. Unknown entities are ignored.
    pub fn record_attempt(&self, id: &EntityId, field: SlotField, error: Option<String>) {
        if let Some(mut status) = self.health.get_mut(id) {
            status.record(field, error, Utc::now());
        }
    }

    pub(crate) fn restore_status(&self, id: &EntityId, status: SyncStatus) {
        self.health.insert(id.clone(), status);
    }

    // ── Task bindings ────────────────────────────────────────────────

    pub fn task(&self, id: &EntityId) -> Option<TaskBinding> {
        self.tasks.get(id).map(|r| r.value().clone())
    }

    /// Replace the binding (or clear it with `None`). Returns the previous one.
    pub fn set_task(&self, id: &EntityId, binding: Option<TaskBinding>) -> Option<TaskBinding> {
        match binding {
            Some(binding) => self.tasks.insert(id.clone(), binding),
            None => self.tasks.remove(id).map(|(_, prev)| prev),
        }
    }

    /// Clear the binding only if it is still `expected`.
    pub fn clear_task_if(&self, id: &EntityId, expected: &TaskBinding) -> bool {
        self.tasks.remove_if(id, |_, current| current == expected).is_some()
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Now, or one nanosecond past `previous` if the clock has not moved.
fn next_stamp(previous: DateTime<Utc>) -> DateTime<Utc> {
    let now = Utc::now();
    if now > previous {
        now
    } else {
        previous + TimeDelta::nanoseconds(1)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::model::TaskKind;

    fn id(raw: &str) -> EntityId {
        raw.parse().unwrap()
    }

    #[test]
    fn init_seeds_sentinels_for_every_field() {
        let store = StateStore::new();
        store.init_entity(&id("e1"));
        for field in SlotField::ALL {
            assert_eq!(store.get(&id("e1"), field), Some(FieldRecord::sentinel()));
        }
    }

    #[test]
    fn init_does_not_reset_existing_records() {
        let store = StateStore::new();
        store.init_entity(&id("e1"));
        store.compare_and_set(&id("e1"), SlotField::Slot, 9);
        store.init_entity(&id("e1"));
        assert_eq!(store.get(&id("e1"), SlotField::Slot).unwrap().value, 9);
    }

    #[test]
    fn equal_value_leaves_record_untouched() {
        let store = StateStore::new();
        store.init_entity(&id("e1"));
        assert!(store.compare_and_set(&id("e1"), SlotField::Slot, 100));
        let before = store.get(&id("e1"), SlotField::Slot).unwrap();

        assert!(!store.compare_and_set(&id("e1"), SlotField::Slot, 100));
        assert_eq!(store.get(&id("e1"), SlotField::Slot).unwrap(), before);
    }

    #[test]
    fn changed_value_strictly_advances_timestamp() {
        let store = StateStore::new();
        store.init_entity(&id("e1"));
        store.compare_and_set(&id("e1"), SlotField::Slot, 1);
        let mut last = store.get(&id("e1"), SlotField::Slot).unwrap().updated_at;

        for value in 2..50 {
            assert!(store.compare_and_set(&id("e1"), SlotField::Slot, value));
            let rec = store.get(&id("e1"), SlotField::Slot).unwrap();
            assert_eq!(rec.value, value);
            assert!(rec.updated_at > last);
            last = rec.updated_at;
        }
    }

    #[test]
    fn fields_are_independent() {
        let store = StateStore::new();
        store.init_entity(&id("e1"));
        store.compare_and_set(&id("e1"), SlotField::ComputeSlot, 5);
        assert_eq!(store.get(&id("e1"), SlotField::Slot), Some(FieldRecord::sentinel()));
    }

    #[test]
    fn unknown_key_is_not_inserted() {
        let store = StateStore::new();
        assert!(!store.compare_and_set(&id("ghost"), SlotField::Slot, 1));
        assert!(store.get(&id("ghost"), SlotField::Slot).is_none());
    }

    #[test]
    fn concurrent_writers_of_one_value_report_one_change() {
        let store = Arc::new(StateStore::new());
        store.init_entity(&id("e1"));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || store.compare_and_set(&id("e1"), SlotField::Slot, 42))
            })
            .collect();
        let changed = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|c| *c)
            .count();
        assert_eq!(changed, 1);
    }

    #[test]
    fn attempts_are_recorded_without_touching_values() {
        let store = StateStore::new();
        store.init_entity(&id("e1"));
        assert_eq!(store.sync_status(&id("e1")), Some(SyncStatus::default()));

        store.record_attempt(&id("e1"), SlotField::Slot, Some("refused".into()));
        let status = store.sync_status(&id("e1")).unwrap();
        assert_eq!(status.check_count, 1);
        assert!(status.last_checked.is_some());
        assert_eq!(status.last_error.unwrap().message, "refused");
        assert_eq!(store.get(&id("e1"), SlotField::Slot), Some(FieldRecord::sentinel()));

        store.record_attempt(&id("ghost"), SlotField::Slot, None);
        assert!(store.sync_status(&id("ghost")).is_none());
    }

    #[test]
    fn set_task_overwrites_and_returns_previous() {
        let store = StateStore::new();
        let first = TaskBinding {
            task_id: "a".into(),
            kind: TaskKind::Once,
        };
        let second = TaskBinding {
            task_id: "b".into(),
            kind: TaskKind::Every,
        };

        assert!(store.set_task(&id("e1"), Some(first.clone())).is_none());
        assert_eq!(store.set_task(&id("e1"), Some(second.clone())), Some(first));
        assert_eq!(store.task(&id("e1")), Some(second.clone()));
        assert_eq!(store.set_task(&id("e1"), None), Some(second));
        assert!(store.task(&id("e1")).is_none());
    }

    #[test]
    fn clear_task_if_ignores_replaced_binding() {
        let store = StateStore::new();
        let old = TaskBinding {
            task_id: "old".into(),
            kind: TaskKind::Once,
        };
        let new = TaskBinding {
            task_id: "new".into(),
            kind: TaskKind::Once,
        };
        store.set_task(&id("e1"), Some(new.clone()));

        assert!(!store.clear_task_if(&id("e1"), &old));
        assert_eq!(store.task(&id("e1")), Some(new.clone()));
        assert!(store.clear_task_if(&id("e1"), &new));
    }
}
