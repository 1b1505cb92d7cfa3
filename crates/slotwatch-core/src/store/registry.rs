// ── Entity registry ──
//
// Concurrent id -> metadata map plus an ordered id list published through
// a `watch` channel, so readers take cheap `Arc` snapshots without
// holding any lock while they iterate.

use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tokio::sync::watch;

use crate::model::{EntityId, Registration, TrackedEntity};

/// Every tracked entity, in registration order.
pub struct EntityRegistry {
    /// Primary storage: id -> metadata.
    entities: DashMap<EntityId, Arc<TrackedEntity>>,

    /// Registration-ordered ids, rebuilt copy-on-write on insert.
    order: watch::Sender<Arc<Vec<EntityId>>>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        let (order, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            entities: DashMap::new(),
            order,
        }
    }

    /// Register an entity. Idempotent: an existing id keeps its metadata
    /// and `inserted` is `false`.
    pub fn register(&self, entity: TrackedEntity) -> Registration {
        match self.entities.entry(entity.id.clone()) {
            Entry::Occupied(_) => Registration { inserted: false },
            Entry::Vacant(slot) => {
                let id = entity.id.clone();
                // Shard stays locked until the id is published.
                let _held = slot.insert(Arc::new(entity));
                self.order.send_modify(|ids| Arc::make_mut(ids).push(id));
                Registration { inserted: true }
            }
        }
    }

    /// Ids in registration order. Registrations that land after this
    /// call are not in the returned snapshot.
    pub fn list_ids(&self) -> Arc<Vec<EntityId>> {
        self.order.borrow().clone()
    }

    pub fn get(&self, id: &EntityId) -> Option<Arc<TrackedEntity>> {
        self.entities.get(id).map(|r| Arc::clone(r.value()))
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.entities.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl Default for EntityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn entity(id: &str, name: &str) -> TrackedEntity {
        TrackedEntity {
            id: id.parse().unwrap(),
            name: name.into(),
            category: "pool".into(),
        }
    }

    #[test]
    fn register_is_idempotent() {
        let reg = EntityRegistry::new();
        assert!(reg.register(entity("e1", "first")).inserted);
        assert!(!reg.register(entity("e1", "renamed")).inserted);

        assert_eq!(reg.len(), 1);
        assert_eq!(reg.get(&"e1".parse().unwrap()).unwrap().name, "first");
    }

    #[test]
    fn list_ids_keeps_registration_order() {
        let reg = EntityRegistry::new();
        for id in ["c", "a", "b"] {
            reg.register(entity(id, id));
        }
        let binding = reg.list_ids();
        let ids: Vec<&str> = binding.iter().map(EntityId::as_str).collect();
        assert_eq!(ids, ["c", "a", "b"]);
    }

    #[test]
    fn snapshot_is_unaffected_by_later_registration() {
        let reg = EntityRegistry::new();
        reg.register(entity("a", "a"));
        let snap = reg.list_ids();

        reg.register(entity("b", "b"));
        assert_eq!(snap.len(), 1);
        assert_eq!(reg.list_ids().len(), 2);
    }

    #[test]
    fn concurrent_registration_of_one_id_appends_once() {
        let reg = Arc::new(EntityRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let reg = Arc::clone(&reg);
                std::thread::spawn(move || reg.register(entity("same", "x")).inserted)
            })
            .collect();

        let inserted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|inserted| *inserted)
            .count();
        assert_eq!(inserted, 1);
        assert_eq!(reg.list_ids().len(), 1);
    }
}
