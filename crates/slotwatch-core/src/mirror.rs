// ── Mirror facade ──
//
// Wires the node client, registry, cache, synchronizer, task controller,
// and poller together and owns the background tasks.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use slotwatch_api::{NodeClient, TransportConfig};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::MirrorConfig;
use crate::error::CoreError;
use crate::model::{
    EntityId, EntitySnapshot, ReconcileReport, Registration, SlotField, StopOutcome, TaskBinding,
    TaskKind, TrackedEntity,
};
use crate::poller::{Poller, TickOutcome};
use crate::store::{EntityRegistry, StateFile, StateLock, StateStore, persist};
use crate::sync::Synchronizer;
use crate::tasks::TaskController;

// ── Mirror ───────────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<MirrorInner>`. Nothing runs in the
/// background until [`start()`](Self::start) is called.
#[derive(Clone)]
pub struct Mirror {
    inner: Arc<MirrorInner>,
}

struct MirrorInner {
    config: MirrorConfig,
    registry: Arc<EntityRegistry>,
    store: Arc<StateStore>,
    sync: Arc<Synchronizer>,
    tasks: TaskController,
    poller: Arc<Poller>,
    cancel: CancellationToken,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
    /// Writer lock on the loaded state file, held until shutdown. The
    /// mutex also serializes in-process saves.
    state_lock: Mutex<Option<StateLock>>,
}

impl Mirror {
    /// Build a mirror for the configured node. Does not contact the node.
    pub fn new(config: MirrorConfig) -> Result<Self, CoreError> {
        let transport = TransportConfig {
            timeout: config.timeout,
            accept_invalid_certs: config.accept_invalid_certs,
            ..TransportConfig::default()
        };
        let client = Arc::new(NodeClient::new(config.node_url.clone(), &transport)?);

        let registry = Arc::new(EntityRegistry::new());
        let store = Arc::new(StateStore::new());
        let sync = Arc::new(Synchronizer::new(Arc::clone(&client), Arc::clone(&store)));
        let tasks = TaskController::new(client, Arc::clone(&registry), Arc::clone(&store));
        let poller = Arc::new(Poller::new(Arc::clone(&registry), Arc::clone(&sync)));

        Ok(Self {
            inner: Arc::new(MirrorInner {
                config,
                registry,
                store,
                sync,
                tasks,
                poller,
                cancel: CancellationToken::new(),
                task_handles: Mutex::new(Vec::new()),
                state_lock: Mutex::new(None),
            }),
        })
    }

    pub fn config(&self) -> &MirrorConfig {
        &self.inner.config
    }

    pub fn registry(&self) -> &Arc<EntityRegistry> {
        &self.inner.registry
    }

    pub fn store(&self) -> &Arc<StateStore> {
        &self.inner.store
    }

    pub fn poller(&self) -> &Arc<Poller> {
        &self.inner.poller
    }

    // ── Entities ─────────────────────────────────────────────────

    /// Track an entity. Re-registering an id is a no-op that keeps the
    /// original metadata.
    pub fn register_entity(
        &self,
        id: EntityId,
        name: impl Into<String>,
        category: impl Into<String>,
    ) -> Registration {
        // Fields exist before the id becomes visible to the poller.
        self.inner.store.init_entity(&id);
        let registration = self.inner.registry.register(TrackedEntity {
            id: id.clone(),
            name: name.into(),
            category: category.into(),
        });
        if registration.inserted {
            info!(entity = %id, "entity registered");
        }
        registration
    }

    /// Sync both fields from the node now and return the cached result.
    ///
    /// Stops at the first failing field; a `Slot` update that already
    /// landed is kept.
    pub async fn refresh(&self, id: &EntityId) -> Result<EntitySnapshot, CoreError> {
        if !self.inner.registry.contains(id) {
            return Err(CoreError::EntityNotFound { entity: id.clone() });
        }
        for field in SlotField::ALL {
            self.inner.sync.sync(id, field).await?;
        }
        self.snapshot(id)
            .ok_or_else(|| CoreError::EntityNotFound { entity: id.clone() })
    }

    /// Cached view of one entity, without contacting the node.
    pub fn snapshot(&self, id: &EntityId) -> Option<EntitySnapshot> {
        let entity = self.inner.registry.get(id)?;
        let store = &self.inner.store;
        Some(EntitySnapshot::assemble(
            &entity,
            store.get(id, SlotField::Slot).unwrap_or_default(),
            store.get(id, SlotField::ComputeSlot).unwrap_or_default(),
            store.task(id),
            store.sync_status(id).unwrap_or_default(),
        ))
    }

    /// Cached view of every entity, in registration order.
    pub fn list_all(&self) -> Vec<EntitySnapshot> {
        self.inner
            .registry
            .list_ids()
            .iter()
            .filter_map(|id| self.snapshot(id))
            .collect()
    }

    // ── Tasks ────────────────────────────────────────────────────

    pub async fn start_task(&self, id: &EntityId, kind: TaskKind) -> Result<TaskBinding, CoreError> {
        self.inner.tasks.start(id, kind).await
    }

    pub async fn stop_task(&self, id: &EntityId) -> Result<StopOutcome, CoreError> {
        self.inner.tasks.stop(id).await
    }

    pub async fn reconcile_tasks(&self) -> Result<ReconcileReport, CoreError> {
        self.inner.tasks.reconcile().await
    }

    // ── Polling ──────────────────────────────────────────────────

    pub async fn poll_once(&self) -> TickOutcome {
        self.inner.poller.tick().await
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Spawn the poller and, when a state file is configured, the
    /// autosave task. Calling it again while tasks are running is a no-op.
    pub async fn start(&self) {
        let mut handles = self.inner.task_handles.lock().await;
        if !handles.is_empty() {
            debug!("mirror already started");
            return;
        }
        let config = &self.inner.config;

        if config.poll_interval_secs > 0 {
            let poller = Arc::clone(&self.inner.poller);
            let interval = Duration::from_secs(config.poll_interval_secs);
            let cancel = self.inner.cancel.clone();
            handles.push(tokio::spawn(poller.run(interval, cancel)));
        }

        if let Some(path) = config.state_path.clone() {
            if config.autosave_interval_secs > 0 {
                let mirror = self.clone();
                let secs = config.autosave_interval_secs;
                let cancel = self.inner.cancel.clone();
                handles.push(tokio::spawn(autosave_task(mirror, path, secs, cancel)));
            }
        }

        info!(
            node = %config.node_url,
            poll_interval_secs = config.poll_interval_secs,
            "mirror started"
        );
    }

    /// Cancel background tasks, wait for them, and write the state file
    /// one last time if one is configured. The mirror cannot be restarted.
    pub async fn shutdown(&self) -> Result<(), CoreError> {
        self.inner.cancel.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            if let Err(e) = handle.await {
                warn!(error = %e, "background task ended abnormally");
            }
        }
        drop(handles);

        if let Some(path) = &self.inner.config.state_path {
            self.save_state(path).await?;
        }
        self.inner.state_lock.lock().await.take();
        debug!("mirror shut down");
        Ok(())
    }

    // ── Persistence ──────────────────────────────────────────────

    /// Take the writer lock on `path` and restore registry and cache from
    /// it. The lock is held until [`shutdown()`](Self::shutdown) or until
    /// another path is loaded, so no other process can write the file
    /// meanwhile. Returns `false` when the file does not exist yet.
    pub async fn load_state(&self, path: &Path) -> Result<bool, CoreError> {
        let mut held = self.inner.state_lock.lock().await;
        if held.as_ref().is_none_or(|lock| lock.state_path() != path) {
            *held = Some(StateLock::acquire(path)?);
        }
        self.restore_from(path).await
    }

    /// Restore from `path` without taking the writer lock. For read-only
    /// consumers that never save.
    pub async fn peek_state(&self, path: &Path) -> Result<bool, CoreError> {
        self.restore_from(path).await
    }

    /// Write registry and cache to `path`. Uses the lock taken by
    /// [`load_state()`](Self::load_state) for the same path, otherwise
    /// takes it for the duration of the write.
    pub async fn save_state(&self, path: &Path) -> Result<(), CoreError> {
        let held = self.inner.state_lock.lock().await;
        let _temporary = match held.as_ref() {
            Some(lock) if lock.state_path() == path => None,
            _ => Some(StateLock::acquire(path)?),
        };
        let file = StateFile::capture(&self.inner.registry, &self.inner.store);
        persist::save(path, &file).await
    }

    async fn restore_from(&self, path: &Path) -> Result<bool, CoreError> {
        let Some(file) = persist::load(path).await? else {
            return Ok(false);
        };
        let restored = file.restore(&self.inner.registry, &self.inner.store);
        info!(path = %path.display(), entities = restored, "state loaded");
        Ok(true)
    }
}

// ── Background tasks ─────────────────────────────────────────────

/// Periodically rewrite the state file.
async fn autosave_task(
    mirror: Mirror,
    path: std::path::PathBuf,
    interval_secs: u64,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
    interval.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                if let Err(e) = mirror.save_state(&path).await {
                    warn!(error = %e, "autosave failed");
                }
            }
        }
    }
}
