// ── Cron task lifecycle ──
//
// Per-entity Idle/Active machine over the node's cron device. Every
// operation is a single attempt; retrying is the caller's call.

use std::collections::HashSet;
use std::sync::Arc;

use slotwatch_api::NodeClient;
use tracing::{info, warn};

use crate::error::CoreError;
use crate::model::{
    EVERY_INTERVAL, EntityId, ReconcileReport, StopOutcome, TaskBinding, TaskKind,
};
use crate::store::{EntityRegistry, StateStore};

/// Starts, stops, and reconciles task bindings.
pub struct TaskController {
    client: Arc<NodeClient>,
    registry: Arc<EntityRegistry>,
    store: Arc<StateStore>,
}

impl TaskController {
    pub fn new(
        client: Arc<NodeClient>,
        registry: Arc<EntityRegistry>,
        store: Arc<StateStore>,
    ) -> Self {
        Self {
            client,
            registry,
            store,
        }
    }

    /// Create a task on the node and bind it to the entity.
    ///
    /// An existing binding is overwritten without stopping its task; the
    /// replaced task keeps running on the node and is logged.
    pub async fn start(&self, id: &EntityId, kind: TaskKind) -> Result<TaskBinding, CoreError> {
        self.ensure_registered(id)?;

        let task_id = match kind {
            TaskKind::Once => self.client.create_once(id.as_str()).await?,
            TaskKind::Every => {
                self.client
                    .create_every(id.as_str(), EVERY_INTERVAL)
                    .await?
            }
        };
        if task_id.is_empty() {
            return Err(CoreError::MalformedResponse { body: task_id });
        }

        let binding = TaskBinding { task_id, kind };
        if let Some(previous) = self.store.set_task(id, Some(binding.clone())) {
            warn!(
                entity = %id,
                replaced = %previous.task_id,
                "active task binding overwritten; replaced task is still scheduled on the node"
            );
        }
        info!(entity = %id, task = %binding.task_id, %kind, "task started");
        Ok(binding)
    }

    /// Stop the entity's task and clear its binding.
    ///
    /// A node reply saying the task is unknown still clears the binding
    /// and yields [`StopOutcome::StaleTaskCleared`]. Any other failure
    /// keeps the binding.
    pub async fn stop(&self, id: &EntityId) -> Result<StopOutcome, CoreError> {
        self.ensure_registered(id)?;

        let Some(binding) = self.store.task(id) else {
            return Err(CoreError::NoActiveTask { entity: id.clone() });
        };

        match self.client.stop_task(&binding.task_id).await {
            Ok(()) => {
                self.store.clear_task_if(id, &binding);
                info!(entity = %id, task = %binding.task_id, "task stopped");
                Ok(StopOutcome::Stopped)
            }
            Err(slotwatch_api::Error::TaskNotFound { .. }) => {
                self.store.clear_task_if(id, &binding);
                info!(entity = %id, task = %binding.task_id, "task already gone on node, binding cleared");
                Ok(StopOutcome::StaleTaskCleared)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Drop every local binding whose task the node no longer lists.
    ///
    /// Nothing is cleared if the listing itself fails.
    pub async fn reconcile(&self) -> Result<ReconcileReport, CoreError> {
        let tasks = self.client.list_tasks().await?;
        let live: HashSet<&str> = tasks.iter().map(|t| t.task_id.as_str()).collect();

        let mut report = ReconcileReport::default();
        for id in self.registry.list_ids().iter() {
            let Some(binding) = self.store.task(id) else {
                continue;
            };
            if live.contains(binding.task_id.as_str()) {
                report.kept += 1;
            } else if self.store.clear_task_if(id, &binding) {
                info!(entity = %id, task = %binding.task_id, "binding cleared, task not listed by node");
                report.cleared.push(id.clone());
            }
        }
        Ok(report)
    }

    fn ensure_registered(&self, id: &EntityId) -> Result<(), CoreError> {
        if self.registry.contains(id) {
            Ok(())
        } else {
            Err(CoreError::EntityNotFound { entity: id.clone() })
        }
    }
}
