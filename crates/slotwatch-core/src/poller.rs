// ── Periodic poller ──
//
// Syncs every field of every registered entity once per tick, one request
// at a time. A tick that fires while the previous one is still running is
// skipped outright.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::model::SlotField;
use crate::store::EntityRegistry;
use crate::sync::Synchronizer;

/// What one tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum TickOutcome {
    /// Another tick held the run guard; nothing was touched.
    Skipped,
    Completed(TickReport),
}

/// Counters for a completed tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TickReport {
    pub entities: usize,
    pub synced: usize,
    pub failed: usize,
}

/// Tick totals since the poller was built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PollerStats {
    pub completed: u64,
    pub skipped: u64,
}

/// Single-flight batch driver over the synchronizer.
pub struct Poller {
    registry: Arc<EntityRegistry>,
    sync: Arc<Synchronizer>,
    running: AtomicBool,
    completed: AtomicU64,
    skipped: AtomicU64,
}

impl Poller {
    pub fn new(registry: Arc<EntityRegistry>, sync: Arc<Synchronizer>) -> Self {
        Self {
            registry,
            sync,
            running: AtomicBool::new(false),
            completed: AtomicU64::new(0),
            skipped: AtomicU64::new(0),
        }
    }

    pub fn stats(&self) -> PollerStats {
        PollerStats {
            completed: self.completed.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
        }
    }

    /// Whether a tick currently holds the run guard.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Run one pass over all entities, unless a pass is already running.
    ///
    /// Per-field failures are logged and counted; the pass always visits
    /// every entity in the id snapshot.
    pub async fn tick(&self) -> TickOutcome {
        let Some(_guard) = RunGuard::acquire(&self.running) else {
            self.skipped.fetch_add(1, Ordering::Relaxed);
            debug!("previous poll still running, tick skipped");
            return TickOutcome::Skipped;
        };

        let ids = self.registry.list_ids();
        let mut report = TickReport {
            entities: ids.len(),
            ..TickReport::default()
        };

        for id in ids.iter() {
            for field in SlotField::ALL {
                match self.sync.sync(id, field).await {
                    Ok(_) => report.synced += 1,
                    Err(e) => {
                        report.failed += 1;
                        warn!(entity = %id, %field, error = %e, "sync failed");
                    }
                }
            }
        }

        debug!(
            entities = report.entities,
            synced = report.synced,
            failed = report.failed,
            "poll complete"
        );
        self.completed.fetch_add(1, Ordering::Relaxed);
        TickOutcome::Completed(report)
    }

    /// Tick every `interval` until `cancel` fires, starting immediately.
    ///
    /// Each tick runs as its own task so an overrunning pass shows up as
    /// skipped ticks. In-flight passes are aborted on cancellation.
    pub async fn run(self: Arc<Self>, interval: Duration, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut passes: Vec<JoinHandle<TickOutcome>> = Vec::new();

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    passes.retain(|pass| !pass.is_finished());
                    let poller = Arc::clone(&self);
                    passes.push(tokio::spawn(async move { poller.tick().await }));
                }
            }
        }

        for pass in passes {
            pass.abort();
            if let Err(e) = pass.await {
                if e.is_panic() {
                    error!(error = %e, "poll pass panicked");
                }
            }
        }
        debug!("poller stopped");
    }
}

/// Holds the run flag for the lifetime of a pass, including unwinding.
struct RunGuard<'a>(&'a AtomicBool);

impl<'a> RunGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
