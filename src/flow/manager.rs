//! Flow manager — async front door for hosts.
//!
//! Owns the live controllers, one per run, and talks to the persistence and
//! submission collaborators. Each run sits behind its own mutex; an operation
//! that finds the run locked fails fast with `FlowError::Busy` instead of
//! queueing behind the one in flight.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Error, FlowError, Result};
use crate::store::{RunStore, SuspendedRun};
use crate::submit::{ListingId, Submitter};

use super::controller::{AdvanceError, FlowController};
use super::draft::Draft;
use super::host::{AdvanceOutcome, StepView};
use super::registry::FlowRegistry;
use super::run::{FlowRun, RunStatus};

type RunHandle = Arc<Mutex<FlowController>>;

pub struct FlowManager {
    registry: FlowRegistry,
    store: Arc<dyn RunStore>,
    submitter: Arc<dyn Submitter>,
    runs: RwLock<HashMap<Uuid, RunHandle>>,
}

impl FlowManager {
    pub fn new(
        registry: FlowRegistry,
        store: Arc<dyn RunStore>,
        submitter: Arc<dyn Submitter>,
    ) -> Self {
        Self {
            registry,
            store,
            submitter,
            runs: RwLock::new(HashMap::new()),
        }
    }

    pub fn registry(&self) -> &FlowRegistry {
        &self.registry
    }

    /// Number of runs held in memory.
    pub async fn active_runs(&self) -> usize {
        self.runs.read().await.len()
    }

    /// Lock a live run. A handle released from memory while we waited for it
    /// is treated as gone, so the caller falls back to the store.
    async fn acquire(&self, run_id: Uuid) -> Result<OwnedMutexGuard<FlowController>> {
        let handle = self
            .runs
            .read()
            .await
            .get(&run_id)
            .cloned()
            .ok_or(FlowError::RunNotFound(run_id))?;
        let guard = handle.clone().try_lock_owned().map_err(|_| {
            debug!(%run_id, "Run busy, rejecting overlapping call");
            FlowError::Busy { run_id }
        })?;
        let current = self
            .runs
            .read()
            .await
            .get(&run_id)
            .is_some_and(|h| Arc::ptr_eq(h, &handle));
        if !current {
            return Err(FlowError::RunNotFound(run_id).into());
        }
        Ok(guard)
    }

    /// Remove a run from memory. The entry goes before the lock is released.
    async fn release(&self, controller: OwnedMutexGuard<FlowController>) {
        let run_id = controller.run_id();
        let mut runs = self.runs.write().await;
        if runs
            .get(&run_id)
            .is_some_and(|h| Arc::ptr_eq(h, OwnedMutexGuard::mutex(&controller)))
        {
            runs.remove(&run_id);
        }
        drop(controller);
    }

    /// Start a new run of `flow_id` and return its first step.
    pub async fn start(&self, flow_id: &str) -> Result<StepView> {
        let flow = self.registry.get(flow_id)?;
        let controller = FlowController::start(flow);
        let view = controller.view()?;
        self.runs
            .write()
            .await
            .insert(view.run_id, Arc::new(Mutex::new(controller)));
        Ok(view)
    }

    /// Submit the current step's fields. A validation failure is an
    /// `Ok(AdvanceOutcome::Rejected)`, not an error.
    pub async fn advance(&self, run_id: Uuid, partial: &Draft) -> Result<AdvanceOutcome> {
        let mut controller = self.acquire(run_id).await?;
        match controller.advance(partial) {
            Ok(next) if next.is_terminal() => Ok(AdvanceOutcome::Completed {
                view: controller.view()?,
            }),
            Ok(_) => Ok(AdvanceOutcome::Moved {
                view: controller.view()?,
            }),
            Err(AdvanceError::Rejected(errors)) => Ok(AdvanceOutcome::Rejected { errors }),
            Err(AdvanceError::Flow(e)) => Err(e.into()),
        }
    }

    pub async fn retreat(&self, run_id: Uuid) -> Result<StepView> {
        let mut controller = self.acquire(run_id).await?;
        controller.retreat()?;
        Ok(controller.view()?)
    }

    pub async fn jump_to(&self, run_id: Uuid, step: &str) -> Result<StepView> {
        let mut controller = self.acquire(run_id).await?;
        controller.jump_to(step)?;
        Ok(controller.view()?)
    }

    /// Clear fields not yet committed by any step on the path.
    pub async fn reset<I, S>(&self, run_id: Uuid, fields: I) -> Result<StepView>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut controller = self.acquire(run_id).await?;
        controller.reset(fields)?;
        Ok(controller.view()?)
    }

    pub async fn view(&self, run_id: Uuid) -> Result<StepView> {
        let controller = self.acquire(run_id).await?;
        Ok(controller.view()?)
    }

    /// A copy of the run as it would be persisted.
    pub async fn snapshot(&self, run_id: Uuid) -> Result<FlowRun> {
        let controller = self.acquire(run_id).await?;
        Ok(controller.run().clone())
    }

    /// Suspend the run and persist its snapshot.
    ///
    /// If the store fails, the run stays in memory as abandoned and the call
    /// can be repeated. Once saved, the run is released from memory; repeating
    /// the call after that is a no-op. Returns the id to resume with.
    pub async fn save_and_exit(&self, run_id: Uuid) -> Result<Uuid> {
        let mut controller = match self.acquire(run_id).await {
            Ok(controller) => controller,
            Err(Error::Flow(FlowError::RunNotFound(_))) => {
                return match self.store.load(run_id).await? {
                    Some(run) if run.status == RunStatus::Abandoned => Ok(run_id),
                    _ => Err(FlowError::RunNotFound(run_id).into()),
                };
            }
            Err(e) => return Err(e),
        };

        let snapshot = controller.save_and_exit()?.clone();
        if let Err(e) = self.store.save(&snapshot).await {
            warn!(%run_id, error = %e, "Failed to persist suspended run");
            return Err(e.into());
        }
        self.release(controller).await;
        info!(%run_id, flow = %snapshot.flow_id, step = %snapshot.current_step, "Run saved");
        Ok(run_id)
    }

    /// Reopen a suspended run at the step and draft it was saved with.
    pub async fn resume(&self, run_id: Uuid) -> Result<StepView> {
        match self.acquire(run_id).await {
            Ok(mut controller) => {
                if controller.status() == RunStatus::Abandoned {
                    let run = controller.run().clone();
                    let flow = self.registry.get(&run.flow_id)?;
                    *controller = FlowController::resume(flow, run)?;
                } else if controller.is_complete() {
                    return Err(FlowError::NotInProgress {
                        run_id,
                        status: controller.status(),
                    }
                    .into());
                }
                return Ok(controller.view()?);
            }
            Err(Error::Flow(FlowError::RunNotFound(_))) => {}
            Err(e) => return Err(e),
        }

        let run = self
            .store
            .load(run_id)
            .await?
            .ok_or(FlowError::RunNotFound(run_id))?;
        let flow = self.registry.get(&run.flow_id)?;
        let controller = FlowController::resume(flow, run)?;
        let view = controller.view()?;

        let mut runs = self.runs.write().await;
        if runs.contains_key(&run_id) {
            return Err(FlowError::Busy { run_id }.into());
        }
        runs.insert(run_id, Arc::new(Mutex::new(controller)));
        Ok(view)
    }

    /// Hand a completed run's collected fields to the submitter. On success the
    /// run and its snapshot are discarded.
    pub async fn submit(&self, run_id: Uuid) -> Result<ListingId> {
        let controller = self.acquire(run_id).await?;
        if !controller.is_complete() {
            return Err(FlowError::NotCompleted { run_id }.into());
        }

        let flow_id = controller.run().flow_id.clone();
        let payload = controller.collected();
        let id = match self.submitter.submit(&flow_id, run_id, &payload).await {
            Ok(id) => id,
            Err(e) => {
                warn!(%run_id, flow = %flow_id, error = %e, "Submission failed");
                return Err(e.into());
            }
        };

        if let Err(e) = self.store.delete(run_id).await {
            warn!(%run_id, error = %e, "Submitted run left a stale snapshot");
        }
        self.release(controller).await;
        info!(%run_id, flow = %flow_id, listing_id = %id, "Run submitted");
        Ok(id)
    }

    /// Drop a run without submitting it, live or suspended. Its snapshot is
    /// deleted before the run leaves memory, so a failed delete can be retried.
    pub async fn discard(&self, run_id: Uuid) -> Result<()> {
        let controller = match self.acquire(run_id).await {
            Ok(controller) => Some(controller),
            Err(Error::Flow(FlowError::RunNotFound(_))) => None,
            Err(e) => return Err(e),
        };

        let stored = match self.store.delete(run_id).await {
            Ok(stored) => stored,
            Err(e) => {
                warn!(%run_id, error = %e, "Failed to delete discarded run");
                return Err(e.into());
            }
        };
        match controller {
            Some(controller) => self.release(controller).await,
            None if !stored => return Err(FlowError::RunNotFound(run_id).into()),
            None => {}
        }
        info!(%run_id, "Run discarded");
        Ok(())
    }

    /// Suspended runs in the store, newest first.
    pub async fn list_suspended(&self, flow_id: Option<&str>) -> Result<Vec<SuspendedRun>> {
        Ok(self.store.list_suspended(flow_id).await?)
    }
}
