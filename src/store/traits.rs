//! `RunStore` trait — the single async interface for run snapshots.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::PersistenceError;
use crate::flow::run::FlowRun;

/// Listing entry for a suspended run, enough to offer "continue where you left off".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuspendedRun {
    pub run_id: Uuid,
    pub flow_id: String,
    pub current_step: String,
    pub updated_at: DateTime<Utc>,
}

impl From<&FlowRun> for SuspendedRun {
    fn from(run: &FlowRun) -> Self {
        Self {
            run_id: run.run_id,
            flow_id: run.flow_id.clone(),
            current_step: run.current_step.clone(),
            updated_at: run.updated_at,
        }
    }
}

/// Backend-agnostic snapshot storage.
///
/// `save` is an upsert keyed by `run_id`: saving the same run twice leaves a
/// single snapshot holding the latest state.
#[async_trait]
pub trait RunStore: Send + Sync {
    /// Insert or replace the snapshot for `run.run_id`.
    async fn save(&self, run: &FlowRun) -> Result<(), PersistenceError>;

    async fn load(&self, run_id: Uuid) -> Result<Option<FlowRun>, PersistenceError>;

    /// Remove a snapshot. Returns whether one existed.
    async fn delete(&self, run_id: Uuid) -> Result<bool, PersistenceError>;

    /// Abandoned runs, most recently updated first. `None` lists every flow.
    async fn list_suspended(
        &self,
        flow_id: Option<&str>,
    ) -> Result<Vec<SuspendedRun>, PersistenceError>;
}
