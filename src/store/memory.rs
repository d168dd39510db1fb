//! In-memory run store, for tests and single-process hosts.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::PersistenceError;
use crate::flow::run::{FlowRun, RunStatus};
use crate::store::traits::{RunStore, SuspendedRun};

#[derive(Debug, Default)]
pub struct InMemoryRunStore {
    runs: RwLock<HashMap<Uuid, FlowRun>>,
}

impl InMemoryRunStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.runs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.runs.read().await.is_empty()
    }
}

#[async_trait]
impl RunStore for InMemoryRunStore {
    async fn save(&self, run: &FlowRun) -> Result<(), PersistenceError> {
        self.runs.write().await.insert(run.run_id, run.clone());
        Ok(())
    }

    async fn load(&self, run_id: Uuid) -> Result<Option<FlowRun>, PersistenceError> {
        Ok(self.runs.read().await.get(&run_id).cloned())
    }

    async fn delete(&self, run_id: Uuid) -> Result<bool, PersistenceError> {
        Ok(self.runs.write().await.remove(&run_id).is_some())
    }

    async fn list_suspended(
        &self,
        flow_id: Option<&str>,
    ) -> Result<Vec<SuspendedRun>, PersistenceError> {
        let runs = self.runs.read().await;
        let mut listed: Vec<SuspendedRun> = runs
            .values()
            .filter(|r| r.status == RunStatus::Abandoned)
            .filter(|r| flow_id.is_none_or(|f| r.flow_id == f))
            .map(SuspendedRun::from)
            .collect();
        listed.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(listed)
    }
}
