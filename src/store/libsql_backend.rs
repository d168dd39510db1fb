//! libSQL backend — async `RunStore` implementation.
//!
//! Each run is one row in `flow_runs`. The full `FlowRun` is kept as a JSON
//! snapshot; the indexed columns beside it exist for listing only.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::PersistenceError;
use crate::flow::run::{FlowRun, RunStatus};
use crate::store::migrations;
use crate::store::traits::{RunStore, SuspendedRun};

/// libSQL snapshot store.
///
/// Stores a single connection that is reused for all operations.
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlRunStore {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlRunStore {
    /// Open (or create) a local database file and run migrations.
    pub async fn new_local(path: &Path) -> Result<Self, PersistenceError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                PersistenceError::Connection(format!("Failed to create database directory: {e}"))
            })?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| {
                PersistenceError::Connection(format!("Failed to open libSQL database: {e}"))
            })?;

        let store = Self::from_database(db).await?;
        info!(path = %path.display(), "Run store opened");
        Ok(store)
    }

    /// Create an in-memory database (for tests).
    pub async fn new_memory() -> Result<Self, PersistenceError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| {
                PersistenceError::Connection(format!("Failed to create in-memory database: {e}"))
            })?;
        Self::from_database(db).await
    }

    async fn from_database(db: LibSqlDatabase) -> Result<Self, PersistenceError> {
        let conn = db
            .connect()
            .map_err(|e| PersistenceError::Connection(format!("Failed to create connection: {e}")))?;
        migrations::run_migrations(&conn).await?;
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }
}

/// Parse an RFC 3339 or SQLite datetime string into DateTime<Utc>.
fn parse_datetime(s: &str) -> DateTime<Utc> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return dt.with_timezone(&Utc);
    }
    if let Ok(ndt) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return ndt.and_utc();
    }
    DateTime::<Utc>::MIN_UTC
}

fn row_to_suspended(row: &libsql::Row) -> Result<SuspendedRun, PersistenceError> {
    let parse = |e: libsql::Error| PersistenceError::Query(format!("list_suspended row parse: {e}"));
    let run_id: String = row.get(0).map_err(parse)?;
    let run_id = Uuid::parse_str(&run_id)
        .map_err(|e| PersistenceError::Serialization(format!("Invalid run id {run_id}: {e}")))?;
    let flow_id: String = row.get(1).map_err(parse)?;
    let current_step: String = row.get(2).map_err(parse)?;
    let updated_at: String = row.get(3).map_err(parse)?;
    Ok(SuspendedRun {
        run_id,
        flow_id,
        current_step,
        updated_at: parse_datetime(&updated_at),
    })
}

#[async_trait]
impl RunStore for LibSqlRunStore {
    async fn save(&self, run: &FlowRun) -> Result<(), PersistenceError> {
        let snapshot = serde_json::to_string(run)
            .map_err(|e| PersistenceError::Serialization(e.to_string()))?;

        self.conn()
            .execute(
                "INSERT INTO flow_runs (run_id, flow_id, current_step, status, snapshot, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                 ON CONFLICT (run_id) DO UPDATE SET
                    current_step = ?3, status = ?4, snapshot = ?5, updated_at = ?7",
                params![
                    run.run_id.to_string(),
                    run.flow_id.clone(),
                    run.current_step.clone(),
                    run.status.to_string(),
                    snapshot,
                    run.created_at.to_rfc3339(),
                    run.updated_at.to_rfc3339(),
                ],
            )
            .await
            .map_err(|e| PersistenceError::Query(format!("save: {e}")))?;

        debug!(run_id = %run.run_id, status = %run.status, "Run snapshot saved");
        Ok(())
    }

    async fn load(&self, run_id: Uuid) -> Result<Option<FlowRun>, PersistenceError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT snapshot FROM flow_runs WHERE run_id = ?1",
                params![run_id.to_string()],
            )
            .await
            .map_err(|e| PersistenceError::Query(format!("load: {e}")))?;

        match rows.next().await {
            Ok(Some(row)) => {
                let snapshot: String = row
                    .get(0)
                    .map_err(|e| PersistenceError::Query(format!("load row parse: {e}")))?;
                let run: FlowRun =
                    serde_json::from_str(&snapshot).map_err(|e| PersistenceError::Corrupt {
                        run_id,
                        reason: e.to_string(),
                    })?;
                if run.run_id != run_id {
                    return Err(PersistenceError::Corrupt {
                        run_id,
                        reason: format!("snapshot holds run {}", run.run_id),
                    });
                }
                Ok(Some(run))
            }
            Ok(None) => Ok(None),
            Err(e) => Err(PersistenceError::Query(format!("load: {e}"))),
        }
    }

    async fn delete(&self, run_id: Uuid) -> Result<bool, PersistenceError> {
        let count = self
            .conn()
            .execute(
                "DELETE FROM flow_runs WHERE run_id = ?1",
                params![run_id.to_string()],
            )
            .await
            .map_err(|e| PersistenceError::Query(format!("delete: {e}")))?;
        Ok(count > 0)
    }

    async fn list_suspended(
        &self,
        flow_id: Option<&str>,
    ) -> Result<Vec<SuspendedRun>, PersistenceError> {
        let status = RunStatus::Abandoned.to_string();
        let mut rows = match flow_id {
            Some(flow_id) => {
                self.conn()
                    .query(
                        "SELECT run_id, flow_id, current_step, updated_at FROM flow_runs
                         WHERE status = ?1 AND flow_id = ?2 ORDER BY updated_at DESC",
                        params![status, flow_id],
                    )
                    .await
            }
            None => {
                self.conn()
                    .query(
                        "SELECT run_id, flow_id, current_step, updated_at FROM flow_runs
                         WHERE status = ?1 ORDER BY updated_at DESC",
                        params![status],
                    )
                    .await
            }
        }
        .map_err(|e| PersistenceError::Query(format!("list_suspended: {e}")))?;

        let mut runs = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| PersistenceError::Query(format!("list_suspended: {e}")))?
        {
            runs.push(row_to_suspended(&row)?);
        }
        Ok(runs)
    }
}
