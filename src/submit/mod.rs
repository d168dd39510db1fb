//! Submission — hands a completed draft to the marketplace backend.

pub mod http;

pub use http::HttpSubmitter;

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::SubmissionError;
use crate::flow::draft::Draft;

/// Identifier the backend assigns to a submitted listing or application.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListingId(pub String);

impl fmt::Display for ListingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Receives completed drafts. Only called for runs in `Completed`.
#[async_trait]
pub trait Submitter: Send + Sync {
    async fn submit(
        &self,
        flow_id: &str,
        run_id: Uuid,
        draft: &Draft,
    ) -> Result<ListingId, SubmissionError>;
}

/// A submission accepted by [`InMemorySubmitter`].
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub id: ListingId,
    pub flow_id: String,
    pub run_id: Uuid,
    pub draft: Draft,
}

/// Keeps submissions in memory and assigns random ids. Used when no backend
/// URL is configured.
#[derive(Debug, Default)]
pub struct InMemorySubmitter {
    accepted: RwLock<Vec<Submission>>,
}

impl InMemorySubmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn submissions(&self) -> Vec<Submission> {
        self.accepted.read().await.clone()
    }
}

#[async_trait]
impl Submitter for InMemorySubmitter {
    async fn submit(
        &self,
        flow_id: &str,
        run_id: Uuid,
        draft: &Draft,
    ) -> Result<ListingId, SubmissionError> {
        let id = ListingId(Uuid::new_v4().to_string());
        self.accepted.write().await.push(Submission {
            id: id.clone(),
            flow_id: flow_id.to_string(),
            run_id,
            draft: draft.clone(),
        });
        Ok(id)
    }
}
