//! HTTP submitter — POSTs completed drafts to the marketplace API.
//!
//! `POST {base_url}/flows/{flow_id}/submissions` with body
//! `{"run_id": "...", "fields": {...}}`; a 2xx response carries `{"id": "..."}`.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::SubmissionError;
use crate::flow::draft::Draft;

use super::{ListingId, Submitter};

#[derive(Debug, Deserialize)]
struct SubmissionReceipt {
    id: String,
}

pub struct HttpSubmitter {
    base_url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpSubmitter {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, SubmissionError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SubmissionError::Transport(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
            client,
        })
    }

    fn submissions_url(&self, flow_id: &str) -> String {
        format!("{}/flows/{flow_id}/submissions", self.base_url)
    }

    fn transport_error(&self, e: reqwest::Error) -> SubmissionError {
        if e.is_timeout() {
            SubmissionError::Timeout(self.timeout)
        } else {
            SubmissionError::Transport(e.to_string())
        }
    }
}

#[async_trait]
impl Submitter for HttpSubmitter {
    async fn submit(
        &self,
        flow_id: &str,
        run_id: Uuid,
        draft: &Draft,
    ) -> Result<ListingId, SubmissionError> {
        let body = serde_json::json!({
            "run_id": run_id,
            "fields": draft,
        });

        let resp = self
            .client
            .post(self.submissions_url(flow_id))
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = resp.status();
        if !status.is_success() {
            let reason = resp.text().await.unwrap_or_default();
            warn!(%run_id, flow = %flow_id, status = status.as_u16(), "Submission rejected");
            return Err(SubmissionError::Rejected {
                status: status.as_u16(),
                reason,
            });
        }

        let receipt: SubmissionReceipt = resp.json().await.map_err(|e| {
            if e.is_timeout() {
                SubmissionError::Timeout(self.timeout)
            } else {
                SubmissionError::InvalidResponse(e.to_string())
            }
        })?;
        debug!(%run_id, flow = %flow_id, listing_id = %receipt.id, "Submission accepted");
        Ok(ListingId(receipt.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_without_double_slash() {
        let s = HttpSubmitter::new("https://api.example.test/", Duration::from_secs(5)).unwrap();
        assert_eq!(
            s.submissions_url("ListingCreation"),
            "https://api.example.test/flows/ListingCreation/submissions"
        );
    }

    #[test]
    fn receipt_parses() {
        let receipt: SubmissionReceipt = serde_json::from_str(r#"{"id": "lst_9", "extra": 1}"#).unwrap();
        assert_eq!(receipt.id, "lst_9");
    }

    #[tokio::test]
    async fn unreachable_backend_is_a_retryable_transport_error() {
        // Port 9 (discard) on localhost is not expected to accept HTTP.
        let s = HttpSubmitter::new("http://127.0.0.1:9", Duration::from_secs(2)).unwrap();
        let err = s
            .submit("BecomeAPro", Uuid::new_v4(), &Draft::new())
            .await
            .unwrap_err();
        assert!(err.is_retryable(), "unexpected error: {err}");
    }
}
