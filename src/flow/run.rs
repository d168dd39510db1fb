//! Flow runs — the persisted lifecycle record of one wizard execution.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::draft::Draft;

/// Lifecycle of a run.
///
/// InProgress → Completed when the last step validates;
/// InProgress → Abandoned on save & exit; Abandoned → InProgress on resume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    InProgress,
    Completed,
    Abandoned,
}

impl RunStatus {
    pub fn can_transition_to(&self, target: RunStatus) -> bool {
        use RunStatus::*;
        matches!(
            (self, target),
            (InProgress, Completed) | (InProgress, Abandoned) | (Abandoned, InProgress)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Abandoned => "abandoned",
        };
        write!(f, "{s}")
    }
}

/// One execution of a flow definition. Serialized as-is for save & resume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowRun {
    pub run_id: Uuid,
    pub flow_id: String,
    pub current_step: String,
    pub draft: Draft,
    /// Completed steps, oldest first. `retreat` pops from the end.
    pub history: Vec<String>,
    pub status: RunStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FlowRun {
    /// A fresh run positioned at `initial_step` with an empty draft.
    pub fn new(flow_id: impl Into<String>, initial_step: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            run_id: Uuid::new_v4(),
            flow_id: flow_id.into(),
            current_step: initial_step.into(),
            draft: Draft::new(),
            history: Vec::new(),
            status: RunStatus::InProgress,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_in_progress(&self) -> bool {
        self.status == RunStatus::InProgress
    }

    pub fn is_complete(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn has_visited(&self, step: &str) -> bool {
        self.history.iter().any(|s| s == step)
    }

    pub(crate) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_transitions() {
        use RunStatus::*;
        assert!(InProgress.can_transition_to(Completed));
        assert!(InProgress.can_transition_to(Abandoned));
        assert!(Abandoned.can_transition_to(InProgress));
    }

    #[test]
    fn invalid_transitions() {
        use RunStatus::*;
        assert!(!Completed.can_transition_to(InProgress));
        assert!(!Completed.can_transition_to(Abandoned));
        assert!(!Abandoned.can_transition_to(Completed));
        assert!(!InProgress.can_transition_to(InProgress));
    }

    #[test]
    fn display_matches_serde() {
        use RunStatus::*;
        for status in [InProgress, Completed, Abandoned] {
            let display = format!("{status}");
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(format!("\"{display}\""), json);
        }
    }

    #[test]
    fn new_run_starts_empty() {
        let run = FlowRun::new("BecomeAPro", "Welcome");
        assert_eq!(run.current_step, "Welcome");
        assert!(run.draft.is_empty());
        assert!(run.history.is_empty());
        assert!(run.is_in_progress());
        assert_eq!(run.created_at, run.updated_at);
    }

    #[test]
    fn run_serde_roundtrip() {
        let mut run = FlowRun::new("ProviderVerification", "AgeConfirmation");
        run.draft = Draft::new().with("firstName", "Ali").with("lastName", "Khan");
        run.history.push("PersonalDetails".into());

        let json = serde_json::to_string(&run).unwrap();
        let parsed: FlowRun = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, run);
        assert!(parsed.has_visited("PersonalDetails"));
    }
}
