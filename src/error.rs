//! Error types for the wizard flow engine.
//!
//! Validation failures are not errors: they come back as data
//! (`ValidationResult`) from `advance` so the host can render them inline.

use std::time::Duration;

use uuid::Uuid;

use crate::flow::run::RunStatus;

/// Top-level error type for the engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Flow definition error: {0}")]
    Definition(#[from] FlowDefinitionError),

    #[error("Flow error: {0}")]
    Flow(#[from] FlowError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Submission error: {0}")]
    Submission(#[from] SubmissionError),
}

impl Error {
    /// Whether the host should offer the user a retry prompt.
    ///
    /// Only collaborator failures qualify; misuse of the engine does not go
    /// away by trying again.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Persistence(_) => true,
            Self::Submission(e) => e.is_retryable(),
            Self::Flow(FlowError::Busy { .. }) => true,
            _ => false,
        }
    }
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Programmer errors caught when a flow is built or registered.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FlowDefinitionError {
    #[error("Flow {flow} has no steps")]
    Empty { flow: String },

    #[error("Flow {flow} declares step {step} twice")]
    DuplicateStep { flow: String, step: String },

    #[error("Flow {flow} starts at unknown step {step}")]
    UnknownInitialStep { flow: String, step: String },

    #[error("Flow {flow}: step {from} transitions to unknown step {to}")]
    UnknownTarget {
        flow: String,
        from: String,
        to: String,
    },

    #[error("Flow {flow}: step {step} lists itself as a successor")]
    SelfReference { flow: String, step: String },

    #[error("Flow {flow} is already registered")]
    DuplicateFlow { flow: String },
}

/// Misuse of the engine at runtime: unknown ids, wrong run state, overlapping calls.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FlowError {
    #[error("Unknown flow: {0}")]
    UnknownFlow(String),

    #[error("Run {0} not found")]
    RunNotFound(Uuid),

    #[error("Run {run_id} is {status}, not in progress")]
    NotInProgress { run_id: Uuid, status: RunStatus },

    #[error("Run {run_id} has not completed")]
    NotCompleted { run_id: Uuid },

    #[error("Flow {flow} has no step {step}")]
    UnknownStep { flow: String, step: String },

    #[error("Field {field} belongs to completed step {step}; go back to it to change it")]
    FieldLocked { field: String, step: String },

    #[error("Step {step} has not been visited in run {run_id}")]
    StepNotVisited { run_id: Uuid, step: String },

    #[error("Run {run_id} is busy with another operation")]
    Busy { run_id: Uuid },

    #[error("Step {from} chose undeclared successor {to}")]
    UndeclaredTransition { from: String, to: String },
}

/// Failures of the persistence collaborator.
#[derive(Debug, thiserror::Error)]
pub enum PersistenceError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Corrupt snapshot for run {run_id}: {reason}")]
    Corrupt { run_id: Uuid, reason: String },
}

/// Failures of the submission collaborator.
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error("Submission rejected ({status}): {reason}")]
    Rejected { status: u16, reason: String },

    #[error("Submission transport failed: {0}")]
    Transport(String),

    #[error("Submission timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid submission response: {0}")]
    InvalidResponse(String),
}

impl SubmissionError {
    /// A 4xx rejection will fail again with the same payload; everything else may not.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Rejected { status, .. } => *status >= 500,
            Self::Transport(_) | Self::Timeout(_) => true,
            Self::InvalidResponse(_) => false,
        }
    }
}

/// Result type alias for the engine.
pub type Result<T> = std::result::Result<T, Error>;
