//! Flow host contract — what the rendering layer sees and how it reports back.
//!
//! The host renders `StepView`s and forwards user actions to the engine. It
//! never holds draft fields of its own: whatever it shows comes from the last
//! view it received.

use serde::Serialize;
use uuid::Uuid;

use super::draft::Draft;
use super::run::RunStatus;
use super::validation::ValidationResult;

/// Read-only projection of a run for the current step.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepView {
    pub run_id: Uuid,
    pub flow_id: String,
    pub step_id: String,
    pub title: String,
    /// Inputs to render, in order.
    pub fields: Vec<String>,
    /// Previously collected values for `fields`, for pre-filling.
    pub values: Draft,
    /// 1-based position along the path taken so far.
    pub position: usize,
    pub can_go_back: bool,
    pub informational: bool,
    pub status: RunStatus,
}

/// Result of a primary-action press.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AdvanceOutcome {
    /// The step validated and the run moved on.
    Moved { view: StepView },
    /// The last step validated; the run is complete and ready to submit.
    Completed { view: StepView },
    /// Nothing was committed. Render `errors` inline.
    Rejected { errors: ValidationResult },
}

impl AdvanceOutcome {
    pub fn view(&self) -> Option<&StepView> {
        match self {
            Self::Moved { view } | Self::Completed { view } => Some(view),
            Self::Rejected { .. } => None,
        }
    }

    pub fn errors(&self) -> Option<&ValidationResult> {
        match self {
            Self::Rejected { errors } => Some(errors),
            _ => None,
        }
    }
}

/// A surface that renders steps. Implemented by UI layers (and the CLI).
pub trait FlowHost {
    /// Show the inputs for `view.fields`, pre-filled from `view.values`.
    fn render(&mut self, view: &StepView);

    /// Show per-field errors next to their inputs.
    fn show_errors(&mut self, errors: &ValidationResult);

    /// Tell the user the wizard is done.
    fn finished(&mut self, view: &StepView);

    /// Dispatch an outcome to the matching callback.
    fn present(&mut self, outcome: &AdvanceOutcome) {
        match outcome {
            AdvanceOutcome::Moved { view } => self.render(view),
            AdvanceOutcome::Completed { view } => self.finished(view),
            AdvanceOutcome::Rejected { errors } => self.show_errors(errors),
        }
    }
}
