//! Flow controller — the synchronous state machine driving one run.
//!
//! Pure data in, data out: no I/O and no locking. The async
//! [`FlowManager`](super::manager::FlowManager) wraps controllers with
//! persistence, submission and per-run serialization.

use std::sync::Arc;

use tracing::{debug, info};
use uuid::Uuid;

use crate::error::FlowError;

use super::definition::FlowDefinition;
use super::draft::Draft;
use super::host::StepView;
use super::run::{FlowRun, RunStatus};
use super::step::{Next, StepDefinition};
use super::validation::ValidationResult;

/// Why an `advance` did not move the run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdvanceError {
    /// Recoverable: show the errors, nothing was committed.
    #[error("Validation failed: {0}")]
    Rejected(ValidationResult),

    #[error(transparent)]
    Flow(#[from] FlowError),
}

/// Drives a [`FlowRun`] through a [`FlowDefinition`].
#[derive(Debug, Clone)]
pub struct FlowController {
    flow: Arc<FlowDefinition>,
    run: FlowRun,
}

impl FlowController {
    /// Start a new run at the flow's initial step with an empty draft.
    pub fn start(flow: Arc<FlowDefinition>) -> Self {
        let run = FlowRun::new(flow.id(), flow.initial_step());
        info!(run_id = %run.run_id, flow = %flow.id(), "Flow run started");
        Self { flow, run }
    }

    /// Rebuild a controller around a persisted run, reopening it if it was
    /// abandoned. Completed runs cannot be resumed.
    pub fn resume(flow: Arc<FlowDefinition>, mut run: FlowRun) -> Result<Self, FlowError> {
        if run.flow_id != flow.id() {
            return Err(FlowError::UnknownFlow(run.flow_id));
        }
        if !flow.contains(&run.current_step) {
            return Err(FlowError::UnknownStep {
                flow: run.flow_id,
                step: run.current_step,
            });
        }
        if run.status != RunStatus::InProgress {
            transition(&mut run, RunStatus::InProgress)?;
        }
        info!(
            run_id = %run.run_id,
            flow = %run.flow_id,
            step = %run.current_step,
            "Flow run resumed"
        );
        Ok(Self { flow, run })
    }

    pub fn run(&self) -> &FlowRun {
        &self.run
    }

    pub fn run_id(&self) -> Uuid {
        self.run.run_id
    }

    pub fn flow(&self) -> &FlowDefinition {
        &self.flow
    }

    pub fn current_step_id(&self) -> &str {
        &self.run.current_step
    }

    pub fn draft(&self) -> &Draft {
        &self.run.draft
    }

    pub fn status(&self) -> RunStatus {
        self.run.status
    }

    pub fn is_complete(&self) -> bool {
        self.run.is_complete()
    }

    pub fn current_step(&self) -> Result<&StepDefinition, FlowError> {
        self.flow
            .step(&self.run.current_step)
            .ok_or_else(|| FlowError::UnknownStep {
                flow: self.run.flow_id.clone(),
                step: self.run.current_step.clone(),
            })
    }

    fn ensure_in_progress(&self) -> Result<(), FlowError> {
        if self.run.is_in_progress() {
            Ok(())
        } else {
            Err(FlowError::NotInProgress {
                run_id: self.run.run_id,
                status: self.run.status,
            })
        }
    }

    /// Merge `partial`, validate the current step against the merged draft and
    /// move to its successor.
    ///
    /// On rejection the run is untouched. Fields in `partial` must belong to
    /// the current step. When a field with declared dependents changes, the
    /// dependents are cleared unless `partial` supplies them too.
    pub fn advance(&mut self, partial: &Draft) -> Result<Next, AdvanceError> {
        self.ensure_in_progress()?;
        let step = self.current_step()?;

        let mut foreign = ValidationResult::valid();
        for field in partial.field_names().filter(|f| !step.owns(f)) {
            foreign.reject(field, "is not collected on this step");
        }
        if !foreign.is_ok() {
            debug!(run_id = %self.run.run_id, step = %step.id(), %foreign, "Advance rejected");
            return Err(AdvanceError::Rejected(foreign));
        }

        let stale: Vec<&String> = self
            .run
            .draft
            .changed_by(partial)
            .into_iter()
            .flat_map(|f| self.flow.dependents_of(f))
            .filter(|d| !partial.contains(d))
            .collect();
        let candidate = self.run.draft.reset(&stale).merge(partial);

        let result = step.validate(&candidate);
        if !result.is_ok() {
            debug!(run_id = %self.run.run_id, step = %step.id(), %result, "Advance rejected");
            return Err(AdvanceError::Rejected(result));
        }

        let next = step.next(&candidate);
        let declared = step.declares(&next)
            && next.step_id().is_none_or(|id| self.flow.contains(id));
        if !declared {
            return Err(FlowError::UndeclaredTransition {
                from: step.id().to_string(),
                to: next.to_string(),
            }
            .into());
        }

        if !stale.is_empty() {
            debug!(run_id = %self.run.run_id, fields = ?stale, "Reset dependent fields");
        }
        let completed = step.id().to_string();
        if next.is_terminal() {
            transition(&mut self.run, RunStatus::Completed)?;
        }
        self.run.draft = candidate;
        self.run.history.push(completed.clone());
        if let Next::Step(id) = &next {
            self.run.current_step = id.clone();
        }
        self.run.touch();

        info!(
            run_id = %self.run.run_id,
            from = %completed,
            to = %next,
            "Step committed"
        );
        Ok(next)
    }

    /// Go back one step, keeping every collected field. With no history this
    /// is a no-op returning the current step.
    pub fn retreat(&mut self) -> Result<&str, FlowError> {
        self.ensure_in_progress()?;
        if let Some(previous) = self.run.history.pop() {
            debug!(run_id = %self.run.run_id, from = %self.run.current_step, to = %previous, "Retreat");
            self.run.current_step = previous;
            self.run.touch();
        }
        Ok(&self.run.current_step)
    }

    /// Return to a step already on the path. Steps after it are dropped from
    /// history so they are validated again on the way forward.
    pub fn jump_to(&mut self, step: &str) -> Result<(), FlowError> {
        self.ensure_in_progress()?;
        let pos = self
            .run
            .history
            .iter()
            .rposition(|s| s == step)
            .ok_or_else(|| FlowError::StepNotVisited {
                run_id: self.run.run_id,
                step: step.to_string(),
            })?;
        self.run.history.truncate(pos);
        self.run.current_step = step.to_string();
        self.run.touch();
        debug!(run_id = %self.run.run_id, to = %step, "Jumped to visited step");
        Ok(())
    }

    /// Clear collected fields. Fields owned by a step already committed in
    /// history are locked; go back to that step first.
    pub fn reset<I, S>(&mut self, fields: I) -> Result<(), FlowError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.ensure_in_progress()?;
        let fields: Vec<S> = fields.into_iter().collect();
        for field in &fields {
            let field = field.as_ref();
            if let Some(owner) = self
                .flow
                .owner_of(field)
                .filter(|owner| self.run.has_visited(owner.id()))
            {
                return Err(FlowError::FieldLocked {
                    field: field.to_string(),
                    step: owner.id().to_string(),
                });
            }
        }
        self.run.draft = self.run.draft.reset(&fields);
        self.run.touch();
        Ok(())
    }

    /// Suspend the run so it can be persisted and resumed later. Repeating the
    /// call on an abandoned run is a no-op.
    pub fn save_and_exit(&mut self) -> Result<&FlowRun, FlowError> {
        if self.run.status != RunStatus::Abandoned {
            transition(&mut self.run, RunStatus::Abandoned)?;
            info!(run_id = %self.run.run_id, step = %self.run.current_step, "Run suspended");
        }
        Ok(&self.run)
    }

    /// The draft restricted to fields owned by committed steps. Values left
    /// behind on branches no longer taken are excluded.
    pub fn collected(&self) -> Draft {
        let owned: Vec<&str> = self
            .run
            .history
            .iter()
            .filter_map(|id| self.flow.step(id))
            .flat_map(|s| s.owned_fields())
            .collect();
        self.run.draft.slice(owned)
    }

    /// What the host should render now.
    pub fn view(&self) -> Result<StepView, FlowError> {
        let step = self.current_step()?;
        Ok(StepView {
            run_id: self.run.run_id,
            flow_id: self.run.flow_id.clone(),
            step_id: step.id().to_string(),
            title: step.title().to_string(),
            fields: step.owned_fields().map(String::from).collect(),
            values: self.run.draft.slice(step.owned_fields()),
            position: if self.run.is_complete() {
                self.run.history.len()
            } else {
                self.run.history.len() + 1
            },
            can_go_back: self.run.is_in_progress() && !self.run.history.is_empty(),
            informational: step.is_informational(),
            status: self.run.status,
        })
    }
}

/// Move `run` to `target`, refusing any change the lifecycle does not allow.
fn transition(run: &mut FlowRun, target: RunStatus) -> Result<(), FlowError> {
    if !run.status.can_transition_to(target) {
        return Err(FlowError::NotInProgress {
            run_id: run.run_id,
            status: run.status,
        });
    }
    debug!(run_id = %run.run_id, from = %run.status, to = %target, "Run status changed");
    run.status = target;
    run.touch();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::validation::FieldRule;
    use serde_json::json;
    use std::collections::{BTreeMap, BTreeSet};

    fn draft(v: serde_json::Value) -> Draft {
        Draft::from_object(v).unwrap()
    }

    fn flow() -> Arc<FlowDefinition> {
        let cities: BTreeMap<String, BTreeSet<String>> = [(
            "Punjab".to_string(),
            ["Kamra", "Attock"].into_iter().map(String::from).collect(),
        )]
        .into_iter()
        .collect();
        Arc::new(
            FlowDefinition::builder("Test")
                .step(
                    StepDefinition::new("name", "Name")
                        .field(FieldRule::new("name").required())
                        .goto("place"),
                )
                .step(
                    StepDefinition::new("place", "Place")
                        .field(FieldRule::new("province").required())
                        .field(FieldRule::new("city").required().depends_on("province", cities))
                        .goto("info"),
                )
                .step(StepDefinition::new("info", "Info").goto("done"))
                .step(
                    StepDefinition::new("done", "Done")
                        .field(FieldRule::new("agree").required())
                        .terminal(),
                )
                .dependency("province", ["city"])
                .build()
                .unwrap(),
        )
    }

    fn at_info() -> FlowController {
        let mut c = FlowController::start(flow());
        c.advance(&draft(json!({"name": "Ali"}))).unwrap();
        c.advance(&draft(json!({"province": "Punjab", "city": "Kamra"})))
            .unwrap();
        c
    }

    #[test]
    fn start_is_at_initial_step() {
        let c = FlowController::start(flow());
        assert_eq!(c.current_step_id(), "name");
        assert!(c.draft().is_empty());
        assert_eq!(c.status(), RunStatus::InProgress);
    }

    #[test]
    fn rejected_advance_commits_nothing() {
        let mut c = FlowController::start(flow());
        let before = c.run().clone();
        let err = c.advance(&draft(json!({"name": ""}))).unwrap_err();
        match err {
            AdvanceError::Rejected(r) => assert_eq!(r.error_for("name"), Some("is required")),
            other => panic!("expected rejection, got {other:?}"),
        }
        assert_eq!(c.run(), &before);
    }

    #[test]
    fn foreign_fields_are_rejected() {
        let mut c = FlowController::start(flow());
        let err = c
            .advance(&draft(json!({"name": "Ali", "agree": true})))
            .unwrap_err();
        match err {
            AdvanceError::Rejected(r) => {
                assert_eq!(r.error_for("agree"), Some("is not collected on this step"));
            }
            other => panic!("expected rejection, got {other:?}"),
        }
        assert!(c.draft().is_empty());
    }

    #[test]
    fn retreat_keeps_fields() {
        let mut c = FlowController::start(flow());
        c.advance(&draft(json!({"name": "Ali"}))).unwrap();
        assert_eq!(c.current_step_id(), "place");

        assert_eq!(c.retreat().unwrap(), "name");
        assert_eq!(c.draft().get_str("name"), Some("Ali"));
        assert_eq!(c.view().unwrap().values, draft(json!({"name": "Ali"})));
    }

    #[test]
    fn retreat_on_empty_history_is_noop() {
        let mut c = FlowController::start(flow());
        assert_eq!(c.retreat().unwrap(), "name");
        assert!(c.run().history.is_empty());
    }

    #[test]
    fn informational_step_passes_with_empty_partial() {
        let mut c = at_info();
        assert_eq!(c.current_step_id(), "info");
        assert_eq!(c.advance(&Draft::new()).unwrap(), Next::step("done"));
        assert_eq!(c.run().history, vec!["name", "place", "info"]);
    }

    #[test]
    fn terminal_completes_run() {
        let mut c = at_info();
        c.advance(&Draft::new()).unwrap();
        assert_eq!(
            c.advance(&draft(json!({"agree": true}))).unwrap(),
            Next::Terminal
        );
        assert!(c.is_complete());
        assert_eq!(c.current_step_id(), "done");
        assert_eq!(c.view().unwrap().position, 4);
        assert!(matches!(
            c.save_and_exit(),
            Err(FlowError::NotInProgress { status: RunStatus::Completed, .. })
        ));
        assert_eq!(c.status(), RunStatus::Completed);
        assert!(matches!(
            c.advance(&Draft::new()),
            Err(AdvanceError::Flow(FlowError::NotInProgress { .. }))
        ));
        assert!(c.retreat().is_err());
    }

    #[test]
    fn province_change_resets_city() {
        let mut c = at_info();
        c.retreat().unwrap();
        assert_eq!(c.current_step_id(), "place");

        let err = c.advance(&draft(json!({"province": "Sindh"}))).unwrap_err();
        match err {
            AdvanceError::Rejected(r) => assert_eq!(r.error_for("city"), Some("is required")),
            other => panic!("expected rejection, got {other:?}"),
        }
        // Rejected: stale city still present in the committed draft
        assert_eq!(c.draft().get_str("city"), Some("Kamra"));

        // Same province does not trigger a reset
        c.advance(&draft(json!({"province": "Punjab"}))).unwrap();
        assert_eq!(c.draft().get_str("city"), Some("Kamra"));
    }

    #[test]
    fn jump_to_requires_visited_step() {
        let mut c = at_info();
        let err = c.jump_to("done").unwrap_err();
        assert!(matches!(err, FlowError::StepNotVisited { .. }));

        c.jump_to("name").unwrap();
        assert_eq!(c.current_step_id(), "name");
        assert!(c.run().history.is_empty());
        assert_eq!(c.draft().get_str("city"), Some("Kamra"));
    }

    #[test]
    fn reset_rejects_committed_fields() {
        let mut c = FlowController::start(flow());
        c.advance(&draft(json!({"name": "Ali"}))).unwrap();

        let err = c.reset(["name"]).unwrap_err();
        assert!(matches!(err, FlowError::FieldLocked { ref step, .. } if step == "name"));

        c.retreat().unwrap();
        c.reset(["name"]).unwrap();
        assert!(!c.draft().contains("name"));
    }

    #[test]
    fn save_and_exit_then_resume() {
        let mut c = at_info();
        let snapshot = c.save_and_exit().unwrap().clone();
        assert_eq!(snapshot.status, RunStatus::Abandoned);
        // Idempotent
        assert_eq!(c.save_and_exit().unwrap().status, RunStatus::Abandoned);
        assert!(c.advance(&Draft::new()).is_err());

        let resumed = FlowController::resume(flow(), snapshot.clone()).unwrap();
        assert_eq!(resumed.current_step_id(), "info");
        assert_eq!(resumed.draft(), &snapshot.draft);
        assert_eq!(resumed.status(), RunStatus::InProgress);
    }

    #[test]
    fn resume_rejects_completed_and_foreign_runs() {
        let mut run = FlowRun::new("Test", "done");
        run.status = RunStatus::Completed;
        assert!(matches!(
            FlowController::resume(flow(), run),
            Err(FlowError::NotInProgress { .. })
        ));

        let other = FlowRun::new("Other", "name");
        assert!(matches!(
            FlowController::resume(flow(), other),
            Err(FlowError::UnknownFlow(_))
        ));

        let stale = FlowRun::new("Test", "removed");
        assert!(matches!(
            FlowController::resume(flow(), stale),
            Err(FlowError::UnknownStep { .. })
        ));
    }

    #[test]
    fn collected_excludes_uncommitted_fields() {
        let mut c = FlowController::start(flow());
        c.advance(&draft(json!({"name": "Ali"}))).unwrap();
        c.advance(&draft(json!({"province": "Punjab", "city": "Attock"})))
            .unwrap();
        c.retreat().unwrap();
        // "place" is no longer committed
        assert_eq!(c.collected(), draft(json!({"name": "Ali"})));
    }

    #[test]
    fn view_reflects_position() {
        let c = at_info();
        let view = c.view().unwrap();
        assert_eq!(view.step_id, "info");
        assert_eq!(view.position, 3);
        assert!(view.can_go_back);
        assert!(view.informational);
        assert!(view.fields.is_empty());
    }

    fn branching_flow() -> Arc<FlowDefinition> {
        Arc::new(
            FlowDefinition::builder("Branchy")
                .step(
                    StepDefinition::new("kind", "Kind")
                        .field(FieldRule::new("kind").required())
                        .branch(["a"], |d| match d.get_str("kind") {
                            Some("a") => Next::step("a"),
                            Some("end") => Next::Terminal,
                            _ => Next::step("b"),
                        }),
                )
                .step(StepDefinition::new("a", "A").terminal())
                .step(StepDefinition::new("b", "B").terminal())
                .build()
                .unwrap(),
        )
    }

    #[test]
    fn undeclared_branch_target_commits_nothing() {
        let mut c = FlowController::start(branching_flow());
        let before = c.run().clone();
        let err = c.advance(&draft(json!({"kind": "b"}))).unwrap_err();
        assert!(matches!(
            err,
            AdvanceError::Flow(FlowError::UndeclaredTransition { ref from, ref to })
                if from == "kind" && to == "b"
        ));
        assert_eq!(c.run(), &before);

        assert_eq!(
            c.advance(&draft(json!({"kind": "a"}))).unwrap(),
            Next::step("a")
        );
    }

    #[test]
    fn branch_may_end_the_flow() {
        let mut c = FlowController::start(branching_flow());
        assert_eq!(
            c.advance(&draft(json!({"kind": "end"}))).unwrap(),
            Next::Terminal
        );
        assert!(c.is_complete());
        assert_eq!(c.current_step_id(), "kind");
        assert_eq!(c.run().history, vec!["kind"]);
        assert_eq!(c.view().unwrap().position, 1);
        assert_eq!(c.collected(), draft(json!({"kind": "end"})));
    }
}
