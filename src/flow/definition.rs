//! Flow definitions — the immutable step graph of one wizard.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use crate::error::FlowDefinitionError;

use super::step::StepDefinition;

/// An immutable, checked registry of steps for one wizard.
///
/// Built through [`FlowDefinitionBuilder`], which rejects graphs with unknown
/// successors or self-loops before any run can start.
#[derive(Debug, Clone)]
pub struct FlowDefinition {
    id: String,
    initial_step: String,
    steps: HashMap<String, StepDefinition>,
    order: Vec<String>,
    /// trigger field → fields reset when the trigger changes.
    dependents: BTreeMap<String, Vec<String>>,
}

impl FlowDefinition {
    pub fn builder(id: impl Into<String>) -> FlowDefinitionBuilder {
        FlowDefinitionBuilder {
            id: id.into(),
            initial_step: None,
            steps: Vec::new(),
            dependents: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn initial_step(&self) -> &str {
        &self.initial_step
    }

    pub fn step(&self, id: &str) -> Option<&StepDefinition> {
        self.steps.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.steps.contains_key(id)
    }

    /// Steps in declaration order.
    pub fn steps(&self) -> impl Iterator<Item = &StepDefinition> {
        self.order.iter().filter_map(|id| self.steps.get(id))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Every declared `(from, to)` edge, in declaration order.
    pub fn edges(&self) -> Vec<(&str, &str)> {
        self.steps()
            .flat_map(|s| s.successors().into_iter().map(move |to| (s.id(), to)))
            .collect()
    }

    /// Steps reachable from the initial step along any declared edge.
    pub fn reachable(&self) -> BTreeSet<&str> {
        let mut seen = BTreeSet::new();
        let mut queue = VecDeque::from([self.initial_step.as_str()]);
        while let Some(id) = queue.pop_front() {
            if !seen.insert(id) {
                continue;
            }
            if let Some(step) = self.steps.get(id) {
                queue.extend(step.successors());
            }
        }
        seen
    }

    /// Fields to clear when `field` changes value.
    pub fn dependents_of(&self, field: &str) -> &[String] {
        self.dependents
            .get(field)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// The step that collects `field`, if any.
    pub fn owner_of(&self, field: &str) -> Option<&StepDefinition> {
        self.steps().find(|s| s.owns(field))
    }
}

/// Collects steps and checks the graph on `build`.
pub struct FlowDefinitionBuilder {
    id: String,
    initial_step: Option<String>,
    steps: Vec<StepDefinition>,
    dependents: BTreeMap<String, Vec<String>>,
}

impl FlowDefinitionBuilder {
    /// Start at `step` instead of the first step added.
    pub fn initial(mut self, step: impl Into<String>) -> Self {
        self.initial_step = Some(step.into());
        self
    }

    pub fn step(mut self, step: StepDefinition) -> Self {
        self.steps.push(step);
        self
    }

    /// Declare that `dependents` become stale whenever `trigger` changes.
    pub fn dependency<I, S>(mut self, trigger: impl Into<String>, dependents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.dependents
            .entry(trigger.into())
            .or_default()
            .extend(dependents.into_iter().map(Into::into));
        self
    }

    pub fn build(self) -> Result<FlowDefinition, FlowDefinitionError> {
        let flow = self.id;
        let Some(first) = self.steps.first() else {
            return Err(FlowDefinitionError::Empty { flow });
        };
        let initial_step = self.initial_step.unwrap_or_else(|| first.id().to_string());

        let mut order = Vec::with_capacity(self.steps.len());
        let mut steps = HashMap::with_capacity(self.steps.len());
        for step in self.steps {
            let id = step.id().to_string();
            if steps.contains_key(&id) {
                return Err(FlowDefinitionError::DuplicateStep { flow, step: id });
            }
            order.push(id.clone());
            steps.insert(id, step);
        }

        if !steps.contains_key(&initial_step) {
            return Err(FlowDefinitionError::UnknownInitialStep {
                flow,
                step: initial_step,
            });
        }

        for id in &order {
            let step = &steps[id];
            for to in step.successors() {
                if to == id {
                    return Err(FlowDefinitionError::SelfReference {
                        flow,
                        step: id.clone(),
                    });
                }
                if !steps.contains_key(to) {
                    return Err(FlowDefinitionError::UnknownTarget {
                        flow,
                        from: id.clone(),
                        to: to.to_string(),
                    });
                }
            }
        }

        Ok(FlowDefinition {
            id: flow,
            initial_step,
            steps,
            order,
            dependents: self.dependents,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::step::Next;
    use crate::flow::validation::FieldRule;

    fn linear() -> FlowDefinitionBuilder {
        FlowDefinition::builder("Linear")
            .step(StepDefinition::new("a", "A").goto("b"))
            .step(StepDefinition::new("b", "B").goto("c"))
            .step(StepDefinition::new("c", "C").terminal())
    }

    #[test]
    fn builds_and_defaults_initial_to_first_step() {
        let flow = linear().build().unwrap();
        assert_eq!(flow.initial_step(), "a");
        assert_eq!(flow.len(), 3);
        assert_eq!(flow.edges(), vec![("a", "b"), ("b", "c")]);
    }

    #[test]
    fn rejects_empty_flow() {
        let err = FlowDefinition::builder("Empty").build().unwrap_err();
        assert_eq!(err, FlowDefinitionError::Empty { flow: "Empty".into() });
    }

    #[test]
    fn rejects_unknown_target() {
        let err = FlowDefinition::builder("Broken")
            .step(StepDefinition::new("a", "A").goto("missing"))
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            FlowDefinitionError::UnknownTarget {
                flow: "Broken".into(),
                from: "a".into(),
                to: "missing".into(),
            }
        );
    }

    #[test]
    fn rejects_unknown_branch_target() {
        let err = FlowDefinition::builder("Broken")
            .step(StepDefinition::new("a", "A").branch(["b", "ghost"], |_| Next::step("b")))
            .step(StepDefinition::new("b", "B"))
            .build()
            .unwrap_err();
        assert!(matches!(err, FlowDefinitionError::UnknownTarget { to, .. } if to == "ghost"));
    }

    #[test]
    fn rejects_self_reference() {
        let err = FlowDefinition::builder("Loop")
            .step(StepDefinition::new("a", "A").goto("a"))
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            FlowDefinitionError::SelfReference {
                flow: "Loop".into(),
                step: "a".into(),
            }
        );
    }

    #[test]
    fn rejects_duplicates_and_unknown_initial() {
        let err = linear()
            .step(StepDefinition::new("a", "again"))
            .build()
            .unwrap_err();
        assert!(matches!(err, FlowDefinitionError::DuplicateStep { .. }));

        let err = linear().initial("zzz").build().unwrap_err();
        assert!(matches!(err, FlowDefinitionError::UnknownInitialStep { .. }));
    }

    #[test]
    fn reachable_skips_orphans() {
        let flow = linear()
            .step(StepDefinition::new("orphan", "Never linked"))
            .build()
            .unwrap();
        let reachable = flow.reachable();
        assert!(reachable.contains("c"));
        assert!(!reachable.contains("orphan"));
    }

    #[test]
    fn dependency_and_owner_lookup() {
        let flow = FlowDefinition::builder("Residence")
            .step(
                StepDefinition::new("r", "Residence")
                    .field(FieldRule::new("province").required())
                    .field(FieldRule::new("city").required()),
            )
            .dependency("province", ["city"])
            .build()
            .unwrap();
        assert_eq!(flow.dependents_of("province"), ["city".to_string()]);
        assert!(flow.dependents_of("city").is_empty());
        assert_eq!(flow.owner_of("city").map(|s| s.id()), Some("r"));
        assert!(flow.owner_of("age").is_none());
    }
}
