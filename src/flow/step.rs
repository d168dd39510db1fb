//! Step definitions — what a step collects, how it validates, where it leads.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::draft::Draft;
use super::validation::{FieldRule, ValidationResult, validate_rules};

/// Where a step leads: another step, or the end of the wizard.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Next {
    Step(String),
    Terminal,
}

impl Next {
    pub fn step(id: impl Into<String>) -> Self {
        Self::Step(id.into())
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminal)
    }

    pub fn step_id(&self) -> Option<&str> {
        match self {
            Self::Step(id) => Some(id),
            Self::Terminal => None,
        }
    }
}

impl fmt::Display for Next {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Step(id) => write!(f, "{id}"),
            Self::Terminal => write!(f, "<terminal>"),
        }
    }
}

/// Branch decision over the draft. Must be pure.
pub type Decide = Arc<dyn Fn(&Draft) -> Next + Send + Sync>;

/// How a step picks its successor.
#[derive(Clone)]
pub enum Transition {
    Goto(String),
    Terminal,
    /// `targets` lists every step `decide` may return, so the graph can be
    /// checked when the flow is built.
    Branch { targets: Vec<String>, decide: Decide },
}

impl fmt::Debug for Transition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Goto(id) => write!(f, "Goto({id})"),
            Self::Terminal => write!(f, "Terminal"),
            Self::Branch { targets, .. } => write!(f, "Branch({targets:?})"),
        }
    }
}

/// Immutable descriptor of one wizard step.
#[derive(Debug, Clone)]
pub struct StepDefinition {
    id: String,
    title: String,
    rules: Vec<FieldRule>,
    transition: Transition,
}

impl StepDefinition {
    /// A step that owns no fields and ends the flow until told otherwise.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            rules: Vec::new(),
            transition: Transition::Terminal,
        }
    }

    /// Own a field, validated by `rule`.
    pub fn field(mut self, rule: FieldRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn goto(mut self, next: impl Into<String>) -> Self {
        self.transition = Transition::Goto(next.into());
        self
    }

    pub fn terminal(mut self) -> Self {
        self.transition = Transition::Terminal;
        self
    }

    pub fn branch<I, S>(
        mut self,
        targets: I,
        decide: impl Fn(&Draft) -> Next + Send + Sync + 'static,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.transition = Transition::Branch {
            targets: targets.into_iter().map(Into::into).collect(),
            decide: Arc::new(decide),
        };
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Field names this step collects, in declaration order.
    pub fn owned_fields(&self) -> impl Iterator<Item = &str> {
        self.rules.iter().map(|r| r.field.as_str())
    }

    pub fn owns(&self, field: &str) -> bool {
        self.rules.iter().any(|r| r.field == field)
    }

    pub fn rules(&self) -> &[FieldRule] {
        &self.rules
    }

    pub fn transition(&self) -> &Transition {
        &self.transition
    }

    /// Informational steps own nothing and always pass.
    pub fn is_informational(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn validate(&self, draft: &Draft) -> ValidationResult {
        validate_rules(&self.rules, draft)
    }

    pub fn next(&self, draft: &Draft) -> Next {
        match &self.transition {
            Transition::Goto(id) => Next::Step(id.clone()),
            Transition::Terminal => Next::Terminal,
            Transition::Branch { decide, .. } => decide(draft),
        }
    }

    /// Every step this one may lead to.
    pub fn successors(&self) -> Vec<&str> {
        match &self.transition {
            Transition::Goto(id) => vec![id.as_str()],
            Transition::Terminal => Vec::new(),
            Transition::Branch { targets, .. } => targets.iter().map(String::as_str).collect(),
        }
    }

    /// Whether `next` may legitimately return `next`.
    pub(crate) fn declares(&self, next: &Next) -> bool {
        match (&self.transition, next) {
            (Transition::Goto(id), Next::Step(to)) => id == to,
            (Transition::Terminal, Next::Terminal) => true,
            (Transition::Branch { targets, .. }, Next::Step(to)) => targets.contains(to),
            // A branch may end the flow without naming it as a target.
            (Transition::Branch { .. }, Next::Terminal) => true,
            _ => false,
        }
    }
}
