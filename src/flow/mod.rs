//! Sequential flow engine — step graphs, draft accumulation, validation and
//! the run lifecycle.

pub mod controller;
pub mod definition;
pub mod draft;
pub mod host;
pub mod manager;
pub mod registry;
pub mod run;
pub mod step;
pub mod validation;

pub use controller::{AdvanceError, FlowController};
pub use definition::{FlowDefinition, FlowDefinitionBuilder};
pub use draft::Draft;
pub use host::{AdvanceOutcome, FlowHost, StepView};
pub use manager::FlowManager;
pub use registry::FlowRegistry;
pub use run::{FlowRun, RunStatus};
pub use step::{Next, StepDefinition, Transition};
pub use validation::{Check, FieldRule, ValidationResult};
