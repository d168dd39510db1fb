//! Become-a-pro onboarding: three informational screens, nothing collected.

use crate::error::FlowDefinitionError;
use crate::flow::{FlowDefinition, StepDefinition};

pub const FLOW_ID: &str = "BecomeAPro";

pub mod steps {
    pub const WELCOME: &str = "Welcome";
    pub const HOW_IT_WORKS: &str = "HowItWorks";
    pub const GET_STARTED: &str = "GetStarted";
}

pub fn definition() -> Result<FlowDefinition, FlowDefinitionError> {
    use steps::*;

    FlowDefinition::builder(FLOW_ID)
        .step(StepDefinition::new(WELCOME, "Earn money doing what you love").goto(HOW_IT_WORKS))
        .step(StepDefinition::new(HOW_IT_WORKS, "How it works").goto(GET_STARTED))
        .step(StepDefinition::new(GET_STARTED, "Let's get started").terminal())
        .build()
}
