//! The marketplace's wizards, built on the flow engine.

pub mod become_pro;
pub mod datasets;
pub mod listing;
pub mod verification;

use crate::error::FlowDefinitionError;
use crate::flow::FlowRegistry;

/// Registry holding every wizard the app ships.
pub fn default_registry() -> Result<FlowRegistry, FlowDefinitionError> {
    FlowRegistry::new()
        .with(listing::definition()?)?
        .with(verification::definition()?)?
        .with(become_pro::definition()?)
}
