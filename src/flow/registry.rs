//! Flow registry — the set of wizards a host can start, keyed by flow id.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{FlowDefinitionError, FlowError};

use super::definition::FlowDefinition;

/// Immutable once handed to a manager; definitions are shared by all runs.
#[derive(Debug, Clone, Default)]
pub struct FlowRegistry {
    flows: BTreeMap<String, Arc<FlowDefinition>>,
}

impl FlowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, flow: FlowDefinition) -> Result<(), FlowDefinitionError> {
        let id = flow.id().to_string();
        if self.flows.contains_key(&id) {
            return Err(FlowDefinitionError::DuplicateFlow { flow: id });
        }
        self.flows.insert(id, Arc::new(flow));
        Ok(())
    }

    /// Builder-style `register`.
    pub fn with(mut self, flow: FlowDefinition) -> Result<Self, FlowDefinitionError> {
        self.register(flow)?;
        Ok(self)
    }

    pub fn get(&self, flow_id: &str) -> Result<Arc<FlowDefinition>, FlowError> {
        self.flows
            .get(flow_id)
            .cloned()
            .ok_or_else(|| FlowError::UnknownFlow(flow_id.to_string()))
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.flows.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }
}
