use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use strum::IntoEnumIterator;
use thiserror::Error;

use super::{HostTool, ToolId};
use crate::models::tool::Tool;

#[derive(Error, Debug, PartialEq)]
pub enum CatalogError {
    #[error("No implementation registered for tool {0}")]
    MissingImplementation(ToolId),

    #[error("Tool {id} is registered with schema name {name}")]
    NameMismatch { id: ToolId, name: String },
}

/// The fixed set of tools offered to the model, in declaration order
pub struct ToolCatalog {
    entries: Vec<(ToolId, Arc<dyn HostTool>)>,
}

impl ToolCatalog {
    pub fn builder() -> ToolCatalogBuilder {
        ToolCatalogBuilder::default()
    }

    /// Schemas for every tool
    pub fn describe_all(&self) -> Vec<Tool> {
        self.entries
            .iter()
            .map(|(_, tool)| tool.tool().clone())
            .collect()
    }

    /// Find the implementation for a model-supplied name
    pub fn resolve(&self, name: &str) -> Option<Arc<dyn HostTool>> {
        let id = ToolId::from_str(name).ok()?;
        self.entries
            .iter()
            .find(|(entry, _)| *entry == id)
            .map(|(_, tool)| Arc::clone(tool))
    }
}

#[derive(Default)]
pub struct ToolCatalogBuilder {
    registered: HashMap<ToolId, Arc<dyn HostTool>>,
}

impl ToolCatalogBuilder {
    /// Registering an id twice keeps the last implementation
    pub fn register(mut self, id: ToolId, tool: Arc<dyn HostTool>) -> Self {
        self.registered.insert(id, tool);
        self
    }

    /// Fails unless every [`ToolId`] has an implementation advertising its name
    pub fn build(mut self) -> Result<ToolCatalog, CatalogError> {
        let mut entries = Vec::new();
        for id in ToolId::iter() {
            let tool = self
                .registered
                .remove(&id)
                .ok_or(CatalogError::MissingImplementation(id))?;
            if tool.tool().name != id.as_ref() {
                return Err(CatalogError::NameMismatch {
                    id,
                    name: tool.tool().name.clone(),
                });
            }
            entries.push((id, tool));
        }
        Ok(ToolCatalog { entries })
    }
}
