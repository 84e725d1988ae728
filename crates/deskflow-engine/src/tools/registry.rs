use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::EngineError;
use crate::llm::client::ToolDefinition;
use crate::tools::types::BoxedTool;

/// Explicit registry mapping capability name to implementation.
///
/// Populated once when a session is wired up; declarations handed to the
/// model are built from here and stay stable for the registry's lifetime.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Arc<RwLock<HashMap<String, BoxedTool>>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Registering two tools under one name is an error.
    pub async fn register(&self, tool: BoxedTool) -> Result<(), EngineError> {
        let name = tool.definition().name;
        let mut tools = self.tools.write().await;
        if tools.contains_key(&name) {
            return Err(EngineError::Tool(format!(
                "tool '{name}' is already registered"
            )));
        }
        tools.insert(name, tool);
        Ok(())
    }

    pub async fn get(&self, name: &str) -> Option<BoxedTool> {
        self.tools.read().await.get(name).cloned()
    }

    /// All declarations, sorted by name so the set handed to the provider is
    /// identical across requests.
    pub async fn definitions(&self) -> Vec<ToolDefinition> {
        let tools = self.tools.read().await;
        let mut definitions: Vec<ToolDefinition> =
            tools.values().map(|tool| tool.definition()).collect();
        definitions.sort_by(|a, b| a.name.cmp(&b.name));
        definitions
    }

    pub async fn has_tool(&self, name: &str) -> bool {
        self.tools.read().await.contains_key(name)
    }

    pub async fn count(&self) -> usize {
        self.tools.read().await.len()
    }
}
