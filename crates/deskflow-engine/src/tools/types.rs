use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::error::EngineError;
use crate::llm::client::ToolDefinition;

/// The outcome of executing a capability.
///
/// Execution failures are data handed back to the model, not raised errors;
/// the conversation decides how to proceed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum ToolResult {
    Success(Value),
    Error { error: String },
}

impl ToolResult {
    pub fn success(value: Value) -> Self {
        Self::Success(value)
    }

    pub fn success_from<T: Serialize>(value: &T) -> Result<Self, EngineError> {
        Ok(Self::Success(serde_json::to_value(value).map_err(|e| {
            EngineError::Tool(format!("failed to serialize tool result: {e}"))
        })?))
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            error: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Success(value) => value.clone(),
            Self::Error { error } => json!({ "error": error }),
        }
    }
}

/// A capability the model may invoke by name during generation.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Declaration handed to the model: stable name, description, parameter
    /// schema.
    fn definition(&self) -> ToolDefinition;

    /// Execute with the model-supplied parameters.
    async fn execute(&self, parameters: Value) -> Result<ToolResult, EngineError>;
}

pub type BoxedTool = Arc<dyn Tool>;
