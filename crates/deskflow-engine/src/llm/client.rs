use async_trait::async_trait;
use futures_util::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::pin::Pin;
use uuid::Uuid;

use crate::error::EngineError;

/// Role of a message author in the conversation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Role {
    #[serde(rename = "system")]
    System,
    #[serde(rename = "user")]
    User,
    #[serde(rename = "assistant")]
    Assistant,
    #[serde(rename = "tool")]
    Tool,
}

/// One piece of a message: plain text, a capability request from the model,
/// or a host-produced capability result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
pub enum MessagePart {
    #[serde(rename = "text")]
    Text { text: String },

    #[serde(rename = "tool_call")]
    ToolCall {
        tool_call_id: String,
        name: String,
        parameters: Value,
    },

    #[serde(rename = "tool_result")]
    ToolResult {
        tool_call_id: String,
        name: String,
        result: Value,
    },
}

/// A message in the conversation history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,

    pub role: Role,

    pub parts: Vec<MessagePart>,

    /// Provider-attached context carried on assistant turns (citations and
    /// similar); forwarded verbatim when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Value>,
}

impl Message {
    pub fn system(text: impl Into<String>) -> Self {
        Self::with_text(Role::System, text)
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::with_text(Role::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::with_text(Role::Assistant, text)
    }

    pub fn tool_result(tool_call_id: impl Into<String>, name: impl Into<String>, result: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::Tool,
            parts: vec![MessagePart::ToolResult {
                tool_call_id: tool_call_id.into(),
                name: name.into(),
                result,
            }],
            context: None,
        }
    }

    fn with_text(role: Role, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role,
            parts: vec![MessagePart::Text { text: text.into() }],
            context: None,
        }
    }

    /// Concatenated text parts of this message.
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| match part {
                MessagePart::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Declaration of a capability the model may invoke by name.
///
/// This is part of the wire contract with the provider; for one session the
/// declarations handed over must not change between requests.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON Schema for the parameters.
    pub parameters: Value,
}

/// Whether the model is allowed to request capability invocations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ToolChoice {
    /// The model decides when to invoke a capability.
    Auto,
    /// No capability invocation; plain completion.
    #[default]
    None,
}

/// Per-call generation options.
#[derive(Debug, Clone, Default)]
pub struct CompletionOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub tool_choice: ToolChoice,
}

impl CompletionOptions {
    /// Options for deterministic single-shot calls such as classification.
    pub fn deterministic() -> Self {
        Self {
            temperature: Some(0.0),
            ..Self::default()
        }
    }

    /// Options for a tool-calling conversation turn.
    pub fn with_tools() -> Self {
        Self {
            tool_choice: ToolChoice::Auto,
            ..Self::default()
        }
    }
}

/// A chunk from a streaming completion.
#[derive(Debug, Clone)]
pub struct StreamChunk {
    pub part: MessagePart,
    pub is_final: bool,
    pub finish_reason: Option<String>,
}

/// A complete (non-streaming) model response.
#[derive(Debug, Clone)]
pub struct Completion {
    pub message: Message,
    /// Capability requests as `(id, name, parameters)`.
    pub tool_calls: Vec<(String, String, Value)>,
}

pub type CompletionStream =
    Pin<Box<dyn Stream<Item = Result<StreamChunk, EngineError>> + Send>>;

/// Contract between the engine and the language-model provider.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate a complete response.
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        options: &CompletionOptions,
    ) -> Result<Completion, EngineError>;

    /// Generate a streaming response. Dropping the returned stream must
    /// release the underlying provider call.
    async fn complete_stream(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        options: &CompletionOptions,
    ) -> Result<CompletionStream, EngineError>;
}
