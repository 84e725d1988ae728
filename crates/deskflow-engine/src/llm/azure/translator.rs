use serde_json::Value;
use uuid::Uuid;

use super::types::*;
use crate::llm::client::{Message, MessagePart, Role, ToolDefinition};

/// Conversions between engine messages and the chat-completions wire shapes.
pub struct WireTranslator;

impl WireTranslator {
    pub fn tool_to_wire(tool: &ToolDefinition) -> ApiTool {
        ApiTool {
            tool_type: "function".to_string(),
            function: ApiFunction {
                name: tool.name.clone(),
                description: tool.description.clone(),
                parameters: tool.parameters.clone(),
            },
        }
    }

    pub fn messages_to_wire(messages: &[Message]) -> Vec<ApiMessage> {
        messages.iter().flat_map(Self::message_to_wire).collect()
    }

    /// A single engine message can fan out into several wire messages: the
    /// main text/tool-call message plus one `tool` message per result part.
    fn message_to_wire(message: &Message) -> Vec<ApiMessage> {
        let role = match message.role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        };

        let mut wire = Vec::new();

        let text_parts: Vec<String> = message
            .parts
            .iter()
            .filter_map(|part| match part {
                MessagePart::Text { text } => Some(text.clone()),
                _ => None,
            })
            .collect();

        let tool_calls: Vec<ApiToolCall> = message
            .parts
            .iter()
            .filter_map(|part| match part {
                MessagePart::ToolCall {
                    tool_call_id,
                    name,
                    parameters,
                } => Some(ApiToolCall {
                    id: tool_call_id.clone(),
                    tool_type: "function".to_string(),
                    function: ApiFunctionCall {
                        name: name.clone(),
                        arguments: serde_json::to_string(parameters).unwrap_or_default(),
                    },
                }),
                _ => None,
            })
            .collect();

        if !text_parts.is_empty() || !tool_calls.is_empty() {
            wire.push(ApiMessage {
                role: role.to_string(),
                content: if text_parts.is_empty() {
                    None
                } else {
                    Some(text_parts.join("\n"))
                },
                tool_calls: if tool_calls.is_empty() {
                    None
                } else {
                    Some(tool_calls)
                },
                tool_call_id: None,
                name: None,
                context: message.context.clone(),
            });
        }

        for part in &message.parts {
            if let MessagePart::ToolResult {
                tool_call_id,
                name,
                result,
            } = part
            {
                wire.push(ApiMessage {
                    role: "tool".to_string(),
                    content: Some(serde_json::to_string(result).unwrap_or_default()),
                    tool_calls: None,
                    tool_call_id: Some(tool_call_id.clone()),
                    name: Some(name.clone()),
                    context: None,
                });
            }
        }

        wire
    }

    pub fn wire_to_message(wire: &ApiMessage) -> Message {
        let role = match wire.role.as_str() {
            "system" => Role::System,
            "assistant" => Role::Assistant,
            "tool" | "function" => Role::Tool,
            _ => Role::User,
        };

        let mut parts = Vec::new();

        if let Some(content) = &wire.content {
            if !content.is_empty() {
                parts.push(MessagePart::Text {
                    text: content.clone(),
                });
            }
        }

        if let Some(tool_calls) = &wire.tool_calls {
            for call in tool_calls {
                let parameters: Value = serde_json::from_str(&call.function.arguments)
                    .unwrap_or_else(|_| Value::Object(serde_json::Map::new()));
                parts.push(MessagePart::ToolCall {
                    tool_call_id: call.id.clone(),
                    name: call.function.name.clone(),
                    parameters,
                });
            }
        }

        Message {
            id: Uuid::new_v4(),
            role,
            parts,
            context: wire.context.clone(),
        }
    }
}
