use futures_util::Stream;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::pin::Pin;

use crate::error::EngineError;

/// One message as received from the transport layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestMessage {
    pub role: String,
    pub content: String,
    /// Provider context serialized as a JSON string, when present on
    /// assistant turns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

impl RequestMessage {
    pub fn new(role: &str, content: &str) -> Self {
        Self {
            role: role.to_string(),
            content: content.to_string(),
            context: None,
        }
    }

    pub fn is_tool(&self) -> bool {
        self.role == "tool"
    }
}

/// The inbound chat request body the engine reads.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ChatRequest {
    #[serde(default)]
    pub messages: Vec<RequestMessage>,
    /// Opaque caller bookkeeping, echoed on every response fragment.
    #[serde(default)]
    pub history_metadata: Map<String, Value>,
}

/// The assistant-authored delta inside one response fragment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FragmentDelta {
    pub role: String,
    pub content: String,
}

/// One incremental unit of the streamed reply.
///
/// `history_metadata` is copied verbatim from the request on every fragment
/// of a reply; `end_turn` is null until the terminal fragment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResponseFragment {
    pub delta: FragmentDelta,
    pub history_metadata: Map<String, Value>,
    pub end_turn: Option<bool>,
}

impl ResponseFragment {
    pub fn assistant(content: impl Into<String>, history_metadata: Map<String, Value>) -> Self {
        Self {
            delta: FragmentDelta {
                role: "assistant".to_string(),
                content: content.into(),
            },
            history_metadata,
            end_turn: None,
        }
    }

    pub fn end_of_turn(history_metadata: Map<String, Value>) -> Self {
        Self {
            delta: FragmentDelta {
                role: "assistant".to_string(),
                content: String::new(),
            },
            history_metadata,
            end_turn: Some(true),
        }
    }
}

/// Lazily produced reply: single-pass, forward-only, not restartable.
pub type FragmentStream =
    Pin<Box<dyn Stream<Item = Result<ResponseFragment, EngineError>> + Send>>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn fragment_serializes_wire_shape() {
        let mut metadata = Map::new();
        metadata.insert("conversation_id".to_string(), json!("c-1"));
        let fragment = ResponseFragment::assistant("Hello", metadata);
        let raw = serde_json::to_value(&fragment).unwrap();
        assert_eq!(raw["delta"]["role"], "assistant");
        assert_eq!(raw["delta"]["content"], "Hello");
        assert_eq!(raw["history_metadata"]["conversation_id"], "c-1");
        assert_eq!(raw["end_turn"], Value::Null);
    }

    #[test]
    fn end_of_turn_marks_end() {
        let fragment = ResponseFragment::end_of_turn(Map::new());
        assert_eq!(fragment.end_turn, Some(true));
        assert!(fragment.delta.content.is_empty());
    }

    #[test]
    fn request_deserializes_with_defaults() {
        let request: ChatRequest =
            serde_json::from_str(r#"{"messages": [{"role": "user", "content": "hi"}]}"#).unwrap();
        assert_eq!(request.messages.len(), 1);
        assert!(request.history_metadata.is_empty());
        assert!(!request.messages[0].is_tool());
    }

    #[test]
    fn tool_role_is_detected() {
        let message = RequestMessage::new("tool", "{}");
        assert!(message.is_tool());
    }
}
