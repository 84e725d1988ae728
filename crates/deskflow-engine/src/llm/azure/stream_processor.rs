use serde_json::Value;
use std::collections::HashMap;

use crate::llm::client::{MessagePart, StreamChunk};

/// A capability request assembled from streamed argument fragments.
#[derive(Debug, Clone)]
pub struct AssembledToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

#[derive(Debug, Clone, Default)]
struct PartialToolCall {
    id: Option<String>,
    name: Option<String>,
    arguments: String,
}

/// Accumulates streaming deltas: content passes through chunk by chunk,
/// tool-call arguments are buffered per index until their JSON is complete.
#[derive(Debug, Default)]
pub struct StreamProcessor {
    tool_calls: HashMap<usize, PartialToolCall>,
}

impl StreamProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process one `delta` object from the stream, returning any chunks that
    /// are ready to forward.
    pub fn process_delta(&mut self, delta: &Value) -> Vec<StreamChunk> {
        let mut chunks = Vec::new();

        if let Some(content) = delta.get("content").and_then(|v| v.as_str()) {
            if !content.is_empty() {
                chunks.push(StreamChunk {
                    part: MessagePart::Text {
                        text: content.to_string(),
                    },
                    is_final: false,
                    finish_reason: None,
                });
            }
        }

        if let Some(tool_calls) = delta.get("tool_calls").and_then(|v| v.as_array()) {
            for tool_call in tool_calls {
                let Some(index) = tool_call.get("index").and_then(|v| v.as_u64()) else {
                    continue;
                };
                let partial = self.tool_calls.entry(index as usize).or_default();

                if let Some(id) = tool_call.get("id").and_then(|v| v.as_str()) {
                    partial.id = Some(id.to_string());
                }
                if let Some(function) = tool_call.get("function") {
                    if let Some(name) = function.get("name").and_then(|v| v.as_str()) {
                        partial.name = Some(name.to_string());
                    }
                    if let Some(args) = function.get("arguments").and_then(|v| v.as_str()) {
                        partial.arguments.push_str(args);
                    }
                }
            }
        }

        chunks
    }

    /// Drain tool calls whose accumulated arguments parse as complete JSON.
    pub fn take_completed_tool_calls(&mut self) -> Vec<AssembledToolCall> {
        let mut completed = Vec::new();
        let mut indices: Vec<_> = self.tool_calls.keys().copied().collect();
        indices.sort_unstable();

        for index in indices {
            let Some(partial) = self.tool_calls.get(&index) else {
                continue;
            };
            let (Some(id), Some(name)) = (partial.id.clone(), partial.name.clone()) else {
                continue;
            };
            if partial.arguments.is_empty() {
                continue;
            }
            match serde_json::from_str::<Value>(&partial.arguments) {
                Ok(arguments) => {
                    completed.push(AssembledToolCall {
                        id,
                        name,
                        arguments,
                    });
                    self.tool_calls.remove(&index);
                }
                // Arguments still streaming in; keep accumulating.
                Err(_) => continue,
            }
        }

        completed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn content_deltas_pass_through() {
        let mut processor = StreamProcessor::new();
        let chunks = processor.process_delta(&json!({"content": "Hello"}));
        assert_eq!(chunks.len(), 1);
        assert_eq!(
            chunks[0].part,
            MessagePart::Text {
                text: "Hello".to_string()
            }
        );
    }

    #[test]
    fn empty_content_produces_no_chunk() {
        let mut processor = StreamProcessor::new();
        assert!(processor.process_delta(&json!({"content": ""})).is_empty());
        assert!(processor.process_delta(&json!({"role": "assistant"})).is_empty());
    }

    #[test]
    fn tool_call_arguments_accumulate_across_deltas() {
        let mut processor = StreamProcessor::new();

        processor.process_delta(&json!({
            "tool_calls": [{
                "index": 0,
                "id": "call_7",
                "function": {"name": "get_ticket_templates", "arguments": "{\"category\":"}
            }]
        }));
        assert!(processor.take_completed_tool_calls().is_empty());

        processor.process_delta(&json!({
            "tool_calls": [{
                "index": 0,
                "function": {"arguments": " \"CLOUD\", \"description\": \"new vm\"}"}
            }]
        }));
        let completed = processor.take_completed_tool_calls();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].id, "call_7");
        assert_eq!(completed[0].name, "get_ticket_templates");
        assert_eq!(
            completed[0].arguments,
            json!({"category": "CLOUD", "description": "new vm"})
        );
    }

    #[test]
    fn parallel_tool_calls_complete_in_index_order() {
        let mut processor = StreamProcessor::new();
        processor.process_delta(&json!({
            "tool_calls": [
                {"index": 1, "id": "call_b", "function": {"name": "b", "arguments": "{}"}},
                {"index": 0, "id": "call_a", "function": {"name": "a", "arguments": "{}"}}
            ]
        }));
        let completed = processor.take_completed_tool_calls();
        assert_eq!(completed.len(), 2);
        assert_eq!(completed[0].id, "call_a");
        assert_eq!(completed[1].id, "call_b");
    }
}
