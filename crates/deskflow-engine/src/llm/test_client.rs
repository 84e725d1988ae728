use async_trait::async_trait;
use futures_util::stream;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::error::EngineError;
use crate::llm::client::{
    Completion, CompletionOptions, CompletionStream, LlmClient, Message, MessagePart,
    StreamChunk, ToolChoice, ToolDefinition,
};

/// One scripted model turn for tests.
#[derive(Debug, Clone, Default)]
pub struct ScriptedTurn {
    pub text_chunks: Vec<String>,
    /// Capability requests as `(id, name, parameters)`.
    pub tool_calls: Vec<(String, String, Value)>,
}

impl ScriptedTurn {
    pub fn text(chunks: &[&str]) -> Self {
        Self {
            text_chunks: chunks.iter().map(|s| s.to_string()).collect(),
            tool_calls: Vec::new(),
        }
    }

    pub fn tool_call(id: &str, name: &str, parameters: Value) -> Self {
        Self {
            text_chunks: Vec::new(),
            tool_calls: vec![(id.to_string(), name.to_string(), parameters)],
        }
    }
}

/// What a test observed about one provider call.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub messages: Vec<Message>,
    pub tool_names: Vec<String>,
    pub temperature: Option<f32>,
    pub tool_choice: ToolChoice,
    pub streaming: bool,
}

/// Scripted provider that replays canned turns and records every call.
#[derive(Clone, Default)]
pub struct TestLlmClient {
    turns: Arc<Mutex<VecDeque<ScriptedTurn>>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    fail_with: Arc<Mutex<Option<String>>>,
}

impl TestLlmClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_turns(turns: Vec<ScriptedTurn>) -> Self {
        Self {
            turns: Arc::new(Mutex::new(turns.into())),
            ..Self::default()
        }
    }

    /// Every call fails with the given message.
    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Arc::new(Mutex::new(Some(message.to_string()))),
            ..Self::default()
        }
    }

    pub fn recorded_calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        options: &CompletionOptions,
        streaming: bool,
    ) {
        self.calls.lock().unwrap().push(RecordedCall {
            messages: messages.to_vec(),
            tool_names: tools.iter().map(|t| t.name.clone()).collect(),
            temperature: options.temperature,
            tool_choice: options.tool_choice,
            streaming,
        });
    }

    fn next_turn(&self) -> ScriptedTurn {
        self.turns
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| ScriptedTurn::text(&["I understand."]))
    }

    fn failure(&self) -> Option<EngineError> {
        self.fail_with
            .lock()
            .unwrap()
            .as_ref()
            .map(|m| EngineError::Llm(m.clone()))
    }
}

#[async_trait]
impl LlmClient for TestLlmClient {
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        options: &CompletionOptions,
    ) -> Result<Completion, EngineError> {
        self.record(messages, tools, options, false);
        if let Some(err) = self.failure() {
            return Err(err);
        }

        let turn = self.next_turn();
        Ok(Completion {
            message: Message::assistant(turn.text_chunks.join("")),
            tool_calls: turn.tool_calls,
        })
    }

    async fn complete_stream(
        &self,
        messages: &[Message],
        tools: &[ToolDefinition],
        options: &CompletionOptions,
    ) -> Result<CompletionStream, EngineError> {
        self.record(messages, tools, options, true);
        if let Some(err) = self.failure() {
            return Err(err);
        }

        let turn = self.next_turn();
        let mut chunks: Vec<Result<StreamChunk, EngineError>> = Vec::new();
        for text in turn.text_chunks {
            chunks.push(Ok(StreamChunk {
                part: MessagePart::Text { text },
                is_final: false,
                finish_reason: None,
            }));
        }
        let had_tool_calls = !turn.tool_calls.is_empty();
        for (id, name, parameters) in turn.tool_calls {
            chunks.push(Ok(StreamChunk {
                part: MessagePart::ToolCall {
                    tool_call_id: id,
                    name,
                    parameters,
                },
                is_final: false,
                finish_reason: None,
            }));
        }
        chunks.push(Ok(StreamChunk {
            part: MessagePart::Text {
                text: String::new(),
            },
            is_final: true,
            finish_reason: Some(if had_tool_calls {
                "tool_calls".to_string()
            } else {
                "stop".to_string()
            }),
        }));

        Ok(Box::pin(stream::iter(chunks)))
    }
}
