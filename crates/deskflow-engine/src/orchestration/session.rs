use async_stream::try_stream;
use futures_util::StreamExt;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::EngineError;
use crate::llm::client::{CompletionOptions, LlmClient, Message, MessagePart, Role};
use crate::orchestration::types::{ChatRequest, FragmentStream, ResponseFragment};
use crate::tools::types::ToolResult;
use crate::tools::ToolRegistry;

/// A capability request collected from the model stream, awaiting execution.
#[derive(Debug, Clone)]
struct PendingToolCall {
    id: String,
    name: String,
    parameters: Value,
}

/// Where one turn of the tool-calling conversation stands.
///
/// Transitions are driven by the shape of the model response: a turn that
/// requested capabilities goes through `ExecutingTools` and back to
/// `AwaitingModel`; a turn with no requests ends the loop.
enum SessionState {
    AwaitingModel,
    ExecutingTools(Vec<PendingToolCall>),
    Done,
}

/// A tool-calling conversation bound to a fixed set of capabilities.
///
/// `invoke` produces a single-pass stream of assistant fragments; dropping
/// the stream cancels the in-flight provider call.
pub struct ChatSession {
    session_id: String,
    llm: Arc<dyn LlmClient>,
    tools: Arc<ToolRegistry>,
    system_instruction: String,
    max_tool_rounds: usize,
}

impl ChatSession {
    pub fn new(
        session_id: impl Into<String>,
        llm: Arc<dyn LlmClient>,
        tools: Arc<ToolRegistry>,
        system_instruction: impl Into<String>,
        max_tool_rounds: usize,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            llm,
            tools,
            system_instruction: system_instruction.into(),
            max_tool_rounds,
        }
    }

    /// Run one conversation turn against the request.
    ///
    /// Validates the request before any model call; the returned stream
    /// yields only assistant-authored fragments with non-empty content, each
    /// carrying the request's `history_metadata` verbatim. Capability
    /// round-trips happen inside the loop and never surface as fragments.
    pub fn invoke(&self, request: &ChatRequest) -> Result<FragmentStream, EngineError> {
        let initial_history = build_history(&self.system_instruction, request)?;
        let metadata = request.history_metadata.clone();
        let llm = self.llm.clone();
        let tools = self.tools.clone();
        let max_rounds = self.max_tool_rounds;
        let session_id = self.session_id.clone();

        let stream = try_stream! {
            let definitions = tools.definitions().await;
            let options = CompletionOptions::with_tools();
            let mut history = initial_history;
            let mut state = SessionState::AwaitingModel;
            let mut rounds = 0usize;

            loop {
                match state {
                    SessionState::AwaitingModel => {
                        rounds += 1;
                        check_round_budget(rounds, max_rounds)?;
                        log::debug!("[{session_id}] requesting completion, round {rounds}");

                        let mut chunks = llm
                            .complete_stream(&history, &definitions, &options)
                            .await?;
                        let mut calls: Vec<PendingToolCall> = Vec::new();
                        let mut reply = String::new();

                        while let Some(chunk) = chunks.next().await {
                            let chunk = chunk?;
                            match chunk.part {
                                MessagePart::Text { text } => {
                                    if !text.is_empty() {
                                        reply.push_str(&text);
                                        yield ResponseFragment::assistant(text, metadata.clone());
                                    }
                                }
                                MessagePart::ToolCall {
                                    tool_call_id,
                                    name,
                                    parameters,
                                } => {
                                    calls.push(PendingToolCall {
                                        id: tool_call_id,
                                        name,
                                        parameters,
                                    });
                                }
                                // Tool results originate host-side; one coming
                                // from the provider is ignored.
                                MessagePart::ToolResult { .. } => {}
                            }
                        }
                        drop(chunks);

                        let mut parts = Vec::new();
                        if !reply.is_empty() {
                            parts.push(MessagePart::Text { text: reply });
                        }
                        for call in &calls {
                            parts.push(MessagePart::ToolCall {
                                tool_call_id: call.id.clone(),
                                name: call.name.clone(),
                                parameters: call.parameters.clone(),
                            });
                        }
                        if !parts.is_empty() {
                            history.push(Message {
                                id: Uuid::new_v4(),
                                role: Role::Assistant,
                                parts,
                                context: None,
                            });
                        }

                        state = if calls.is_empty() {
                            SessionState::Done
                        } else {
                            SessionState::ExecutingTools(calls)
                        };
                    }
                    SessionState::ExecutingTools(calls) => {
                        // Strictly sequential: a later request may depend on
                        // an earlier result.
                        for call in calls {
                            log::info!("[{session_id}] executing tool {}", call.name);
                            let result = execute_tool(&tools, &call).await;
                            history.push(Message::tool_result(
                                call.id,
                                call.name,
                                result.to_json(),
                            ));
                        }
                        state = SessionState::AwaitingModel;
                    }
                    SessionState::Done => break,
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

/// A model that keeps requesting capabilities indefinitely would otherwise
/// loop forever; cap the number of model rounds per turn.
fn check_round_budget(rounds: usize, max_rounds: usize) -> Result<(), EngineError> {
    if rounds > max_rounds {
        return Err(EngineError::ToolLoopLimit(max_rounds));
    }
    Ok(())
}

async fn execute_tool(tools: &ToolRegistry, call: &PendingToolCall) -> ToolResult {
    match tools.get(&call.name).await {
        Some(tool) => match tool.execute(call.parameters.clone()).await {
            Ok(result) => result,
            Err(e) => {
                log::warn!("tool '{}' failed: {e}", call.name);
                ToolResult::error(e.to_string())
            }
        },
        None => {
            log::warn!("model requested unknown tool '{}'", call.name);
            ToolResult::error(format!("unknown tool: {}", call.name))
        }
    }
}

/// Rebuild the conversation history for this turn: flow instruction first,
/// then every prior non-tool message. The request must end with a user turn.
fn build_history(
    system_instruction: &str,
    request: &ChatRequest,
) -> Result<Vec<Message>, EngineError> {
    let filtered: Vec<_> = request.messages.iter().filter(|m| !m.is_tool()).collect();
    let ends_with_user = filtered.last().map(|m| m.role == "user").unwrap_or(false);
    if !ends_with_user {
        return Err(EngineError::EmptyRequest);
    }

    let mut history = vec![Message::system(system_instruction)];
    for message in filtered {
        match message.role.as_str() {
            "assistant" => history.push(Message::assistant(&message.content)),
            "user" => history.push(Message::user(&message.content)),
            // The flow instruction replaces any inbound system text.
            _ => {}
        }
    }
    Ok(history)
}
