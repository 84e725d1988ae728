use serde::Deserialize;
use std::sync::Arc;

use crate::error::EngineError;
use crate::llm::client::{CompletionOptions, LlmClient, Message, MessagePart, Role};
use crate::orchestration::prompts::INTENT_INSTRUCTIONS;
use crate::orchestration::types::RequestMessage;

/// What the user wants from the current turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    AnswerQuestion,
    CreateTicket,
    GetTicketStatus,
}

impl Intent {
    /// Total parser over the closed label set; anything else is `None` and
    /// routed to the safe fallback by the classifier.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "ANSWER_QUESTION" => Some(Self::AnswerQuestion),
            "CREATE_TICKET" => Some(Self::CreateTicket),
            "GET_TICKET_STATUS" => Some(Self::GetTicketStatus),
            _ => None,
        }
    }

    pub fn as_label(&self) -> &'static str {
        match self {
            Self::AnswerQuestion => "ANSWER_QUESTION",
            Self::CreateTicket => "CREATE_TICKET",
            Self::GetTicketStatus => "GET_TICKET_STATUS",
        }
    }

    /// Whether this intent is served by the tool-calling ticket flow.
    pub fn wants_ticket_flow(&self) -> bool {
        matches!(self, Self::CreateTicket | Self::GetTicketStatus)
    }
}

#[derive(Debug, Deserialize)]
struct IntentPayload {
    intent: String,
}

/// Single-shot intent classifier.
///
/// Classification never fails upward: any error on the way (provider call,
/// malformed JSON, unknown label) falls back to `AnswerQuestion`, which
/// routes to the lower-risk answering path.
pub struct IntentClassifier {
    llm: Arc<dyn LlmClient>,
}

impl IntentClassifier {
    pub fn new(llm: Arc<dyn LlmClient>) -> Self {
        Self { llm }
    }

    pub async fn classify(&self, messages: &[RequestMessage]) -> Intent {
        match self.try_classify(messages).await {
            Ok(intent) => {
                log::debug!("classified intent as {}", intent.as_label());
                intent
            }
            Err(e) => {
                log::error!("intent classification failed, defaulting to ANSWER_QUESTION: {e}");
                Intent::AnswerQuestion
            }
        }
    }

    async fn try_classify(&self, messages: &[RequestMessage]) -> Result<Intent, EngineError> {
        let mut history = vec![Message::system(INTENT_INSTRUCTIONS)];
        for message in messages.iter().filter(|m| !m.is_tool()) {
            history.push(classification_message(message));
        }

        let completion = self
            .llm
            .complete(&history, &[], &CompletionOptions::deterministic())
            .await?;

        let content = completion.message.text();
        let payload: IntentPayload = serde_json::from_str(content.trim())?;
        Intent::from_label(&payload.intent).ok_or_else(|| {
            EngineError::Parse(format!("unrecognized intent label: {}", payload.intent))
        })
    }
}

fn classification_message(message: &RequestMessage) -> Message {
    let role = match message.role.as_str() {
        "system" => Role::System,
        "assistant" => Role::Assistant,
        _ => Role::User,
    };
    let mut converted = Message {
        id: uuid::Uuid::new_v4(),
        role,
        parts: vec![MessagePart::Text {
            text: message.content.clone(),
        }],
        context: None,
    };
    // Assistant turns may carry provider context as a JSON string; attach it
    // parsed when it is valid, drop it otherwise.
    if role == Role::Assistant {
        if let Some(raw) = &message.context {
            match serde_json::from_str(raw) {
                Ok(parsed) => converted.context = Some(parsed),
                Err(e) => log::warn!("ignoring unparseable assistant context: {e}"),
            }
        }
    }
    converted
}
