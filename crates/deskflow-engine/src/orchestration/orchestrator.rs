use async_trait::async_trait;
use std::sync::Arc;

use deskflow_search::{HttpIndexClient, KnowledgeSearcher};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::llm::azure::AzureOpenAiClient;
use crate::llm::client::LlmClient;
use crate::orchestration::intent::IntentClassifier;
use crate::orchestration::prompts::ticket_flow_instructions;
use crate::orchestration::session::ChatSession;
use crate::orchestration::types::{ChatRequest, FragmentStream};
use crate::tools::{
    CreateTicketTool, HttpTicketClient, SearchKnowledgeTool, TicketTemplatesTool, ToolRegistry,
};

/// Session identifier for the ticket-oriented flow.
const TICKET_FLOW_ID: &str = "helpdesk-assistant";

/// The direct-answer path: provider-side retrieval-augmented generation,
/// owned by the transport layer. The orchestrator delegates to it untouched
/// for question-answering turns.
#[async_trait]
pub trait AnswerFlow: Send + Sync {
    async fn answer(&self, request: &ChatRequest) -> Result<FragmentStream, EngineError>;
}

/// Top-level routing policy: classify the turn, then hand it to either the
/// tool-calling ticket flow or the direct-answer path.
///
/// The two strategies stay separate because the provider's retrieval-augmented
/// mode and client-driven tool calling are mutually exclusive within one
/// request, so the intent has to be resolved before a strategy is picked.
pub struct Orchestrator {
    classifier: IntentClassifier,
    llm: Arc<dyn LlmClient>,
    tools: Arc<ToolRegistry>,
    answer_flow: Arc<dyn AnswerFlow>,
    ticket_instruction: String,
    max_tool_rounds: usize,
}

impl Orchestrator {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        tools: Arc<ToolRegistry>,
        answer_flow: Arc<dyn AnswerFlow>,
        ticket_instruction: String,
        max_tool_rounds: usize,
    ) -> Self {
        Self {
            classifier: IntentClassifier::new(llm.clone()),
            llm,
            tools,
            answer_flow,
            ticket_instruction,
            max_tool_rounds,
        }
    }

    /// Wire up the full engine from configuration: provider client,
    /// retrieval, and the three-capability registry.
    pub async fn from_config(
        config: &EngineConfig,
        answer_flow: Arc<dyn AnswerFlow>,
    ) -> Result<Self, EngineError> {
        config.search.validate()?;
        let llm: Arc<dyn LlmClient> =
            Arc::new(AzureOpenAiClient::new(config.azure_openai.clone())?);

        let index_client = Arc::new(HttpIndexClient::new(
            config.search.endpoint.clone(),
            config.search.api_key.clone(),
            config.search.api_version.clone(),
        ));
        let searcher = Arc::new(KnowledgeSearcher::new(index_client, config.search.clone()));
        let ticket_client = Arc::new(HttpTicketClient::new(config.ticketing.clone())?);

        let tools = Arc::new(ToolRegistry::new());
        tools
            .register(Arc::new(SearchKnowledgeTool::new(
                searcher.clone(),
                config.minimum_search_score,
                config.minimum_reranker_score,
            )))
            .await?;
        tools
            .register(Arc::new(TicketTemplatesTool::new(
                searcher,
                config.minimum_search_score,
                config.minimum_reranker_score,
            )))
            .await?;
        tools
            .register(Arc::new(CreateTicketTool::new(ticket_client)))
            .await?;

        let ticket_instruction = config
            .ticket_system_instruction
            .clone()
            .unwrap_or_else(|| ticket_flow_instructions(&config.allowed_categories));

        Ok(Self::new(
            llm,
            tools,
            answer_flow,
            ticket_instruction,
            config.max_tool_rounds,
        ))
    }

    /// Route one request to a response strategy and return its fragment
    /// stream. Failures of either path are logged with the resolved intent
    /// and propagated; recovery is the paths' own responsibility.
    pub async fn route(&self, request: &ChatRequest) -> Result<FragmentStream, EngineError> {
        let intent = self.classifier.classify(&request.messages).await;
        log::info!("routing request with intent {}", intent.as_label());

        let result = if intent.wants_ticket_flow() {
            let session = ChatSession::new(
                TICKET_FLOW_ID,
                self.llm.clone(),
                self.tools.clone(),
                self.ticket_instruction.clone(),
                self.max_tool_rounds,
            );
            session.invoke(request)
        } else {
            self.answer_flow.answer(request).await
        };

        result.map_err(|e| {
            log::error!(
                "chat routing failed (intent {}): {e}",
                intent.as_label()
            );
            e
        })
    }
}
