use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use crate::config::TicketingSettings;
use crate::error::EngineError;
use crate::llm::client::ToolDefinition;
use crate::tools::types::{Tool, ToolResult};

/// Receipt returned by the ticketing system for one submission.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TicketReceipt {
    #[serde(default)]
    pub ticket_id: Option<u64>,
    pub status: String,
}

/// Contract with the ticketing system. Each call creates a new ticket; there
/// is no idempotency key, so retried submissions open duplicate tickets.
#[async_trait]
pub trait TicketSubmitter: Send + Sync {
    async fn create_ticket(
        &self,
        template_name: &str,
        detailed_description: &str,
    ) -> Result<TicketReceipt, EngineError>;
}

/// REST client for the ticketing system proxy.
pub struct HttpTicketClient {
    settings: TicketingSettings,
    http: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct TicketPayload<'a> {
    template_name: &'a str,
    detailed_description: &'a str,
}

impl HttpTicketClient {
    pub fn new(settings: TicketingSettings) -> Result<Self, EngineError> {
        if settings.endpoint.is_empty() {
            return Err(EngineError::Config(
                "ticketing endpoint is required".to_string(),
            ));
        }
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .map_err(|e| EngineError::Config(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { settings, http })
    }
}

#[async_trait]
impl TicketSubmitter for HttpTicketClient {
    async fn create_ticket(
        &self,
        template_name: &str,
        detailed_description: &str,
    ) -> Result<TicketReceipt, EngineError> {
        let url = format!(
            "{}/tickets",
            self.settings.endpoint.trim_end_matches('/')
        );
        let payload = TicketPayload {
            template_name,
            detailed_description,
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.settings.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| EngineError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(EngineError::Network(format!(
                "ticketing system returned {status}: {body}"
            )));
        }

        response
            .json::<TicketReceipt>()
            .await
            .map_err(|e| EngineError::Parse(format!("bad ticketing response: {e}")))
    }
}

#[derive(Debug, Deserialize)]
struct CreateTicketArgs {
    template_name: String,
    detailed_description: String,
}

/// Ticket submission exposed to the model.
///
/// Passes `template_name` and the completed `detailed_description` through
/// untouched. Transport failures come back as a `status: "error"` payload so
/// the conversation can continue.
pub struct CreateTicketTool {
    submitter: Arc<dyn TicketSubmitter>,
}

impl CreateTicketTool {
    pub fn new(submitter: Arc<dyn TicketSubmitter>) -> Self {
        Self { submitter }
    }
}

#[async_trait]
impl Tool for CreateTicketTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "create_ticket".to_string(),
            description: "Creates a support ticket from a template once all required fields \
                          have been collected from the user and confirmed."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "template_name": {
                        "type": "string",
                        "description": "Exact name of the ticket template to use, as returned by get_ticket_templates."
                    },
                    "detailed_description": {
                        "type": "string",
                        "description": "The template's detailed description with every placeholder field filled in; the surrounding structure must be kept intact."
                    }
                },
                "required": ["template_name", "detailed_description"]
            }),
        }
    }

    async fn execute(&self, parameters: Value) -> Result<ToolResult, EngineError> {
        let args: CreateTicketArgs = serde_json::from_value(parameters)
            .map_err(|e| EngineError::Tool(format!("bad ticket arguments: {e}")))?;
        log::info!("creating ticket from template: {}", args.template_name);

        match self
            .submitter
            .create_ticket(&args.template_name, &args.detailed_description)
            .await
        {
            Ok(receipt) => ToolResult::success_from(&receipt),
            Err(e) => {
                log::error!("ticket submission failed: {e}");
                Ok(ToolResult::success(json!({ "status": "error" })))
            }
        }
    }
}
