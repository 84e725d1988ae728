use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use deskflow_search::{KnowledgeSearcher, TicketTemplate};

use crate::error::EngineError;
use crate::llm::client::ToolDefinition;
use crate::tools::types::{Tool, ToolResult};

#[derive(Debug, Deserialize)]
struct TemplateArgs {
    category: String,
    description: String,
}

/// Ticket-template lookup exposed to the model.
///
/// Returns zero, one or many qualifying templates; choosing among them (or
/// asking the user to) is the model's responsibility.
pub struct TicketTemplatesTool {
    searcher: Arc<KnowledgeSearcher>,
    minimum_search_score: f32,
    minimum_reranker_score: f32,
}

impl TicketTemplatesTool {
    pub fn new(
        searcher: Arc<KnowledgeSearcher>,
        minimum_search_score: f32,
        minimum_reranker_score: f32,
    ) -> Self {
        Self {
            searcher,
            minimum_search_score,
            minimum_reranker_score,
        }
    }

    fn qualify(&self, templates: Vec<TicketTemplate>) -> Vec<TicketTemplate> {
        templates
            .into_iter()
            .filter(|template| {
                template.relevance() >= self.minimum_search_score
                    && template.reranker() >= self.minimum_reranker_score
            })
            .collect()
    }
}

#[async_trait]
impl Tool for TicketTemplatesTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "get_ticket_templates".to_string(),
            description: "Finds ticket templates for a given category that match the user's \
                          issue description. Use before creating a ticket so the right \
                          template can be filled in."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "category": {
                        "type": "string",
                        "description": "The ticket category to restrict the lookup to. Must be one of the allowed categories."
                    },
                    "description": {
                        "type": "string",
                        "description": "The user's description of the issue, used to rank matching templates."
                    }
                },
                "required": ["category", "description"]
            }),
        }
    }

    async fn execute(&self, parameters: Value) -> Result<ToolResult, EngineError> {
        let args: TemplateArgs = serde_json::from_value(parameters)
            .map_err(|e| EngineError::Tool(format!("bad template lookup arguments: {e}")))?;
        log::info!(
            "looking up ticket templates in category {} for: {}",
            args.category,
            args.description
        );

        let templates = self
            .searcher
            .search_templates(&args.category, &args.description)
            .await?;
        let qualified = self.qualify(templates);
        log::debug!("{} templates passed score thresholds", qualified.len());
        ToolResult::success_from(&qualified)
    }
}
