use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

use deskflow_search::{KnowledgeSearcher, RetrievedDocument};

use crate::error::EngineError;
use crate::llm::client::ToolDefinition;
use crate::tools::types::{Tool, ToolResult};

#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
}

/// Knowledge-base search exposed to the model.
///
/// The model is instructed to pass the user's wording untouched; retrieval
/// quality depends on distinguishing terms surviving into the query.
pub struct SearchKnowledgeTool {
    searcher: Arc<KnowledgeSearcher>,
    minimum_search_score: f32,
    minimum_reranker_score: f32,
}

impl SearchKnowledgeTool {
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

    fn qualify(&self, documents: Vec<RetrievedDocument>) -> Vec<RetrievedDocument> {
        documents
            .into_iter()
            .filter(|doc| {
                doc.relevance() >= self.minimum_search_score
                    && doc.reranker() >= self.minimum_reranker_score
            })
            .collect()
    }
}

#[async_trait]
impl Tool for SearchKnowledgeTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: "search".to_string(),
            description: "Answers the user's questions from the knowledge base. Does not \
                          handle support-ticket creation; only use it to look up information."
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The user's original, full and unchanged question or request, used verbatim as the search query."
                    }
                },
                "required": ["query"]
            }),
        }
    }

    async fn execute(&self, parameters: Value) -> Result<ToolResult, EngineError> {
        let args: SearchArgs = serde_json::from_value(parameters)
            .map_err(|e| EngineError::Tool(format!("bad search arguments: {e}")))?;
        log::info!("searching knowledge base for: {}", args.query);

        let documents = self.searcher.search_knowledge(&args.query).await?;
        let qualified = self.qualify(documents);
        log::debug!("{} documents passed score thresholds", qualified.len());
        ToolResult::success_from(&qualified)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use deskflow_search::{IndexClient, IndexHit, IndexQuery, SearchSettings};
    use serde_json::json;
    use std::sync::Mutex;

    struct StubIndex {
        hits: Vec<IndexHit>,
        queries: Mutex<Vec<IndexQuery>>,
    }

    #[async_trait]
    impl IndexClient for StubIndex {
        async fn query(
            &self,
            _index: &str,
            query: &IndexQuery,
        ) -> deskflow_search::Result<Vec<IndexHit>> {
            self.queries.lock().unwrap().push(query.clone());
            Ok(self.hits.clone())
        }
    }

    fn searcher_with(hits: Vec<serde_json::Value>) -> (Arc<KnowledgeSearcher>, Arc<StubIndex>) {
        let stub = Arc::new(StubIndex {
            hits: hits
                .into_iter()
                .map(|v| serde_json::from_value(v).unwrap())
                .collect(),
            queries: Mutex::new(Vec::new()),
        });
        let settings = SearchSettings {
            endpoint: "https://unit.search.windows.net".to_string(),
            index: "kb".to_string(),
            template_index: "templates".to_string(),
            ..SearchSettings::default()
        };
        (
            Arc::new(KnowledgeSearcher::new(stub.clone(), settings)),
            stub,
        )
    }

    #[tokio::test]
    async fn query_text_is_passed_unchanged() {
        let (searcher, stub) = searcher_with(vec![]);
        let tool = SearchKnowledgeTool::new(searcher, 0.0, 0.0);

        tool.execute(json!({"query": "How do I reset my password?"}))
            .await
            .unwrap();

        let queries = stub.queries.lock().unwrap();
        assert_eq!(
            queries[0].search_text.as_deref(),
            Some("How do I reset my password?")
        );
    }

    #[tokio::test]
    async fn documents_below_either_threshold_are_dropped() {
        let (searcher, _) = searcher_with(vec![
            json!({"id": "keep", "@search.score": 2.0, "@search.rerankerScore": 2.0}),
            json!({"id": "low-score", "@search.score": 0.5, "@search.rerankerScore": 2.0}),
            json!({"id": "low-rerank", "@search.score": 2.0, "@search.rerankerScore": 0.5}),
        ]);
        let tool = SearchKnowledgeTool::new(searcher, 1.0, 1.0);

        let result = tool.execute(json!({"query": "anything"})).await.unwrap();
        let docs = result.to_json();
        let ids: Vec<&str> = docs
            .as_array()
            .unwrap()
            .iter()
            .map(|d| d["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["keep"]);
    }

    #[tokio::test]
    async fn documents_at_threshold_are_kept() {
        let (searcher, _) = searcher_with(vec![json!({
            "id": "boundary", "@search.score": 1.0, "@search.rerankerScore": 1.0
        })]);
        let tool = SearchKnowledgeTool::new(searcher, 1.0, 1.0);

        let result = tool.execute(json!({"query": "anything"})).await.unwrap();
        assert_eq!(result.to_json().as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn missing_scores_count_as_zero() {
        let (searcher, _) = searcher_with(vec![json!({"id": "unscored"})]);
        let tool = SearchKnowledgeTool::new(searcher, 0.1, 0.0);

        let result = tool.execute(json!({"query": "anything"})).await.unwrap();
        assert!(result.to_json().as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn zero_thresholds_keep_everything() {
        let (searcher, _) = searcher_with(vec![
            json!({"id": "a"}),
            json!({"id": "b", "@search.score": 0.01}),
        ]);
        let tool = SearchKnowledgeTool::new(searcher, 0.0, 0.0);

        let result = tool.execute(json!({"query": "anything"})).await.unwrap();
        assert_eq!(result.to_json().as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn malformed_arguments_are_a_tool_error() {
        let (searcher, _) = searcher_with(vec![]);
        let tool = SearchKnowledgeTool::new(searcher, 0.0, 0.0);

        let err = tool.execute(json!({"q": "typo"})).await.unwrap_err();
        assert!(matches!(err, EngineError::Tool(_)));
    }

    #[test]
    fn definition_declares_query_parameter() {
        let (searcher, _) = searcher_with(vec![]);
        let tool = SearchKnowledgeTool::new(searcher, 0.0, 0.0);
        let definition = tool.definition();
        assert_eq!(definition.name, "search");
        assert_eq!(definition.parameters["required"][0], "query");
    }
}
