use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::error::{Result, SearchError};

/// A single query against one index.
///
/// Which clauses are present depends on the retrieval strategy selected in
/// [`crate::SearchSettings`]; the client serializes exactly what it is given.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexQuery {
    /// Full-text clause. `None` sends an empty search string so the filter
    /// alone scopes the result set.
    pub search_text: Option<String>,
    /// OData filter expression, e.g. an exact category match.
    pub filter: Option<String>,
    /// Maximum number of hits to return.
    pub top: usize,
    /// Vector similarity clause.
    pub vector: Option<VectorQuery>,
    /// Semantic reranking options.
    pub semantic: Option<SemanticOptions>,
}

/// Text-to-vector similarity clause; the service embeds the text on its side.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorQuery {
    pub text: String,
    pub field: String,
    pub k_nearest_neighbors: usize,
}

/// Options for the service-side semantic reranking pass.
#[derive(Debug, Clone, PartialEq)]
pub struct SemanticOptions {
    pub configuration: String,
    pub query: String,
    pub captions: bool,
}

/// One raw hit from the index: service-assigned scores plus the stored
/// document fields, untyped until the searcher maps them.
#[derive(Debug, Clone, Deserialize)]
pub struct IndexHit {
    #[serde(rename = "@search.score", default)]
    pub score: Option<f32>,
    #[serde(rename = "@search.rerankerScore", default)]
    pub reranker_score: Option<f32>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl IndexHit {
    pub fn string_field(&self, name: &str) -> Option<String> {
        self.fields
            .get(name)
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
    }
}

/// Contract between the retrieval layer and the index service.
#[async_trait]
pub trait IndexClient: Send + Sync {
    async fn query(&self, index: &str, query: &IndexQuery) -> Result<Vec<IndexHit>>;
}

/// REST client for the index service.
pub struct HttpIndexClient {
    endpoint: String,
    api_key: String,
    api_version: String,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(rename = "value", default)]
    hits: Vec<IndexHit>,
}

impl HttpIndexClient {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>, api_version: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            api_version: api_version.into(),
            http: reqwest::Client::new(),
        }
    }

    fn request_url(&self, index: &str) -> String {
        format!(
            "{}/indexes/{}/docs/search?api-version={}",
            self.endpoint.trim_end_matches('/'),
            index,
            self.api_version
        )
    }

    fn request_body(query: &IndexQuery) -> Value {
        let mut body = Map::new();
        body.insert(
            "search".to_string(),
            json!(query.search_text.clone().unwrap_or_default()),
        );
        body.insert("top".to_string(), json!(query.top));
        if let Some(filter) = &query.filter {
            body.insert("filter".to_string(), json!(filter));
        }
        if let Some(vector) = &query.vector {
            body.insert(
                "vectorQueries".to_string(),
                json!([{
                    "kind": "text",
                    "text": vector.text,
                    "fields": vector.field,
                    "k": vector.k_nearest_neighbors,
                }]),
            );
        }
        if let Some(semantic) = &query.semantic {
            body.insert("queryType".to_string(), json!("semantic"));
            body.insert(
                "semanticConfiguration".to_string(),
                json!(semantic.configuration),
            );
            body.insert("semanticQuery".to_string(), json!(semantic.query));
            if semantic.captions {
                body.insert("captions".to_string(), json!("extractive"));
            }
        }
        Value::Object(body)
    }
}

#[async_trait]
impl IndexClient for HttpIndexClient {
    async fn query(&self, index: &str, query: &IndexQuery) -> Result<Vec<IndexHit>> {
        let url = self.request_url(index);
        let body = Self::request_body(query);
        log::debug!("querying index {index}: {body}");

        let response = self
            .http
            .post(&url)
            .header("api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SearchError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await?;
        let decoded: QueryResponse = serde_json::from_str(&text)?;
        log::debug!("index {index} returned {} hits", decoded.hits.len());
        Ok(decoded.hits)
    }
}
