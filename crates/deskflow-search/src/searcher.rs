use std::sync::Arc;

use crate::client::{IndexClient, IndexHit, IndexQuery, SemanticOptions, VectorQuery};
use crate::config::SearchSettings;
use crate::error::Result;
use crate::types::{RetrievedDocument, TicketTemplate};

/// Retrieval front-end combining the configured strategy flags into concrete
/// index queries.
///
/// The query text handed in must be the user's original wording; callers are
/// not expected to paraphrase before retrieval.
pub struct KnowledgeSearcher {
    client: Arc<dyn IndexClient>,
    settings: SearchSettings,
}

impl KnowledgeSearcher {
    pub fn new(client: Arc<dyn IndexClient>, settings: SearchSettings) -> Self {
        Self { client, settings }
    }

    pub fn settings(&self) -> &SearchSettings {
        &self.settings
    }

    /// Search the knowledge index for documents relevant to `query`.
    pub async fn search_knowledge(&self, query: &str) -> Result<Vec<RetrievedDocument>> {
        let index_query = self.build_query(query, None);
        let hits = self.client.query(&self.settings.index, &index_query).await?;
        Ok(hits.iter().map(document_from_hit).collect())
    }

    /// Look up ticket templates in `category`, using `description` as the
    /// relevance query. The category is an exact-match filter.
    pub async fn search_templates(
        &self,
        category: &str,
        description: &str,
    ) -> Result<Vec<TicketTemplate>> {
        let filter = format!("category_tier_1 eq '{}'", escape_odata(category));
        let index_query = self.build_query(description, Some(filter));
        let hits = self
            .client
            .query(&self.settings.template_index, &index_query)
            .await?;
        Ok(hits.iter().map(template_from_hit).collect())
    }

    fn build_query(&self, query_text: &str, filter: Option<String>) -> IndexQuery {
        let search_text = if self.settings.use_text_search {
            Some(query_text.to_string())
        } else {
            None
        };
        let vector = if self.settings.use_vector_search {
            Some(VectorQuery {
                text: query_text.to_string(),
                field: self.settings.vector_field.clone(),
                k_nearest_neighbors: self.settings.k_nearest_neighbors,
            })
        } else {
            None
        };
        let semantic = if self.settings.use_semantic_ranker {
            Some(SemanticOptions {
                configuration: "default".to_string(),
                query: query_text.to_string(),
                captions: self.settings.use_semantic_captions,
            })
        } else {
            None
        };
        IndexQuery {
            search_text,
            filter,
            top: self.settings.top,
            vector,
            semantic,
        }
    }
}

/// OData string literals escape a single quote by doubling it.
fn escape_odata(value: &str) -> String {
    value.replace('\'', "''")
}

fn document_from_hit(hit: &IndexHit) -> RetrievedDocument {
    RetrievedDocument {
        id: hit.string_field("id"),
        parent_id: hit.string_field("parent_id"),
        title: hit.string_field("title"),
        content: hit.string_field("content"),
        score: hit.score,
        reranker_score: hit.reranker_score,
    }
}

fn template_from_hit(hit: &IndexHit) -> TicketTemplate {
    TicketTemplate {
        id: hit.string_field("id"),
        name: hit.string_field("name").unwrap_or_default(),
        category_tier_1: hit.string_field("category_tier_1"),
        category_tier_2: hit.string_field("category_tier_2"),
        category_tier_3: hit.string_field("category_tier_3"),
        description: hit.string_field("description"),
        detailed_description: hit.string_field("detailed_description"),
        priority: hit.string_field("priority"),
        urgency: hit.string_field("urgency"),
        assigned_group: hit.string_field("assigned_group"),
        score: hit.score,
        reranker_score: hit.reranker_score,
    }
}
