use serde::{Deserialize, Serialize};

/// Settings for the external search index.
///
/// The three `use_*` flags select the retrieval strategy independently: plain
/// text matching, vector similarity, and an optional semantic reranking pass.
/// Any combination is valid; with all flags off the index still answers with
/// an unscoped match on the filter alone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchSettings {
    /// Base URL of the search service, e.g. `https://contoso.search.windows.net`.
    pub endpoint: String,

    /// Query key for the service. May be filled from the environment by the
    /// caller; kept out of `Debug` output by convention at call sites.
    #[serde(default)]
    pub api_key: String,

    /// Index holding knowledge documents.
    pub index: String,

    /// Index holding ticket templates.
    pub template_index: String,

    /// Maximum number of hits requested per query.
    #[serde(default = "default_top")]
    pub top: usize,

    #[serde(default = "default_true")]
    pub use_text_search: bool,

    #[serde(default)]
    pub use_vector_search: bool,

    #[serde(default)]
    pub use_semantic_ranker: bool,

    #[serde(default)]
    pub use_semantic_captions: bool,

    /// Vector field queried when vector search is enabled.
    #[serde(default = "default_vector_field")]
    pub vector_field: String,

    /// Nearest-neighbor count for the vector clause.
    #[serde(default = "default_k_nearest_neighbors")]
    pub k_nearest_neighbors: usize,

    /// REST API version pinned for the index service.
    #[serde(default = "default_api_version")]
    pub api_version: String,
}

fn default_top() -> usize {
    5
}

fn default_true() -> bool {
    true
}

fn default_vector_field() -> String {
    "text_vector".to_string()
}

fn default_k_nearest_neighbors() -> usize {
    50
}

fn default_api_version() -> String {
    "2024-07-01".to_string()
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            index: String::new(),
            template_index: String::new(),
            top: default_top(),
            use_text_search: true,
            use_vector_search: false,
            use_semantic_ranker: false,
            use_semantic_captions: false,
            vector_field: default_vector_field(),
            k_nearest_neighbors: default_k_nearest_neighbors(),
            api_version: default_api_version(),
        }
    }
}

impl SearchSettings {
    /// Validate that the settings can produce well-formed requests.
    pub fn validate(&self) -> Result<(), crate::error::SearchError> {
        if self.endpoint.is_empty() {
            return Err(crate::error::SearchError::InvalidSettings(
                "endpoint is required".to_string(),
            ));
        }
        if self.index.is_empty() {
            return Err(crate::error::SearchError::InvalidSettings(
                "index is required".to_string(),
            ));
        }
        if self.template_index.is_empty() {
            return Err(crate::error::SearchError::InvalidSettings(
                "template_index is required".to_string(),
            ));
        }
        Ok(())
    }
}
