use thiserror::Error;

/// Result type for retrieval operations.
pub type Result<T> = std::result::Result<T, SearchError>;

/// Errors that can occur while talking to the search index.
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("invalid search settings: {0}")]
    /// The configured endpoint or index names cannot produce a valid request.
    InvalidSettings(String),

    #[error("search request failed: {0}")]
    /// Transport-level failure reaching the index service.
    Http(#[from] reqwest::Error),

    #[error("search service returned {status}: {body}")]
    /// The index service answered with a non-success status code.
    Status {
        /// HTTP status code returned by the service.
        status: u16,
        /// Response body, useful for diagnosing malformed queries.
        body: String,
    },

    #[error("failed to decode search response: {0}")]
    /// The response body did not match the expected document shape.
    Decode(#[from] serde_json::Error),
}
