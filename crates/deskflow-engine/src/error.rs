use thiserror::Error;

/// Errors raised by the conversation engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("model provider error: {0}")]
    Llm(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("tool error: {0}")]
    Tool(String),

    #[error("tool not found: {0}")]
    ToolNotFound(String),

    #[error(transparent)]
    Search(#[from] deskflow_search::SearchError),

    #[error("no user input to process")]
    EmptyRequest,

    #[error("tool-calling loop exceeded {0} rounds")]
    ToolLoopLimit(usize),
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Parse(err.to_string())
    }
}
