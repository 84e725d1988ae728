use serde::{Deserialize, Serialize};

use deskflow_search::SearchSettings;

/// API version pinned for the Azure OpenAI service.
pub const AZURE_OPENAI_API_VERSION: &str = "2024-09-01-preview";

/// Settings for the Azure OpenAI deployment backing the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AzureOpenAiSettings {
    /// Full endpoint URL. May be left empty when `resource` is set.
    #[serde(default)]
    pub endpoint: String,

    /// Resource name; used to construct the endpoint when `endpoint` is
    /// empty.
    #[serde(default)]
    pub resource: Option<String>,

    #[serde(default)]
    pub api_key: String,

    /// Deployment (model) name.
    #[serde(default)]
    pub deployment: String,

    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Default sampling temperature for conversational turns.
    #[serde(default)]
    pub temperature: f32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: Option<u32>,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

fn default_api_version() -> String {
    AZURE_OPENAI_API_VERSION.to_string()
}

fn default_max_tokens() -> Option<u32> {
    Some(1000)
}

fn default_request_timeout() -> u64 {
    60
}

fn default_max_retries() -> u32 {
    2
}

impl Default for AzureOpenAiSettings {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            resource: None,
            api_key: String::new(),
            deployment: String::new(),
            api_version: default_api_version(),
            temperature: 0.0,
            max_tokens: default_max_tokens(),
            request_timeout_secs: default_request_timeout(),
            max_retries: default_max_retries(),
        }
    }
}

impl AzureOpenAiSettings {
    /// Fill in the endpoint from the resource name when only the latter is
    /// configured.
    pub fn resolve_endpoint(&mut self) {
        if self.endpoint.is_empty() {
            if let Some(resource) = &self.resource {
                self.endpoint = format!("https://{resource}.openai.azure.com");
            }
        }
    }
}

/// Settings for the ticketing-system proxy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketingSettings {
    #[serde(default)]
    pub endpoint: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_ticketing_timeout")]
    pub request_timeout_secs: u64,
}

fn default_ticketing_timeout() -> u64 {
    30
}

impl Default for TicketingSettings {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            request_timeout_secs: default_ticketing_timeout(),
        }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub azure_openai: AzureOpenAiSettings,

    #[serde(default)]
    pub search: SearchSettings,

    #[serde(default)]
    pub ticketing: TicketingSettings,

    /// Documents and templates below this relevance score are dropped
    /// before the model sees them.
    #[serde(default)]
    pub minimum_search_score: f32,

    /// Same filter, applied to the reranker score.
    #[serde(default)]
    pub minimum_reranker_score: f32,

    /// Closed set of ticket categories the assistant may file under. The
    /// model is instructed to reprompt for anything outside the set.
    #[serde(default = "default_allowed_categories")]
    pub allowed_categories: Vec<String>,

    /// Upper bound on model/tool round-trips per turn.
    #[serde(default = "default_max_tool_rounds")]
    pub max_tool_rounds: usize,

    /// Override for the ticket-flow system instruction. When unset, the
    /// built-in instruction is used.
    #[serde(default)]
    pub ticket_system_instruction: Option<String>,
}

fn default_allowed_categories() -> Vec<String> {
    ["CLOUD", "NETWORK", "HARDWARE", "SOFTWARE", "ACCESS"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_max_tool_rounds() -> usize {
    8
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            azure_openai: AzureOpenAiSettings::default(),
            search: SearchSettings::default(),
            ticketing: TicketingSettings::default(),
            minimum_search_score: 0.0,
            minimum_reranker_score: 0.0,
            allowed_categories: default_allowed_categories(),
            max_tool_rounds: default_max_tool_rounds(),
            ticket_system_instruction: None,
        }
    }
}
