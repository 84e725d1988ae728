pub mod loader;
pub mod types;

pub use loader::{default_config_path, load_config, load_config_from_path};
pub use types::{AzureOpenAiSettings, EngineConfig, TicketingSettings, AZURE_OPENAI_API_VERSION};
