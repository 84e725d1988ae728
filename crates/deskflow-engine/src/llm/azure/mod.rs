//! Azure OpenAI chat-completions provider.

pub mod client;
pub mod sse;
pub mod stream_processor;
pub mod translator;
pub mod types;

pub use client::AzureOpenAiClient;
