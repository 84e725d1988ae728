pub mod azure;
pub mod client;

#[cfg(test)]
pub mod test_client;

pub use client::{
    Completion, CompletionOptions, CompletionStream, LlmClient, Message, MessagePart, Role,
    StreamChunk, ToolChoice, ToolDefinition,
};
