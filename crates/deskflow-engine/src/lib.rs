//! deskflow-engine: intent routing and tool-augmented conversation for the
//! deskflow helpdesk assistant.
//!
//! The engine classifies each incoming chat turn into an intent, then serves
//! it with one of two strategies: a tool-calling conversation session for
//! ticket flows (template lookup, ticket submission, knowledge search), or
//! delegation to an externally supplied retrieval-augmented answer path.
//! Replies are produced as a lazy stream of assistant fragments.

pub mod config;
pub mod error;
pub mod llm;
pub mod orchestration;
pub mod tools;

pub use config::EngineConfig;
pub use error::EngineError;
pub use orchestration::{
    AnswerFlow, ChatRequest, ChatSession, FragmentStream, Intent, Orchestrator, ResponseFragment,
};
