//! Retrieval plumbing for the deskflow helpdesk assistant.
//!
//! Wraps an external search index behind [`IndexClient`] and exposes the two
//! retrieval entry points the assistant needs: knowledge-document search and
//! ticket-template lookup. Score-threshold filtering is deliberately *not*
//! done here; the model-facing capability layer owns it.

pub mod client;
pub mod config;
pub mod error;
pub mod searcher;
pub mod types;

pub use client::{HttpIndexClient, IndexClient, IndexHit, IndexQuery, SemanticOptions, VectorQuery};
pub use config::SearchSettings;
pub use error::{Result, SearchError};
pub use searcher::KnowledgeSearcher;
pub use types::{RetrievedDocument, TicketTemplate};
