//! Query-to-agent routing pipeline.
//!
//! Discovers which remote agents can answer a natural-language query,
//! ranks them, fans the query out to the best few concurrently and merges
//! what comes back.
//!
//! # Architecture
//!
//! ```text
//! User query → Compass
//!   ├── QueryAnalyzer (IntentService: LLM or keyword heuristics)
//!   ├── AgentMatcher (AgentDirectory: ledger or fixture)
//!   │   └── hard capability filter → score → preference boost → stable sort
//!   ├── Router: fan-out → N concurrent dispatches (AgentTransport)
//!   │   └── each with its own timeout → AgentResponse
//!   └── ResultSynthesizer → final answer
//! ```
//!
//! # Feature Gate
//!
//! The `OpenAI` provider requires the `openai` feature (on by default).
//! Without it only the keyword analyzer is available.

pub mod analyzer;
pub mod client;
pub mod compass;
pub mod config;
pub mod directory;
pub mod matcher;
pub mod message;
pub mod prompt;
pub mod provider;
pub mod providers;
pub mod router;
pub mod synthesizer;
pub mod transport;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export key types
pub use analyzer::{IntentService, KeywordIntentService, LlmIntentService, QueryAnalyzer};
pub use client::{build_compass, build_directory, build_intent_service, create_provider};
pub use compass::{Compass, MAX_QUERY_LEN, RouteOptions, SearchOptions, validate_query};
pub use config::{AnalyzerKind, CompassConfig, CompassConfigBuilder};
pub use directory::{AgentDirectory, HttpDirectory, InMemoryDirectory};
pub use matcher::AgentMatcher;
pub use message::{Completion, CompletionRequest, ResponseShape, TokenUsage};
pub use prompt::PromptSet;
pub use provider::LlmProvider;
pub use router::{Dispatch, Router};
pub use synthesizer::{Agreement, ResultSynthesizer};
pub use transport::{AgentTransport, HttpTransport, TaskMessage, TaskPart, TaskRequest};
