//! Domain types shared by the routing pipeline, the CLI, and callers.
//!
//! Nothing in here performs I/O.

pub mod agent;
pub mod analysis;
pub mod ranking;
pub mod relevance;
pub mod response;

pub use agent::{
    Agent, AgentEndpoint, AgentSearchCriteria, Capability, Provider, Skill, capability_key,
};
pub use analysis::{DEFAULT_COMPLEXITY, QueryAnalysis, UNKNOWN_INTENT};
pub use ranking::RankedAgent;
pub use relevance::{BASE_SCORE, OPTIONAL_WEIGHT, PREFERENCE_BOOST, RelevanceScore};
pub use response::{AgentResponse, DispatchOutcome, RouteResult, SearchResult, render_content};
