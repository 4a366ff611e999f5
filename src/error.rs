//! Error types for compass-rs.
//!
//! [`RoutingError`] covers the pipeline and its external collaborators
//! (language model, agent directory, agent transport). Most of these are
//! absorbed by the pipeline and turned into data; only configuration and
//! query contract violations reach the caller. [`CommandError`] covers the
//! CLI surface and [`Error`] unifies everything for the binary.

use thiserror::Error;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Routing pipeline or collaborator failure.
    #[error(transparent)]
    Routing(#[from] RoutingError),

    /// CLI command failure.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised by the routing pipeline and its collaborators.
#[derive(Debug, Error)]
pub enum RoutingError {
    /// The LLM analyzer was selected but no API key is configured.
    #[error("API key missing: set OPENAI_API_KEY or COMPASS_API_KEY, or use the keyword analyzer")]
    ApiKeyMissing,

    /// Unknown LLM provider name.
    #[error("unsupported provider: {name}")]
    UnsupportedProvider {
        /// Requested provider name.
        name: String,
    },

    /// The language-model API call failed.
    #[error("API request failed: {message}")]
    ApiRequest {
        /// Failure description.
        message: String,
        /// HTTP status, when known.
        status: Option<u16>,
    },

    /// A collaborator returned a payload that could not be parsed.
    #[error("failed to parse response: {message}")]
    ResponseParse {
        /// Parse failure description.
        message: String,
        /// Raw content that failed to parse.
        content: String,
    },

    /// The agent directory could not be reached or answered with an error.
    #[error("agent directory unavailable: {message}")]
    Directory {
        /// Failure description.
        message: String,
    },

    /// Invoking a remote agent failed.
    #[error("dispatch to agent '{agent_id}' failed: {message}")]
    Transport {
        /// Target agent.
        agent_id: String,
        /// Failure description.
        message: String,
    },

    /// A dispatch exceeded its per-agent timeout.
    #[error("agent '{agent_id}' timed out after {timeout_ms} ms")]
    Timeout {
        /// Target agent.
        agent_id: String,
        /// Timeout that expired, in milliseconds.
        timeout_ms: u128,
    },

    /// The caller supplied a query the pipeline refuses to process.
    #[error("invalid query: {message}")]
    InvalidQuery {
        /// Why the query was rejected.
        message: String,
    },

    /// Configuration supplied at construction time is malformed.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// What is wrong with the configuration.
        message: String,
    },
}

/// Errors raised by CLI commands.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The command could not complete.
    #[error("{0}")]
    ExecutionFailed(String),

    /// Output could not be rendered.
    #[error("output formatting failed: {0}")]
    OutputFormat(String),

    /// An argument value was rejected.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
