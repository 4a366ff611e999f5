//! Routing configuration with builder pattern and environment variable support.
//!
//! Configuration is resolved in order: explicit values → environment variables → defaults.

use std::path::PathBuf;
use std::time::Duration;

use crate::error::RoutingError;

/// Default number of ranked agents returned by `search`.
pub const DEFAULT_MAX_RESULTS: usize = 5;
/// Default number of agents a query is dispatched to.
pub const DEFAULT_MAX_AGENTS: usize = 3;
/// Default per-agent dispatch timeout in seconds.
const DEFAULT_DISPATCH_TIMEOUT_SECS: u64 = 30;
/// Default timeout for ledger and LLM HTTP requests in seconds.
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
/// Default analyzer max tokens.
const DEFAULT_ANALYZER_MAX_TOKENS: u32 = 512;
/// Default analyzer model.
const DEFAULT_ANALYZER_MODEL: &str = "gpt-4o-mini";
/// Default requester identity sent with every task.
const DEFAULT_REQUESTER_ID: &str = "compass-rs";

/// Which query-understanding backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyzerKind {
    /// Language-model analysis through the configured provider.
    Llm,
    /// Offline keyword heuristics.
    Keyword,
}

impl AnalyzerKind {
    /// Parses an analyzer name (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError::InvalidConfig`] for unknown names.
    pub fn parse(s: &str) -> Result<Self, RoutingError> {
        match s.trim().to_lowercase().as_str() {
            "llm" => Ok(Self::Llm),
            "keyword" | "keywords" => Ok(Self::Keyword),
            other => Err(RoutingError::InvalidConfig {
                message: format!("unknown analyzer '{other}' (expected 'llm' or 'keyword')"),
            }),
        }
    }

    /// Returns the string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Llm => "llm",
            Self::Keyword => "keyword",
        }
    }
}

impl std::fmt::Display for AnalyzerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for the routing pipeline and its collaborators.
#[derive(Clone)]
pub struct CompassConfig {
    /// Query-understanding backend.
    pub analyzer: AnalyzerKind,
    /// LLM provider name (e.g., "openai").
    pub provider: String,
    /// API key for the provider.
    pub api_key: Option<String>,
    /// Optional base URL override (for proxies or compatible APIs).
    pub base_url: Option<String>,
    /// Model used for query analysis.
    pub analyzer_model: String,
    /// Maximum tokens for analysis responses.
    pub analyzer_max_tokens: u32,
    /// Agent directory (ledger) base URL.
    pub ledger_url: Option<String>,
    /// API key for the ledger.
    pub ledger_api_key: Option<String>,
    /// Bearer token presented to agents on dispatch.
    pub agent_token: Option<String>,
    /// Identity of this router in task requests.
    pub requester_id: String,
    /// Default number of agents returned by `search`.
    pub max_results: usize,
    /// Default number of agents a query is dispatched to.
    pub max_agents: usize,
    /// Per-agent dispatch timeout.
    pub dispatch_timeout: Duration,
    /// Timeout for ledger and LLM HTTP requests.
    pub request_timeout: Duration,
    /// Directory containing prompt template files.
    ///
    /// When set, the analyzer system prompt is loaded from `analyzer.md`
    /// in this directory, falling back to the compiled-in default.
    pub prompt_dir: Option<PathBuf>,
}

impl CompassConfig {
    /// Creates a new builder for `CompassConfig`.
    #[must_use]
    pub fn builder() -> CompassConfigBuilder {
        CompassConfigBuilder::default()
    }

    /// Creates configuration from environment variables with defaults.
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError`] if the resulting configuration is invalid.
    pub fn from_env() -> Result<Self, RoutingError> {
        Self::builder().from_env().build()
    }
}

impl std::fmt::Debug for CompassConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |s: &Option<String>| s.as_ref().map(|_| "<redacted>");
        f.debug_struct("CompassConfig")
            .field("analyzer", &self.analyzer)
            .field("provider", &self.provider)
            .field("api_key", &redact(&self.api_key))
            .field("base_url", &self.base_url)
            .field("analyzer_model", &self.analyzer_model)
            .field("analyzer_max_tokens", &self.analyzer_max_tokens)
            .field("ledger_url", &self.ledger_url)
            .field("ledger_api_key", &redact(&self.ledger_api_key))
            .field("agent_token", &redact(&self.agent_token))
            .field("requester_id", &self.requester_id)
            .field("max_results", &self.max_results)
            .field("max_agents", &self.max_agents)
            .field("dispatch_timeout", &self.dispatch_timeout)
            .field("request_timeout", &self.request_timeout)
            .field("prompt_dir", &self.prompt_dir)
            .finish()
    }
}

/// Builder for [`CompassConfig`].
#[derive(Debug, Clone, Default)]
pub struct CompassConfigBuilder {
    analyzer: Option<String>,
    provider: Option<String>,
    api_key: Option<String>,
    base_url: Option<String>,
    analyzer_model: Option<String>,
    analyzer_max_tokens: Option<u32>,
    ledger_url: Option<String>,
    ledger_api_key: Option<String>,
    agent_token: Option<String>,
    requester_id: Option<String>,
    max_results: Option<usize>,
    max_agents: Option<usize>,
    dispatch_timeout: Option<Duration>,
    request_timeout: Option<Duration>,
    prompt_dir: Option<PathBuf>,
}

impl CompassConfigBuilder {
    /// Populates unset fields from environment variables.
    #[must_use]
    pub fn from_env(mut self) -> Self {
        if self.analyzer.is_none() {
            self.analyzer = std::env::var("COMPASS_ANALYZER").ok();
        }
        if self.provider.is_none() {
            self.provider = std::env::var("COMPASS_PROVIDER").ok();
        }
        if self.api_key.is_none() {
            self.api_key = std::env::var("OPENAI_API_KEY")
                .or_else(|_| std::env::var("COMPASS_API_KEY"))
                .ok();
        }
        if self.base_url.is_none() {
            self.base_url = std::env::var("OPENAI_BASE_URL")
                .or_else(|_| std::env::var("COMPASS_BASE_URL"))
                .ok();
        }
        if self.analyzer_model.is_none() {
            self.analyzer_model = std::env::var("COMPASS_ANALYZER_MODEL").ok();
        }
        if self.ledger_url.is_none() {
            self.ledger_url = std::env::var("COMPASS_LEDGER_URL").ok();
        }
        if self.ledger_api_key.is_none() {
            self.ledger_api_key = std::env::var("COMPASS_LEDGER_API_KEY").ok();
        }
        if self.agent_token.is_none() {
            self.agent_token = std::env::var("COMPASS_AGENT_TOKEN").ok();
        }
        if self.requester_id.is_none() {
            self.requester_id = std::env::var("COMPASS_REQUESTER_ID").ok();
        }
        if self.max_results.is_none() {
            self.max_results = std::env::var("COMPASS_MAX_RESULTS")
                .ok()
                .and_then(|v| v.parse().ok());
        }
        if self.max_agents.is_none() {
            self.max_agents = std::env::var("COMPASS_MAX_AGENTS")
                .ok()
                .and_then(|v| v.parse().ok());
        }
        if self.dispatch_timeout.is_none() {
            self.dispatch_timeout = std::env::var("COMPASS_DISPATCH_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .map(Duration::from_millis);
        }
        if self.prompt_dir.is_none() {
            self.prompt_dir = std::env::var("COMPASS_PROMPT_DIR").ok().map(PathBuf::from);
        }
        self
    }

    /// Sets the analyzer backend (`llm` or `keyword`).
    #[must_use]
    pub fn analyzer(mut self, analyzer: impl Into<String>) -> Self {
        self.analyzer = Some(analyzer.into());
        self
    }

    /// Sets the LLM provider name.
    #[must_use]
    pub fn provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Sets the API key.
    #[must_use]
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the base URL override.
    #[must_use]
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Sets the analyzer model.
    #[must_use]
    pub fn analyzer_model(mut self, model: impl Into<String>) -> Self {
        self.analyzer_model = Some(model.into());
        self
    }

    /// Sets the analyzer max tokens.
    #[must_use]
    pub const fn analyzer_max_tokens(mut self, n: u32) -> Self {
        self.analyzer_max_tokens = Some(n);
        self
    }

    /// Sets the ledger base URL.
    #[must_use]
    pub fn ledger_url(mut self, url: impl Into<String>) -> Self {
        self.ledger_url = Some(url.into());
        self
    }

    /// Sets the ledger API key.
    #[must_use]
    pub fn ledger_api_key(mut self, key: impl Into<String>) -> Self {
        self.ledger_api_key = Some(key.into());
        self
    }

    /// Sets the bearer token presented to agents.
    #[must_use]
    pub fn agent_token(mut self, token: impl Into<String>) -> Self {
        self.agent_token = Some(token.into());
        self
    }

    /// Sets the requester identity.
    #[must_use]
    pub fn requester_id(mut self, id: impl Into<String>) -> Self {
        self.requester_id = Some(id.into());
        self
    }

    /// Sets the default search result count.
    #[must_use]
    pub const fn max_results(mut self, n: usize) -> Self {
        self.max_results = Some(n);
        self
    }

    /// Sets the default dispatch fan-out width.
    #[must_use]
    pub const fn max_agents(mut self, n: usize) -> Self {
        self.max_agents = Some(n);
        self
    }

    /// Sets the per-agent dispatch timeout.
    #[must_use]
    pub const fn dispatch_timeout(mut self, duration: Duration) -> Self {
        self.dispatch_timeout = Some(duration);
        self
    }

    /// Sets the ledger/LLM request timeout.
    #[must_use]
    pub const fn request_timeout(mut self, duration: Duration) -> Self {
        self.request_timeout = Some(duration);
        self
    }

    /// Sets the prompt template directory.
    #[must_use]
    pub fn prompt_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.prompt_dir = Some(dir.into());
        self
    }

    /// Builds the [`CompassConfig`].
    ///
    /// Without an explicit analyzer, the LLM analyzer is chosen when an API
    /// key is available and the keyword analyzer otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError::ApiKeyMissing`] if the LLM analyzer is
    /// requested without an API key, and [`RoutingError::InvalidConfig`] for
    /// an unknown analyzer or a zero count or timeout.
    pub fn build(self) -> Result<CompassConfig, RoutingError> {
        let api_key = self.api_key.filter(|k| !k.trim().is_empty());

        let analyzer = match self.analyzer.as_deref() {
            Some(name) => AnalyzerKind::parse(name)?,
            None if api_key.is_some() => AnalyzerKind::Llm,
            None => AnalyzerKind::Keyword,
        };
        if analyzer == AnalyzerKind::Llm && api_key.is_none() {
            return Err(RoutingError::ApiKeyMissing);
        }

        let max_results = self.max_results.unwrap_or(DEFAULT_MAX_RESULTS);
        let max_agents = self.max_agents.unwrap_or(DEFAULT_MAX_AGENTS);
        let dispatch_timeout = self
            .dispatch_timeout
            .unwrap_or(Duration::from_secs(DEFAULT_DISPATCH_TIMEOUT_SECS));

        if max_results == 0 {
            return Err(RoutingError::InvalidConfig {
                message: "max_results must be at least 1".to_string(),
            });
        }
        if max_agents == 0 {
            return Err(RoutingError::InvalidConfig {
                message: "max_agents must be at least 1".to_string(),
            });
        }
        if dispatch_timeout.is_zero() {
            return Err(RoutingError::InvalidConfig {
                message: "dispatch_timeout must be greater than zero".to_string(),
            });
        }

        Ok(CompassConfig {
            analyzer,
            provider: self.provider.unwrap_or_else(|| "openai".to_string()),
            api_key,
            base_url: self.base_url,
            analyzer_model: self
                .analyzer_model
                .unwrap_or_else(|| DEFAULT_ANALYZER_MODEL.to_string()),
            analyzer_max_tokens: self
                .analyzer_max_tokens
                .unwrap_or(DEFAULT_ANALYZER_MAX_TOKENS),
            ledger_url: self.ledger_url,
            ledger_api_key: self.ledger_api_key,
            agent_token: self.agent_token,
            requester_id: self
                .requester_id
                .unwrap_or_else(|| DEFAULT_REQUESTER_ID.to_string()),
            max_results,
            max_agents,
            dispatch_timeout,
            request_timeout: self
                .request_timeout
                .unwrap_or(Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS)),
            prompt_dir: self.prompt_dir,
        })
    }
}
