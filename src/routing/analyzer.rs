//! Query understanding.
//!
//! [`QueryAnalyzer`] turns a raw query into a [`QueryAnalysis`] through a
//! pluggable [`IntentService`]. Two services ship with the crate: an
//! LLM-backed one and an offline keyword heuristic.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

use super::message::{CompletionRequest, TokenUsage};
use super::prompt::build_analyzer_prompt;
use super::provider::LlmProvider;
use crate::core::QueryAnalysis;
use crate::error::RoutingError;

/// Interprets free text into intent and capability requirements.
#[async_trait]
pub trait IntentService: Send + Sync {
    /// Service name, for logs and diagnostics.
    fn name(&self) -> &'static str;

    /// Analyzes the query.
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError`] if the service is unreachable or its answer
    /// cannot be interpreted.
    async fn analyze_intent(&self, query: &str) -> Result<QueryAnalysis, RoutingError>;
}

/// Wire shape of an analysis produced by a language model.
#[derive(Debug, Deserialize)]
struct RawAnalysis {
    #[serde(default)]
    intent: String,
    #[serde(default, alias = "requiredCapabilities")]
    required_capabilities: Vec<String>,
    #[serde(default, alias = "optionalCapabilities")]
    optional_capabilities: Vec<String>,
    #[serde(default = "default_raw_complexity")]
    complexity: f64,
}

const fn default_raw_complexity() -> f64 {
    crate::core::DEFAULT_COMPLEXITY
}

/// Query analysis through an [`LlmProvider`] in JSON mode.
pub struct LlmIntentService {
    provider: Arc<dyn LlmProvider>,
    model: String,
    max_tokens: u32,
    system_prompt: String,
}

impl LlmIntentService {
    /// Creates a service that asks `model` through `provider`.
    #[must_use]
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        model: impl Into<String>,
        max_tokens: u32,
        system_prompt: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            max_tokens,
            system_prompt: system_prompt.into(),
        }
    }

    /// Parses the model's JSON answer, tolerating markdown code fences.
    fn parse_analysis(content: &str) -> Result<QueryAnalysis, RoutingError> {
        let trimmed = content.trim();

        let json_str = if trimmed.starts_with("```") {
            trimmed
                .trim_start_matches("```json")
                .trim_start_matches("```")
                .trim_end_matches("```")
                .trim()
        } else {
            trimmed
        };

        let raw: RawAnalysis =
            serde_json::from_str(json_str).map_err(|e| RoutingError::ResponseParse {
                message: format!("failed to parse query analysis: {e}"),
                content: content.to_string(),
            })?;

        Ok(QueryAnalysis::new(
            raw.intent,
            raw.required_capabilities,
            raw.optional_capabilities,
            raw.complexity,
        ))
    }
}

impl std::fmt::Debug for LlmIntentService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmIntentService")
            .field("provider", &self.provider.name())
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl IntentService for LlmIntentService {
    fn name(&self) -> &'static str {
        "llm"
    }

    async fn analyze_intent(&self, query: &str) -> Result<QueryAnalysis, RoutingError> {
        let request = CompletionRequest::json(
            &self.model,
            &self.system_prompt,
            build_analyzer_prompt(query),
            self.max_tokens,
        );

        let completion = self.provider.complete(&request).await?;
        if completion.truncated {
            warn!(
                model = %self.model,
                max_tokens = self.max_tokens,
                "query analysis hit the token limit"
            );
        }
        debug!(
            model = %self.model,
            tokens = completion.usage.map(TokenUsage::total),
            "query analysis completed"
        );
        Self::parse_analysis(&completion.text)
    }
}

/// Capability tags inferred from query vocabulary, in output order.
const CAPABILITY_KEYWORDS: &[(&str, &[&str])] = &[
    ("image_processing", &["image", "picture", "photo"]),
    ("text_processing", &["text", "write", "document"]),
    ("code_generation", &["code", "program", "develop"]),
    ("data_analysis", &["data", "analyze", "statistics"]),
];

/// Capability used when no vocabulary matched.
const FALLBACK_CAPABILITY: &str = "general_knowledge";

/// Intent labels by vocabulary, first match wins.
const INTENT_KEYWORDS: &[(&str, &[&str])] = &[
    ("creation", &["create", "generate", "make"]),
    ("search", &["find", "search", "look for"]),
    ("analysis", &["analyze", "examine", "evaluate"]),
    ("summarization", &["summarize", "summary"]),
];

/// Intent used when no vocabulary matched.
const FALLBACK_INTENT: &str = "information";

/// Compiles a pattern written in this module.
#[allow(clippy::expect_used)]
fn pattern(re: &str) -> Regex {
    Regex::new(re).expect("heuristic pattern is a valid regex")
}

static ANALYTICAL_VOCABULARY: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"analyze|compare|evaluate|relationship|correlation|synthesize"));

static COMPARATIVE_VOCABULARY: LazyLock<Regex> =
    LazyLock::new(|| pattern(r"compare|difference|versus|\bvs\b\.?|relationship|correlation"));

static HOW_WHY: LazyLock<Regex> = LazyLock::new(|| pattern(r"\b(?:how|why)\b"));

static NON_WORD: LazyLock<Regex> = LazyLock::new(|| pattern(r"[^\w\s]"));

/// Offline query analysis from keyword heuristics.
///
/// Never fails. Used when no language model is configured, and by tests
/// that need deterministic analyses.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordIntentService;

impl KeywordIntentService {
    /// Creates the service.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    fn detect_intent(lowered: &str) -> &'static str {
        INTENT_KEYWORDS
            .iter()
            .find(|(_, words)| words.iter().any(|w| lowered.contains(*w)))
            .map_or(FALLBACK_INTENT, |(intent, _)| *intent)
    }

    fn extract_capabilities(lowered: &str) -> Vec<&'static str> {
        let caps: Vec<&'static str> = CAPABILITY_KEYWORDS
            .iter()
            .filter(|(_, words)| words.iter().any(|w| lowered.contains(*w)))
            .map(|(cap, _)| *cap)
            .collect();

        if caps.is_empty() {
            vec![FALLBACK_CAPABILITY]
        } else {
            caps
        }
    }

    fn estimate_complexity(query: &str) -> f64 {
        let lowered = query.to_lowercase();
        let mut complexity: f64 = 0.3;

        if query.split_whitespace().count() > 15 {
            complexity += 0.2;
        }
        if ANALYTICAL_VOCABULARY.is_match(&lowered) {
            complexity += 0.3;
        }
        if query.matches('?').count() > 1 {
            complexity += 0.2;
        }

        complexity.min(1.0)
    }

    /// Analyzes `query` synchronously.
    #[must_use]
    pub fn analyze(query: &str) -> QueryAnalysis {
        let lowered = query.to_lowercase();
        QueryAnalysis::new(
            Self::detect_intent(&lowered),
            Self::extract_capabilities(&lowered),
            Vec::<&str>::new(),
            Self::estimate_complexity(query),
        )
    }
}

#[async_trait]
impl IntentService for KeywordIntentService {
    fn name(&self) -> &'static str {
        "keyword"
    }

    async fn analyze_intent(&self, query: &str) -> Result<QueryAnalysis, RoutingError> {
        Ok(Self::analyze(query))
    }
}

/// First pipeline stage: query → [`QueryAnalysis`].
#[derive(Clone)]
pub struct QueryAnalyzer {
    service: Arc<dyn IntentService>,
}

impl QueryAnalyzer {
    /// Creates an analyzer over the given service.
    #[must_use]
    pub fn new(service: Arc<dyn IntentService>) -> Self {
        Self { service }
    }

    /// Name of the underlying service.
    #[must_use]
    pub fn service_name(&self) -> &'static str {
        self.service.name()
    }

    /// Analyzes `query`.
    ///
    /// Never fails: when the service errors, the failure is logged and the
    /// degraded analysis is returned so downstream stages can proceed.
    pub async fn analyze(&self, query: &str) -> QueryAnalysis {
        match self.service.analyze_intent(query).await {
            Ok(analysis) => {
                let analysis = analysis.normalized();
                debug!(
                    service = self.service.name(),
                    intent = %analysis.intent,
                    required = ?analysis.required_capabilities,
                    optional = ?analysis.optional_capabilities,
                    complexity = analysis.complexity,
                    "query analyzed"
                );
                analysis
            }
            Err(e) => {
                warn!(
                    service = self.service.name(),
                    error = %e,
                    "query analysis failed, continuing with degraded analysis"
                );
                QueryAnalysis::degraded()
            }
        }
    }

    /// Lower-cased words longer than three characters, punctuation removed.
    #[must_use]
    pub fn extract_keywords(query: &str) -> Vec<String> {
        let lowered = query.to_lowercase();
        let stripped = NON_WORD.replace_all(&lowered, "");

        stripped
            .split_whitespace()
            .filter(|w| w.chars().count() > 3)
            .map(str::to_string)
            .collect()
    }

    /// Fraction of complexity signals present in `query`.
    ///
    /// Signals: longer than 100 characters, more than 15 words, contains a
    /// question mark, comparative vocabulary, and `how`/`why` phrasing.
    #[must_use]
    pub fn determine_complexity(query: &str) -> f64 {
        let lowered = query.to_lowercase();
        let factors = [
            query.chars().count() > 100,
            query.split_whitespace().count() > 15,
            query.contains('?'),
            COMPARATIVE_VOCABULARY.is_match(&lowered),
            HOW_WHY.is_match(&lowered),
        ];

        #[allow(clippy::cast_precision_loss)]
        let present = factors.iter().filter(|&&f| f).count() as f64;
        #[allow(clippy::cast_precision_loss)]
        let total = factors.len() as f64;
        (present / total).min(1.0)
    }
}

impl std::fmt::Debug for QueryAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryAnalyzer")
            .field("service", &self.service.name())
            .finish()
    }
}
