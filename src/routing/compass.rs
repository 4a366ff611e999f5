//! Caller-facing entry point for the routing pipeline.
//!
//! [`Compass`] wires the four stages together:
//!
//! ```text
//! query → QueryAnalyzer → AgentMatcher → Router (fan-out) → ResultSynthesizer
//! ```
//!
//! Only malformed input is an error. Collaborator failures come back as
//! data: a degraded analysis, an empty agent list, or failed responses.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{info, warn};

use super::analyzer::{IntentService, QueryAnalyzer};
use super::config::CompassConfig;
use super::directory::AgentDirectory;
use super::matcher::AgentMatcher;
use super::router::Router;
use super::synthesizer::ResultSynthesizer;
use super::transport::AgentTransport;
use crate::core::{Agent, AgentSearchCriteria, QueryAnalysis, RouteResult, SearchResult};
use crate::error::RoutingError;

/// Longest accepted query, in bytes.
pub const MAX_QUERY_LEN: usize = 10_000;

/// Checks a query before it enters the pipeline.
///
/// # Errors
///
/// Returns [`RoutingError::InvalidQuery`] for blank or oversized queries.
pub fn validate_query(query: &str) -> Result<(), RoutingError> {
    if query.trim().is_empty() {
        return Err(RoutingError::InvalidQuery {
            message: "query cannot be empty".to_string(),
        });
    }
    if query.len() > MAX_QUERY_LEN {
        return Err(RoutingError::InvalidQuery {
            message: format!(
                "query exceeds maximum length ({} bytes, max {MAX_QUERY_LEN})",
                query.len()
            ),
        });
    }
    Ok(())
}

/// Parameters for [`Compass::search`].
#[derive(Debug, Clone, Default)]
pub struct SearchOptions {
    /// Natural-language query.
    pub query: String,
    /// Maximum agents to return; the configured default when `None`.
    pub max_results: Option<usize>,
    /// Agents scoring below this are dropped before counting.
    pub min_relevance_score: Option<f64>,
    /// Agent ids to boost.
    pub preferred_agents: Vec<String>,
}

impl SearchOptions {
    /// Options for `query` with every other field defaulted.
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }
}

/// Parameters for [`Compass::route`].
#[derive(Debug, Clone)]
pub struct RouteOptions {
    /// Natural-language query.
    pub query: String,
    /// Agent ids to boost.
    pub preferred_agents: Vec<String>,
    /// Maximum agents to dispatch to; the configured default when `None`.
    pub max_agents: Option<usize>,
    /// Merge all answers (`true`) or return the best one as is.
    pub synthesize_results: bool,
    /// Opaque context forwarded to every agent.
    pub context: Option<Value>,
    /// Per-agent timeout for this call; the configured default when `None`.
    pub dispatch_timeout: Option<Duration>,
}

impl RouteOptions {
    /// Options for `query` with synthesis on and every other field defaulted.
    #[must_use]
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            preferred_agents: Vec::new(),
            max_agents: None,
            synthesize_results: true,
            context: None,
            dispatch_timeout: None,
        }
    }
}

/// The routing pipeline.
///
/// Stateless between calls; clone freely or share behind an `Arc`.
#[derive(Clone)]
pub struct Compass {
    analyzer: QueryAnalyzer,
    matcher: AgentMatcher,
    router: Router,
    synthesizer: ResultSynthesizer,
    directory: Arc<dyn AgentDirectory>,
    max_results: usize,
    max_agents: usize,
}

impl Compass {
    /// Assembles the pipeline from its collaborators.
    #[must_use]
    pub fn new(
        intent_service: Arc<dyn IntentService>,
        directory: Arc<dyn AgentDirectory>,
        transport: Arc<dyn AgentTransport>,
        config: &CompassConfig,
    ) -> Self {
        Self {
            analyzer: QueryAnalyzer::new(intent_service),
            matcher: AgentMatcher::new(Arc::clone(&directory)),
            router: Router::new(transport, config.dispatch_timeout, &config.requester_id),
            synthesizer: ResultSynthesizer::new(),
            directory,
            max_results: config.max_results,
            max_agents: config.max_agents,
        }
    }

    /// Analyzes `query` without matching or dispatching.
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError::InvalidQuery`] for blank or oversized queries.
    pub async fn analyze(&self, query: &str) -> Result<QueryAnalysis, RoutingError> {
        validate_query(query)?;
        Ok(self.analyzer.analyze(query).await)
    }

    /// Ranks agents for a query without dispatching.
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError::InvalidQuery`] for blank or oversized queries.
    pub async fn search(&self, options: &SearchOptions) -> Result<SearchResult, RoutingError> {
        validate_query(&options.query)?;

        let analysis = self.analyzer.analyze(&options.query).await;
        let mut agents = self.matcher.rank(&analysis, &options.preferred_agents).await;

        if let Some(min) = options.min_relevance_score {
            agents.retain(|a| a.relevance_score.value() >= min);
        }
        let total_found = agents.len();
        agents.truncate(options.max_results.unwrap_or(self.max_results));

        info!(
            total_found,
            returned = agents.len(),
            intent = %analysis.intent,
            "search completed"
        );

        Ok(SearchResult {
            agents,
            total_found,
            query_analysis: analysis,
        })
    }

    /// Routes a query end to end: analyze, match, dispatch, synthesize.
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError::InvalidQuery`] for blank or oversized queries.
    /// Every other failure is reported inside the [`RouteResult`].
    pub async fn route(&self, options: &RouteOptions) -> Result<RouteResult, RoutingError> {
        validate_query(&options.query)?;
        let start = Instant::now();
        let query = options.query.as_str();
        let max_agents = options.max_agents.unwrap_or(self.max_agents);

        let analysis = self.analyzer.analyze(query).await;
        let ranked = self
            .matcher
            .find_best_agents(query, &analysis, &options.preferred_agents, max_agents)
            .await;

        let router = match options.dispatch_timeout {
            Some(timeout) => self.router.clone().with_timeout(timeout),
            None => self.router.clone(),
        };
        let dispatch = router
            .dispatch(&ranked, query, options.context.as_ref(), max_agents)
            .await;

        let synthesized_response = if options.synthesize_results {
            self.synthesizer.synthesize(&dispatch.raw_responses, query)
        } else {
            self.synthesizer.primary_only(&dispatch.raw_responses, query)
        };

        let result = RouteResult {
            agents_used: dispatch.agents_used,
            synthesized_response,
            raw_responses: dispatch.raw_responses,
            query_analysis: analysis,
            elapsed: start.elapsed(),
        };

        info!(
            agents = result.agents_used.len(),
            succeeded = result.successes(),
            elapsed = ?result.elapsed,
            "route completed"
        );

        Ok(result)
    }

    /// Agents matching `criteria`, straight from the directory.
    ///
    /// A directory failure is logged and yields an empty list.
    pub async fn find_agents(&self, criteria: &AgentSearchCriteria) -> Vec<Agent> {
        match self.directory.search_agents(criteria).await {
            Ok(agents) => agents,
            Err(e) => {
                warn!(error = %e, "agent directory search failed");
                Vec::new()
            }
        }
    }

    /// A single agent record.
    ///
    /// Unknown ids and directory failures both yield `None`; the latter is
    /// logged.
    pub async fn agent_details(&self, agent_id: &str) -> Option<Agent> {
        match self.directory.get_agent(agent_id).await {
            Ok(agent) => agent,
            Err(e) => {
                warn!(agent_id, error = %e, "agent lookup failed");
                None
            }
        }
    }
}

impl std::fmt::Debug for Compass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Compass")
            .field("analyzer", &self.analyzer)
            .field("router", &self.router)
            .field("max_results", &self.max_results)
            .field("max_agents", &self.max_agents)
            .finish_non_exhaustive()
    }
}
