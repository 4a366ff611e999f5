//! Capability-based agent matching and ranking.
//!
//! Required capabilities are a hard filter. Every surviving candidate starts
//! at [`BASE_SCORE`](crate::core::BASE_SCORE), gains up to
//! [`OPTIONAL_WEIGHT`](crate::core::OPTIONAL_WEIGHT) for optional-capability
//! coverage, and caller-preferred agents are boosted on top. Ties keep the
//! directory's order.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, warn};

use super::directory::AgentDirectory;
use crate::core::{Agent, QueryAnalysis, RankedAgent, RelevanceScore};

/// Second pipeline stage: analysis → ranked agents.
#[derive(Clone)]
pub struct AgentMatcher {
    directory: Arc<dyn AgentDirectory>,
}

impl AgentMatcher {
    /// Creates a matcher over `directory`.
    #[must_use]
    pub fn new(directory: Arc<dyn AgentDirectory>) -> Self {
        Self { directory }
    }

    /// Relevance of `agent` to `analysis`, before preference boosting.
    ///
    /// Returns `None` if the agent lacks a required capability.
    #[must_use]
    pub fn score(agent: &Agent, analysis: &QueryAnalysis) -> Option<RelevanceScore> {
        if !agent.supports_all(&analysis.required_capabilities) {
            return None;
        }
        let covered = analysis
            .optional_capabilities
            .iter()
            .filter(|c| agent.supports(c))
            .count();
        Some(RelevanceScore::from_optional_coverage(
            covered,
            analysis.optional_capabilities.len(),
        ))
    }

    /// Scores, boosts and orders `candidates` without touching the directory.
    ///
    /// Output is sorted by descending score. The sort is stable, so equal
    /// scores keep their position in `candidates`.
    #[must_use]
    pub fn rank_candidates(
        candidates: &[Agent],
        analysis: &QueryAnalysis,
        preferred_agents: &[String],
    ) -> Vec<RankedAgent> {
        let preferred: HashSet<&str> = preferred_agents.iter().map(String::as_str).collect();

        let mut ranked: Vec<RankedAgent> = candidates
            .iter()
            .filter_map(|agent| {
                let score = Self::score(agent, analysis)?;
                let score = if preferred.contains(agent.agent_id.as_str()) {
                    score.boosted()
                } else {
                    score
                };
                Some(RankedAgent::from_agent(agent, score))
            })
            .collect();

        ranked.sort_by(|a, b| b.relevance_score.cmp(&a.relevance_score));
        ranked
    }

    /// Every qualifying agent, ranked.
    ///
    /// A directory failure is logged and yields an empty list.
    pub async fn rank(
        &self,
        analysis: &QueryAnalysis,
        preferred_agents: &[String],
    ) -> Vec<RankedAgent> {
        let candidates = match self
            .directory
            .find_agents_by_capability(&analysis.required_capabilities)
            .await
        {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(error = %e, "agent directory lookup failed, no candidates");
                return Vec::new();
            }
        };

        let ranked = Self::rank_candidates(&candidates, analysis, preferred_agents);
        debug!(
            fetched = candidates.len(),
            qualified = ranked.len(),
            required = ?analysis.required_capabilities,
            "ranked candidates"
        );
        ranked
    }

    /// The `max_results` best agents for `query`, best first.
    ///
    /// Never fails: no qualifying agent, or an unavailable directory, is an
    /// empty list.
    pub async fn find_best_agents(
        &self,
        query: &str,
        analysis: &QueryAnalysis,
        preferred_agents: &[String],
        max_results: usize,
    ) -> Vec<RankedAgent> {
        let mut ranked = self.rank(analysis, preferred_agents).await;
        ranked.truncate(max_results);
        debug!(
            query_len = query.len(),
            selected = ranked.len(),
            max_results,
            "selected best agents"
        );
        ranked
    }
}

impl std::fmt::Debug for AgentMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentMatcher").finish_non_exhaustive()
    }
}
