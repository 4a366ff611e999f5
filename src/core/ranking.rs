//! Ranked view of an agent, derived per matching call.

use serde::{Deserialize, Serialize};

use super::agent::{Agent, AgentEndpoint, Capability, Skill};
use super::relevance::RelevanceScore;

/// An agent scored against one query analysis.
///
/// Display fields are copied out of the [`Agent`] so the ranked list is
/// self-contained. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedAgent {
    /// Agent identifier.
    pub agent_id: String,
    /// Display name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Invocation URL.
    pub url: String,
    /// Operating organization.
    pub organization: String,
    /// Relevance to the query.
    pub relevance_score: RelevanceScore,
    /// Supported capabilities.
    pub capabilities: Vec<Capability>,
    /// Skills, surfaced for callers.
    pub skills: Vec<Skill>,
}

impl RankedAgent {
    /// Builds the ranked view of `agent` with the given score.
    #[must_use]
    pub fn from_agent(agent: &Agent, relevance_score: RelevanceScore) -> Self {
        Self {
            agent_id: agent.agent_id.clone(),
            name: agent.name.clone(),
            description: agent.description.clone(),
            url: agent.url.clone(),
            organization: agent.provider.organization.clone(),
            relevance_score,
            capabilities: agent
                .supported_capabilities()
                .map(Capability::named)
                .collect(),
            skills: agent.skills.clone(),
        }
    }

    /// Returns the address used to dispatch to this agent.
    #[must_use]
    pub fn endpoint(&self) -> AgentEndpoint {
        AgentEndpoint {
            agent_id: self.agent_id.clone(),
            url: self.url.clone(),
        }
    }
}
