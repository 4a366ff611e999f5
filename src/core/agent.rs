//! Agent records served by the directory, and the criteria used to query it.
//!
//! Agents are owned by the external directory. The pipeline treats every
//! record as a read-only snapshot fetched for a single call.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// A machine-matched capability an agent declares.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Capability {
    /// Capability identifier, e.g. `image_processing`.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Confidence that the agent actually provides it (0.0–1.0).
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    /// Free-form metadata.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

const fn default_confidence() -> f64 {
    1.0
}

impl Capability {
    /// Creates a capability with full confidence and a generated description.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            description: format!("{name} capability"),
            name,
            confidence: default_confidence(),
            metadata: BTreeMap::new(),
        }
    }
}

/// A human-facing skill label. Not used for scoring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    /// Optional stable identifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Skill name.
    pub name: String,
    /// What the skill does.
    #[serde(default)]
    pub description: String,
}

/// Organization operating an agent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provider {
    /// Organization name.
    #[serde(default)]
    pub organization: String,
    /// Organization homepage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Canonical form of a capability name: trimmed and lower-cased.
///
/// Query analyses and agent records are compared through this key.
#[must_use]
pub fn capability_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// An agent record as published by the directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Agent {
    /// Unique agent identifier.
    #[serde(alias = "agentId")]
    pub agent_id: String,
    /// Display name.
    pub name: String,
    /// Free-text description.
    #[serde(default)]
    pub description: String,
    /// Network address the agent accepts tasks on.
    pub url: String,
    /// Operating organization.
    #[serde(default)]
    pub provider: Provider,
    /// Declared capabilities: name → supported.
    #[serde(default)]
    pub capabilities: BTreeMap<String, bool>,
    /// Human-facing skills.
    #[serde(default)]
    pub skills: Vec<Skill>,
    /// Directory category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Directory tags.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Advertised cost per task, in the directory's unit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    /// Observed reliability (0.0–1.0).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reliability: Option<f64>,
}

impl Agent {
    /// Returns `true` if the agent declares `capability` as supported.
    ///
    /// Names are compared by [`capability_key`], so `"OCR"` and `" ocr "`
    /// are the same capability.
    #[must_use]
    pub fn supports(&self, capability: &str) -> bool {
        let wanted = capability_key(capability);
        self.capabilities
            .iter()
            .any(|(name, &enabled)| enabled && capability_key(name) == wanted)
    }

    /// Returns `true` if every capability in `required` is supported.
    ///
    /// An empty requirement set is satisfied by every agent.
    #[must_use]
    pub fn supports_all<'a, I>(&self, required: I) -> bool
    where
        I: IntoIterator<Item = &'a String>,
    {
        required.into_iter().all(|c| self.supports(c))
    }

    /// Names of the supported capabilities, in name order.
    pub fn supported_capabilities(&self) -> impl Iterator<Item = &str> {
        self.capabilities
            .iter()
            .filter(|&(_, &enabled)| enabled)
            .map(|(name, _)| name.as_str())
    }

    /// Returns the address used to invoke this agent.
    #[must_use]
    pub fn endpoint(&self) -> AgentEndpoint {
        AgentEndpoint {
            agent_id: self.agent_id.clone(),
            url: self.url.clone(),
        }
    }
}

/// Where to send a dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentEndpoint {
    /// Target agent.
    pub agent_id: String,
    /// Target URL.
    pub url: String,
}

/// Structured directory query, used without query analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentSearchCriteria {
    /// Capabilities the agent must all support.
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub capabilities: BTreeSet<String>,
    /// Skill names or ids; the agent must have at least one.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skills: Vec<String>,
    /// Required category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Tags the agent must all carry.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Maximum acceptable cost.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_cost: Option<f64>,
    /// Minimum acceptable reliability.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_reliability: Option<f64>,
    /// Maximum number of agents to return.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<usize>,
}

impl AgentSearchCriteria {
    /// Criteria that only constrain capabilities.
    #[must_use]
    pub fn with_capabilities<I, S>(capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            capabilities: capabilities.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Returns `true` if `agent` satisfies every constraint.
    ///
    /// Agents without a published cost pass `max_cost`; agents without a
    /// published reliability fail `min_reliability`.
    #[must_use]
    pub fn matches(&self, agent: &Agent) -> bool {
        if !agent.supports_all(&self.capabilities) {
            return false;
        }

        if !self.skills.is_empty() {
            let has_skill = agent.skills.iter().any(|skill| {
                self.skills.iter().any(|wanted| {
                    skill.name.eq_ignore_ascii_case(wanted)
                        || skill
                            .id
                            .as_deref()
                            .is_some_and(|id| id.eq_ignore_ascii_case(wanted))
                })
            });
            if !has_skill {
                return false;
            }
        }

        if let Some(category) = &self.category
            && !agent
                .category
                .as_deref()
                .is_some_and(|c| c.eq_ignore_ascii_case(category))
        {
            return false;
        }

        if !self
            .tags
            .iter()
            .all(|tag| agent.tags.iter().any(|t| t.eq_ignore_ascii_case(tag)))
        {
            return false;
        }

        if let (Some(max_cost), Some(cost)) = (self.max_cost, agent.cost)
            && cost > max_cost
        {
            return false;
        }

        if let Some(min) = self.min_reliability
            && !agent.reliability.is_some_and(|r| r >= min)
        {
            return false;
        }

        true
    }
}
