//! Per-agent dispatch results and the aggregate results returned to callers.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::analysis::QueryAnalysis;
use super::ranking::RankedAgent;

/// Outcome of one dispatch: content on success, an error message otherwise.
///
/// Serialized untagged so a response reads as `{"agent_id", "content"}` or
/// `{"agent_id", "error"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DispatchOutcome {
    /// The agent answered.
    Succeeded {
        /// Opaque payload returned by the agent.
        content: serde_json::Value,
    },
    /// The agent failed or timed out.
    Failed {
        /// What went wrong.
        error: String,
    },
}

/// Result of dispatching the query to a single agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResponse {
    /// Agent that was dispatched to.
    pub agent_id: String,
    /// What happened.
    #[serde(flatten)]
    pub outcome: DispatchOutcome,
}

impl AgentResponse {
    /// A successful response.
    #[must_use]
    pub fn success(agent_id: impl Into<String>, content: serde_json::Value) -> Self {
        Self {
            agent_id: agent_id.into(),
            outcome: DispatchOutcome::Succeeded { content },
        }
    }

    /// A failed response.
    #[must_use]
    pub fn failure(agent_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            outcome: DispatchOutcome::Failed {
                error: error.into(),
            },
        }
    }

    /// Returns `true` if the agent answered.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self.outcome, DispatchOutcome::Succeeded { .. })
    }

    /// The returned content, if any.
    #[must_use]
    pub const fn content(&self) -> Option<&serde_json::Value> {
        match &self.outcome {
            DispatchOutcome::Succeeded { content } => Some(content),
            DispatchOutcome::Failed { .. } => None,
        }
    }

    /// The error message, if any.
    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match &self.outcome {
            DispatchOutcome::Succeeded { .. } => None,
            DispatchOutcome::Failed { error } => Some(error),
        }
    }

    /// Content rendered as text: strings verbatim, other JSON pretty-printed.
    #[must_use]
    pub fn content_text(&self) -> Option<String> {
        self.content().map(render_content)
    }
}

/// Renders opaque agent content as text.
#[must_use]
pub fn render_content(content: &serde_json::Value) -> String {
    match content {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}

/// Final result of routing one query.
#[derive(Debug, Clone, Serialize)]
pub struct RouteResult {
    /// Agents dispatched to, in ranking order.
    pub agents_used: Vec<String>,
    /// Merged answer.
    pub synthesized_response: String,
    /// One response per entry of `agents_used`, same order.
    pub raw_responses: Vec<AgentResponse>,
    /// Analysis the routing decision was based on.
    pub query_analysis: QueryAnalysis,
    /// Wall-clock time for the whole pipeline.
    #[serde(serialize_with = "serialize_duration")]
    pub elapsed: Duration,
}

impl RouteResult {
    /// Number of agents that answered successfully.
    #[must_use]
    pub fn successes(&self) -> usize {
        self.raw_responses.iter().filter(|r| r.is_success()).count()
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn serialize_duration<S>(d: &Duration, s: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    s.serialize_f64(d.as_secs_f64())
}

/// Result of a ranked search without dispatch.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    /// Ranked agents, best first, truncated to the requested maximum.
    pub agents: Vec<RankedAgent>,
    /// Candidates that met the minimum score before truncation.
    pub total_found: usize,
    /// Analysis the ranking was based on.
    pub query_analysis: QueryAnalysis,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_serializes_content_only() {
        let r = AgentResponse::success("a", serde_json::json!("done"));
        let json = serde_json::to_value(&r).unwrap_or_default();
        assert_eq!(json["agent_id"], "a");
        assert_eq!(json["content"], "done");
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_failure_serializes_error_only() {
        let r = AgentResponse::failure("b", "connection refused");
        let json = serde_json::to_value(&r).unwrap_or_default();
        assert_eq!(json["error"], "connection refused");
        assert!(json.get("content").is_none());
        assert!(!r.is_success());
        assert_eq!(r.error(), Some("connection refused"));
    }

    #[test]
    fn test_failure_deserializes() {
        let r: AgentResponse = serde_json::from_str(r#"{"agent_id": "c", "error": "boom"}"#)
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(r.error(), Some("boom"));
    }

    #[test]
    fn test_render_content() {
        assert_eq!(render_content(&serde_json::json!("plain")), "plain");
        assert!(render_content(&serde_json::json!({"k": 1})).contains("\"k\": 1"));
        assert_eq!(render_content(&serde_json::Value::Null), "");
    }
}
