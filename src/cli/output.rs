//! Output formatting for CLI commands.
//!
//! Every command renders either human-readable text or pretty-printed JSON.

use std::fmt::Write;

use serde::Serialize;

use crate::core::{Agent, QueryAnalysis, RankedAgent, RouteResult, SearchResult};

/// Output format selected with `--format`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// Pretty-printed JSON.
    Json,
}

impl OutputFormat {
    /// Parses a format name, falling back to text for anything unrecognized.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => Self::Json,
            _ => Self::Text,
        }
    }

    /// Serializes `value` as pretty JSON.
    #[must_use]
    pub fn to_json<T: Serialize + ?Sized>(self, value: &T) -> String {
        serde_json::to_string_pretty(value).unwrap_or_else(|e| {
            serde_json::json!({ "error": format!("serialization failed: {e}") }).to_string()
        })
    }
}

fn join_or_dash<'a>(items: impl IntoIterator<Item = &'a String>) -> String {
    let joined = items
        .into_iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    if joined.is_empty() {
        "-".to_string()
    } else {
        joined
    }
}

fn write_analysis(out: &mut String, analysis: &QueryAnalysis) {
    let _ = writeln!(out, "Intent:      {}", analysis.intent);
    let _ = writeln!(
        out,
        "Required:    {}",
        join_or_dash(&analysis.required_capabilities)
    );
    let _ = writeln!(
        out,
        "Optional:    {}",
        join_or_dash(&analysis.optional_capabilities)
    );
    let _ = writeln!(out, "Complexity:  {:.2}", analysis.complexity);
}

/// Formats a query analysis.
#[must_use]
pub fn format_analysis(analysis: &QueryAnalysis, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            let mut out = String::new();
            write_analysis(&mut out, analysis);
            if analysis.is_degraded() {
                out.push_str("\n(analysis unavailable; no capability filter applied)\n");
            }
            out
        }
        OutputFormat::Json => format.to_json(analysis),
    }
}

fn write_ranked(out: &mut String, rank: usize, agent: &RankedAgent) {
    let _ = writeln!(
        out,
        "{rank:>2}. {:.2}  {:<24} {}",
        agent.relevance_score.value(),
        agent.agent_id,
        agent.name
    );
    if !agent.capabilities.is_empty() {
        let caps: Vec<&str> = agent.capabilities.iter().map(|c| c.name.as_str()).collect();
        let _ = writeln!(out, "          capabilities: {}", caps.join(", "));
    }
}

/// Formats a ranked search.
#[must_use]
pub fn format_search(result: &SearchResult, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            let mut out = String::new();
            write_analysis(&mut out, &result.query_analysis);
            out.push('\n');
            if result.agents.is_empty() {
                out.push_str("No matching agents.\n");
                return out;
            }
            let _ = writeln!(
                out,
                "Agents ({} of {} found):",
                result.agents.len(),
                result.total_found
            );
            for (i, agent) in result.agents.iter().enumerate() {
                write_ranked(&mut out, i + 1, agent);
            }
            out
        }
        OutputFormat::Json => format.to_json(result),
    }
}

/// Formats a routed query.
///
/// Text output is the synthesized answer followed by a one-line summary and
/// any per-agent failures.
#[must_use]
pub fn format_route(result: &RouteResult, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            let mut out = result.synthesized_response.clone();
            let _ = write!(
                out,
                "\n\n---\nIntent: {} | Agents: {} | Succeeded: {} | Time: {:.1}s",
                result.query_analysis.intent,
                result.agents_used.len(),
                result.successes(),
                result.elapsed.as_secs_f64()
            );
            for response in &result.raw_responses {
                if let Some(error) = response.error() {
                    let _ = write!(out, "\nAgent error: {}: {error}", response.agent_id);
                }
            }
            out.push('\n');
            out
        }
        OutputFormat::Json => format.to_json(result),
    }
}

/// Formats a directory listing.
#[must_use]
pub fn format_agent_list(agents: &[Agent], format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            if agents.is_empty() {
                return "No agents found.\n".to_string();
            }
            let mut out = format!("{} agent(s):\n", agents.len());
            for agent in agents {
                let caps: Vec<&str> = agent.supported_capabilities().collect();
                let _ = writeln!(
                    out,
                    "  {:<24} {:<28} [{}]",
                    agent.agent_id,
                    agent.name,
                    caps.join(", ")
                );
            }
            out
        }
        OutputFormat::Json => format.to_json(agents),
    }
}

/// Formats a single agent record.
#[must_use]
pub fn format_agent(agent: &Agent, format: OutputFormat) -> String {
    match format {
        OutputFormat::Text => {
            let mut out = String::new();
            let _ = writeln!(out, "{} ({})", agent.name, agent.agent_id);
            if !agent.description.is_empty() {
                let _ = writeln!(out, "{}", agent.description);
            }
            out.push('\n');
            let _ = writeln!(out, "URL:          {}", agent.url);
            let _ = writeln!(out, "Provider:     {}", agent.provider.organization);
            let caps: Vec<&str> = agent.supported_capabilities().collect();
            let _ = writeln!(
                out,
                "Capabilities: {}",
                if caps.is_empty() {
                    "-".to_string()
                } else {
                    caps.join(", ")
                }
            );
            if let Some(category) = &agent.category {
                let _ = writeln!(out, "Category:     {category}");
            }
            if !agent.tags.is_empty() {
                let _ = writeln!(out, "Tags:         {}", agent.tags.join(", "));
            }
            if let Some(cost) = agent.cost {
                let _ = writeln!(out, "Cost:         {cost}");
            }
            if let Some(reliability) = agent.reliability {
                let _ = writeln!(out, "Reliability:  {reliability:.2}");
            }
            if !agent.skills.is_empty() {
                out.push_str("Skills:\n");
                for skill in &agent.skills {
                    let _ = writeln!(out, "  - {}: {}", skill.name, skill.description);
                }
            }
            out
        }
        OutputFormat::Json => format.to_json(agent),
    }
}
