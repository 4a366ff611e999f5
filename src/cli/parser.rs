//! Command-line argument parsing.
//!
//! Defines the CLI structure using clap derive macros.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// compass-rs: route natural-language queries to the agents that can answer them.
///
/// Analyzes a query, ranks agents from a directory by capability, fans the
/// query out to the best few concurrently, and merges their answers.
#[derive(Parser, Debug)]
#[command(name = "compass-rs")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// JSON file of agents to use instead of a ledger.
    ///
    /// Either an array of agents or an object with an `agents` array.
    #[arg(short, long, global = true, env = "COMPASS_AGENTS")]
    pub agents: Option<PathBuf>,

    /// Agent ledger base URL.
    #[arg(long, global = true, env = "COMPASS_LEDGER_URL")]
    pub ledger_url: Option<String>,

    /// Query analyzer: llm or keyword.
    ///
    /// Defaults to llm when an API key is set, keyword otherwise.
    #[arg(long, global = true, env = "COMPASS_ANALYZER")]
    pub analyzer: Option<String>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    ///
    /// `RUST_LOG` takes precedence when set.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output format (text, json).
    #[arg(long, default_value = "text", global = true)]
    pub format: String,

    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show how a query is interpreted.
    ///
    /// Prints the intent, required and optional capabilities, and complexity.
    #[command(after_help = r#"Examples:
  compass-rs analyze "Generate a mountain landscape"
  compass-rs --analyzer keyword analyze "Summarize this document"
  compass-rs --format json analyze "Compare rust and go" | jq .required_capabilities
"#)]
    Analyze {
        /// Query text.
        query: String,
    },

    /// Rank agents for a query without contacting them.
    #[command(after_help = r#"Examples:
  compass-rs -a agents.json search "translate a contract"
  compass-rs -a agents.json search "edit my photo" -k 3 --min-score 0.8
  compass-rs -a agents.json search "write a haiku" --prefer poet-1 --prefer poet-2
"#)]
    Search {
        /// Query text.
        query: String,

        /// Maximum number of agents to return.
        #[arg(short = 'k', long)]
        top_k: Option<usize>,

        /// Minimum relevance score (0.0-1.0).
        #[arg(long)]
        min_score: Option<f64>,

        /// Agent ids to boost (repeatable).
        #[arg(long = "prefer", value_name = "AGENT_ID")]
        preferred: Vec<String>,
    },

    /// Route a query to the best agents and merge their answers.
    #[command(after_help = r#"Examples:
  compass-rs -a agents.json route "Generate a photorealistic mountain landscape"
  compass-rs -a agents.json route "Summarize the report" --max-agents 2 --no-synthesis
  compass-rs route "Plan a trip" --context '{"locale": "fr"}' --timeout-ms 5000
  compass-rs --format json route "Find flights" | jq '.raw_responses[].error'
"#)]
    Route {
        /// Query text.
        query: String,

        /// Maximum number of agents to dispatch to.
        #[arg(short, long)]
        max_agents: Option<usize>,

        /// Agent ids to boost (repeatable).
        #[arg(long = "prefer", value_name = "AGENT_ID")]
        preferred: Vec<String>,

        /// Return the best answer as is instead of merging.
        #[arg(long)]
        no_synthesis: bool,

        /// JSON object forwarded to every agent.
        #[arg(long)]
        context: Option<String>,

        /// Per-agent timeout in milliseconds.
        #[arg(long, env = "COMPASS_DISPATCH_TIMEOUT_MS")]
        timeout_ms: Option<u64>,
    },

    /// List agents matching structured criteria (no query analysis).
    #[command(after_help = r#"Examples:
  compass-rs -a agents.json agents
  compass-rs -a agents.json agents --capability image_processing --min-reliability 0.9
  compass-rs -a agents.json agents --category research --tag web --limit 5
"#)]
    Agents {
        /// Required capability (repeatable; all must match).
        #[arg(long = "capability", value_name = "NAME")]
        capabilities: Vec<String>,

        /// Skill name or id (repeatable; any may match).
        #[arg(long = "skill", value_name = "NAME")]
        skills: Vec<String>,

        /// Required category.
        #[arg(long)]
        category: Option<String>,

        /// Required tag (repeatable; all must match).
        #[arg(long = "tag", value_name = "TAG")]
        tags: Vec<String>,

        /// Maximum acceptable cost.
        #[arg(long)]
        max_cost: Option<f64>,

        /// Minimum acceptable reliability (0.0-1.0).
        #[arg(long)]
        min_reliability: Option<f64>,

        /// Maximum number of agents to list.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Show one agent's directory record.
    Agent {
        /// Agent id.
        id: String,
    },

    /// Write the default analyzer prompt template for customization.
    #[command(after_help = r#"Examples:
  compass-rs init-prompts
  compass-rs init-prompts --dir ./prompts
  COMPASS_PROMPT_DIR=./prompts compass-rs analyze "..."
"#)]
    InitPrompts {
        /// Target directory for prompt templates.
        ///
        /// Defaults to `<config dir>/compass-rs/prompts/`.
        #[arg(long)]
        dir: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parse() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_route_flags() {
        let cli = Cli::try_parse_from([
            "compass-rs",
            "-vv",
            "route",
            "draw a cat",
            "--prefer",
            "a",
            "--prefer",
            "b",
            "--no-synthesis",
            "--max-agents",
            "2",
        ])
        .unwrap_or_else(|_| unreachable!());
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Commands::Route {
                query,
                preferred,
                no_synthesis,
                max_agents,
                ..
            } => {
                assert_eq!(query, "draw a cat");
                assert_eq!(preferred, vec!["a", "b"]);
                assert!(no_synthesis);
                assert_eq!(max_agents, Some(2));
            }
            other => unreachable!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_global_agents_after_subcommand() {
        let cli = Cli::try_parse_from(["compass-rs", "agents", "--agents", "f.json", "--limit", "1"])
            .unwrap_or_else(|_| unreachable!());
        assert_eq!(cli.agents, Some(PathBuf::from("f.json")));
    }
}
