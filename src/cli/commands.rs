//! CLI command implementations.
//!
//! Each command builds a [`Compass`] from the environment plus CLI
//! overrides, runs it on a fresh tokio runtime, and renders the result.

use std::fmt::Write as FmtWrite;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cli::output::{
    OutputFormat, format_agent, format_agent_list, format_analysis, format_route, format_search,
};
use crate::cli::parser::{Cli, Commands};
use crate::core::AgentSearchCriteria;
use crate::error::{CommandError, Result};
use crate::routing::{
    Compass, CompassConfig, PromptSet, QueryAnalyzer, RouteOptions, SearchOptions, build_compass,
    build_intent_service, validate_query,
};

/// Parameters for the route command.
#[derive(Debug, Clone)]
pub struct RouteParams<'a> {
    /// Query text.
    pub query: &'a str,
    /// Maximum number of agents to dispatch to.
    pub max_agents: Option<usize>,
    /// Agent ids to boost.
    pub preferred: &'a [String],
    /// Return the best answer as is.
    pub no_synthesis: bool,
    /// Raw JSON context forwarded to every agent.
    pub context: Option<&'a str>,
    /// Per-agent timeout in milliseconds.
    pub timeout_ms: Option<u64>,
}

/// Executes the parsed CLI command.
///
/// # Returns
///
/// Result with output string on success.
///
/// # Errors
///
/// Returns an error if the command fails to execute.
pub fn execute(cli: &Cli) -> Result<String> {
    let format = OutputFormat::parse(&cli.format);

    match &cli.command {
        Commands::InitPrompts { dir } => cmd_init_prompts(dir.as_deref(), format),
        Commands::Analyze { query } => {
            let config = load_config(cli)?;
            let analyzer = QueryAnalyzer::new(build_intent_service(&config)?);
            cmd_analyze(&analyzer, query, format)
        }
        Commands::Search {
            query,
            top_k,
            min_score,
            preferred,
        } => {
            let compass = open_compass(cli)?;
            let options = SearchOptions {
                query: query.clone(),
                max_results: *top_k,
                min_relevance_score: *min_score,
                preferred_agents: preferred.clone(),
            };
            cmd_search(&compass, &options, format)
        }
        Commands::Route {
            query,
            max_agents,
            preferred,
            no_synthesis,
            context,
            timeout_ms,
        } => {
            let compass = open_compass(cli)?;
            let params = RouteParams {
                query,
                max_agents: *max_agents,
                preferred,
                no_synthesis: *no_synthesis,
                context: context.as_deref(),
                timeout_ms: *timeout_ms,
            };
            cmd_route(&compass, &params, format)
        }
        Commands::Agents {
            capabilities,
            skills,
            category,
            tags,
            max_cost,
            min_reliability,
            limit,
        } => {
            let compass = open_compass(cli)?;
            let mut criteria = AgentSearchCriteria::with_capabilities(capabilities);
            criteria.skills.clone_from(skills);
            criteria.category.clone_from(category);
            criteria.tags.clone_from(tags);
            criteria.max_cost = *max_cost;
            criteria.min_reliability = *min_reliability;
            criteria.limit = *limit;
            cmd_agents(&compass, &criteria, format)
        }
        Commands::Agent { id } => {
            let compass = open_compass(cli)?;
            cmd_agent(&compass, id, format)
        }
    }
}

/// Resolves configuration from the environment and global flags.
fn load_config(cli: &Cli) -> Result<CompassConfig> {
    let mut builder = CompassConfig::builder();
    if let Some(analyzer) = &cli.analyzer {
        builder = builder.analyzer(analyzer);
    }
    if let Some(url) = &cli.ledger_url {
        builder = builder.ledger_url(url);
    }

    builder.from_env().build().map_err(|e| {
        CommandError::ExecutionFailed(format!("Configuration error: {e}")).into()
    })
}

fn open_compass(cli: &Cli) -> Result<Compass> {
    let config = load_config(cli)?;
    build_compass(&config, cli.agents.as_deref()).map_err(Into::into)
}

/// Creates the tokio runtime used as the sync/async bridge.
fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Runtime::new().map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to create async runtime: {e}")).into()
    })
}

/// Analyzes a query without touching the agent directory.
fn cmd_analyze(analyzer: &QueryAnalyzer, query: &str, format: OutputFormat) -> Result<String> {
    validate_query(query)?;
    let analysis = runtime()?.block_on(analyzer.analyze(query));
    Ok(format_analysis(&analysis, format))
}

fn cmd_search(compass: &Compass, options: &SearchOptions, format: OutputFormat) -> Result<String> {
    if let Some(min) = options.min_relevance_score
        && !(0.0..=1.0).contains(&min)
    {
        return Err(CommandError::InvalidArgument(format!(
            "--min-score must be between 0.0 and 1.0, got {min}"
        ))
        .into());
    }

    let result = runtime()?.block_on(compass.search(options))?;
    Ok(format_search(&result, format))
}

fn cmd_route(compass: &Compass, params: &RouteParams<'_>, format: OutputFormat) -> Result<String> {
    let context = params.context.map(parse_context).transpose()?;

    if params.max_agents == Some(0) {
        return Err(CommandError::InvalidArgument("--max-agents must be at least 1".to_string()).into());
    }
    if params.timeout_ms == Some(0) {
        return Err(CommandError::InvalidArgument("--timeout-ms must be at least 1".to_string()).into());
    }

    let options = RouteOptions {
        query: params.query.to_string(),
        preferred_agents: params.preferred.to_vec(),
        max_agents: params.max_agents,
        synthesize_results: !params.no_synthesis,
        context,
        dispatch_timeout: params.timeout_ms.map(Duration::from_millis),
    };

    let result = runtime()?.block_on(compass.route(&options))?;
    Ok(format_route(&result, format))
}

/// Parses `--context`, which must be a JSON object.
fn parse_context(raw: &str) -> Result<serde_json::Value> {
    let value: serde_json::Value = serde_json::from_str(raw)
        .map_err(|e| CommandError::InvalidArgument(format!("--context is not valid JSON: {e}")))?;
    if !value.is_object() {
        return Err(
            CommandError::InvalidArgument("--context must be a JSON object".to_string()).into(),
        );
    }
    Ok(value)
}

fn cmd_agents(
    compass: &Compass,
    criteria: &AgentSearchCriteria,
    format: OutputFormat,
) -> Result<String> {
    let agents = runtime()?.block_on(compass.find_agents(criteria));
    Ok(format_agent_list(&agents, format))
}

fn cmd_agent(compass: &Compass, agent_id: &str, format: OutputFormat) -> Result<String> {
    let agent = runtime()?
        .block_on(compass.agent_details(agent_id))
        .ok_or_else(|| CommandError::ExecutionFailed(format!("agent not found: {agent_id}")))?;
    Ok(format_agent(&agent, format))
}

/// Writes the default prompt templates for customization.
fn cmd_init_prompts(dir: Option<&Path>, format: OutputFormat) -> Result<String> {
    let target_dir = dir
        .map(PathBuf::from)
        .or_else(PromptSet::default_dir)
        .ok_or_else(|| {
            CommandError::ExecutionFailed(
                "Could not determine config directory for default prompt path".to_string(),
            )
        })?;

    let written = PromptSet::write_defaults(&target_dir).map_err(|e| {
        CommandError::ExecutionFailed(format!("Failed to write prompt templates: {e}"))
    })?;

    match format {
        OutputFormat::Text => {
            if written.is_empty() {
                return Ok(format!(
                    "All prompt templates already exist in: {}\n",
                    target_dir.display()
                ));
            }
            let mut output = format!(
                "Wrote {} prompt template(s) to: {}\n",
                written.len(),
                target_dir.display()
            );
            for path in &written {
                let _ = writeln!(
                    output,
                    "  {}",
                    path.file_name()
                        .and_then(|n| n.to_str())
                        .unwrap_or("unknown")
                );
            }
            output.push_str("\nEdit these files to customize the query analyzer prompt.\n");
            Ok(output)
        }
        OutputFormat::Json => {
            let json = serde_json::json!({
                "directory": target_dir.to_string_lossy(),
                "written": written.iter().map(|p| p.to_string_lossy().into_owned()).collect::<Vec<_>>(),
                "count": written.len()
            });
            Ok(format.to_json(&json))
        }
    }
}
