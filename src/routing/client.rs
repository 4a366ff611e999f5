//! Collaborator factories.
//!
//! Maps a [`CompassConfig`] to concrete provider, intent service, directory
//! and transport implementations.

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use super::analyzer::{IntentService, KeywordIntentService, LlmIntentService};
use super::compass::Compass;
use super::config::{AnalyzerKind, CompassConfig};
use super::directory::{AgentDirectory, HttpDirectory, InMemoryDirectory};
use super::prompt::PromptSet;
use super::provider::LlmProvider;
use super::transport::HttpTransport;
use crate::error::RoutingError;

/// Creates an [`LlmProvider`] based on the configured provider name.
///
/// # Supported Providers
///
/// - `"openai"` (default): OpenAI-compatible APIs via `async-openai`
///
/// # Errors
///
/// Returns [`RoutingError::UnsupportedProvider`] for unknown provider names,
/// and for `"openai"` when the crate is built without the `openai` feature.
pub fn create_provider(config: &CompassConfig) -> Result<Arc<dyn LlmProvider>, RoutingError> {
    match config.provider.as_str() {
        #[cfg(feature = "openai")]
        "openai" => Ok(Arc::new(super::providers::OpenAiProvider::new(config))),
        other => Err(RoutingError::UnsupportedProvider {
            name: other.to_string(),
        }),
    }
}

/// Creates the configured [`IntentService`].
///
/// # Errors
///
/// Returns [`RoutingError`] if the LLM analyzer is selected but its provider
/// cannot be created.
pub fn build_intent_service(config: &CompassConfig) -> Result<Arc<dyn IntentService>, RoutingError> {
    match config.analyzer {
        AnalyzerKind::Keyword => Ok(Arc::new(KeywordIntentService::new())),
        AnalyzerKind::Llm => {
            let provider = create_provider(config)?;
            let prompts = PromptSet::load(config.prompt_dir.as_deref());
            Ok(Arc::new(LlmIntentService::new(
                provider,
                config.analyzer_model.clone(),
                config.analyzer_max_tokens,
                prompts.analyzer,
            )))
        }
    }
}

/// Creates the agent directory.
///
/// A fixture file takes precedence over the configured ledger URL.
///
/// # Errors
///
/// Returns [`RoutingError::InvalidConfig`] when neither is available, and
/// [`RoutingError::Directory`] when the fixture cannot be loaded.
pub fn build_directory(
    config: &CompassConfig,
    fixture: Option<&Path>,
) -> Result<Arc<dyn AgentDirectory>, RoutingError> {
    if let Some(path) = fixture {
        return Ok(Arc::new(InMemoryDirectory::from_json_file(path)?));
    }

    match config.ledger_url.as_deref() {
        Some(url) => {
            debug!(ledger_url = url, "using HTTP ledger");
            Ok(Arc::new(HttpDirectory::new(
                url,
                config.ledger_api_key.clone(),
                config.request_timeout,
            )?))
        }
        None => Err(RoutingError::InvalidConfig {
            message: "no agent directory: pass --agents <file> or set COMPASS_LEDGER_URL"
                .to_string(),
        }),
    }
}

/// Builds a [`Compass`] over HTTP collaborators from configuration.
///
/// # Errors
///
/// Returns [`RoutingError`] if any collaborator cannot be created.
pub fn build_compass(
    config: &CompassConfig,
    fixture: Option<&Path>,
) -> Result<Compass, RoutingError> {
    let intent_service = build_intent_service(config)?;
    let directory = build_directory(config, fixture)?;
    let transport = Arc::new(HttpTransport::new(
        config.agent_token.clone(),
        config.request_timeout,
    )?);

    debug!(
        analyzer = intent_service.name(),
        max_agents = config.max_agents,
        dispatch_timeout = ?config.dispatch_timeout,
        "compass ready"
    );

    Ok(Compass::new(intent_service, directory, transport, config))
}
