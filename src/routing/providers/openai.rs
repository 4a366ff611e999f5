//! `OpenAI` backend for query analysis, via `async-openai`.
//!
//! Any `OpenAI`-compatible endpoint works through the base URL override in
//! [`CompassConfig`].

use std::time::Duration;

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::error::OpenAIError;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
    ChatCompletionRequestSystemMessageContent, ChatCompletionRequestUserMessage,
    ChatCompletionRequestUserMessageContent, CreateChatCompletionRequest, FinishReason,
    ResponseFormat,
};
use async_trait::async_trait;
use tracing::trace;

use crate::error::RoutingError;
use crate::routing::config::CompassConfig;
use crate::routing::message::{Completion, CompletionRequest, ResponseShape, TokenUsage};
use crate::routing::provider::LlmProvider;

/// `OpenAI`-compatible completion backend.
pub struct OpenAiProvider {
    client: Client<OpenAIConfig>,
    timeout: Duration,
}

impl OpenAiProvider {
    /// Creates a provider from the API key, base URL and request timeout in
    /// `config`.
    #[must_use]
    pub fn new(config: &CompassConfig) -> Self {
        let mut openai_config =
            OpenAIConfig::new().with_api_key(config.api_key.clone().unwrap_or_default());

        if let Some(ref base_url) = config.base_url {
            openai_config = openai_config.with_api_base(base_url);
        }

        Self {
            client: Client::with_config(openai_config),
            timeout: config.request_timeout,
        }
    }

    fn to_openai(request: &CompletionRequest) -> CreateChatCompletionRequest {
        let system = ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
            content: ChatCompletionRequestSystemMessageContent::Text(request.instructions.clone()),
            name: None,
        });
        let user = ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
            content: ChatCompletionRequestUserMessageContent::Text(request.input.clone()),
            name: None,
        });

        CreateChatCompletionRequest {
            model: request.model.clone(),
            messages: vec![system, user],
            max_completion_tokens: Some(request.max_tokens),
            response_format: match request.shape {
                ResponseShape::JsonObject => Some(ResponseFormat::JsonObject),
                ResponseShape::Text => None,
            },
            ..Default::default()
        }
    }

    fn api_error(err: &OpenAIError) -> RoutingError {
        let status = match err {
            OpenAIError::Reqwest(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        };
        RoutingError::ApiRequest {
            message: err.to_string(),
            status,
        }
    }
}

impl std::fmt::Debug for OpenAiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiProvider")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, RoutingError> {
        trace!(model = %request.model, input_len = request.input.len(), "sending completion");

        let chat = self.client.chat();
        let call = chat.create(Self::to_openai(request));
        let response = tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| RoutingError::ApiRequest {
                message: format!(
                    "completion timed out after {} ms",
                    self.timeout.as_millis()
                ),
                status: None,
            })?
            .map_err(|e| Self::api_error(&e))?;

        let choice = response.choices.into_iter().next();
        let truncated = choice
            .as_ref()
            .is_some_and(|c| matches!(c.finish_reason, Some(FinishReason::Length)));
        let text = choice
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        Ok(Completion {
            text,
            usage: response.usage.map(|u| TokenUsage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            }),
            truncated,
        })
    }
}
