//! Language-model backend seam used by the LLM query analyzer.

use async_trait::async_trait;

use super::message::{Completion, CompletionRequest};
use crate::error::RoutingError;

/// A language-model backend.
///
/// Implementations own transport concerns (SDK, HTTP, timeouts) for one
/// provider.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name (e.g., `"openai"`).
    fn name(&self) -> &'static str;

    /// Runs one completion.
    ///
    /// # Errors
    ///
    /// Returns [`RoutingError::ApiRequest`] when the call fails or times out.
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, RoutingError>;
}
