//! Completion exchange between the query analyzer and a language model.
//!
//! The analyzer only ever sends one instruction block and one input block
//! and expects a single JSON object back, so the types are shaped for that
//! exchange rather than for general chat.

use serde::Serialize;

/// Shape the model is asked to answer in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseShape {
    /// Free text.
    #[default]
    Text,
    /// A single JSON object.
    JsonObject,
}

/// One completion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    /// Model identifier, e.g. `gpt-4o-mini`.
    pub model: String,
    /// System-level instructions.
    pub instructions: String,
    /// The user-level input.
    pub input: String,
    /// Upper bound on generated tokens.
    pub max_tokens: u32,
    /// Requested answer shape.
    pub shape: ResponseShape,
}

impl CompletionRequest {
    /// A request for a JSON object answer.
    #[must_use]
    pub fn json(
        model: impl Into<String>,
        instructions: impl Into<String>,
        input: impl Into<String>,
        max_tokens: u32,
    ) -> Self {
        Self {
            model: model.into(),
            instructions: instructions.into(),
            input: input.into(),
            max_tokens,
            shape: ResponseShape::JsonObject,
        }
    }
}

/// Token accounting reported by the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TokenUsage {
    /// Tokens in the instructions and input.
    pub input_tokens: u32,
    /// Tokens generated.
    pub output_tokens: u32,
}

impl TokenUsage {
    /// Input plus output tokens.
    #[must_use]
    pub const fn total(self) -> u32 {
        self.input_tokens.saturating_add(self.output_tokens)
    }
}

/// The model's answer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    /// Generated text.
    pub text: String,
    /// Token accounting, when the provider reports it.
    pub usage: Option<TokenUsage>,
    /// Generation stopped at `max_tokens`.
    pub truncated: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_request() {
        let request = CompletionRequest::json("m", "classify", "<query>q</query>", 64);
        assert_eq!(request.shape, ResponseShape::JsonObject);
        assert_eq!(request.max_tokens, 64);
        assert_eq!(request.instructions, "classify");
    }

    #[test]
    fn test_usage_total_saturates() {
        let usage = TokenUsage {
            input_tokens: u32::MAX,
            output_tokens: 5,
        };
        assert_eq!(usage.total(), u32::MAX);
    }
}
