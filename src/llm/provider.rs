//! Provider-agnostic completion interface.

use async_trait::async_trait;

use crate::error::LlmError;

/// A single-turn completion request.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// System instructions sent ahead of the prompt.
    pub system: Option<String>,
    /// The user prompt.
    pub prompt: String,
    /// Upper bound on generated tokens.
    pub max_tokens: u64,
    /// Sampling temperature, provider default when unset.
    pub temperature: Option<f64>,
}

impl CompletionRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            max_tokens: 1024,
            temperature: None,
        }
    }

    /// Builder: set system instructions.
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    /// Builder: set max tokens.
    pub fn with_max_tokens(mut self, max_tokens: u64) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Builder: set temperature.
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Completion text returned by a provider.
#[derive(Debug, Clone)]
pub struct CompletionResponse {
    pub content: String,
}

/// Backend-agnostic LLM provider.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Model identifier, for logging.
    fn model_name(&self) -> &str;

    /// Run a single-turn completion.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_builder_sets_fields() {
        let req = CompletionRequest::new("hello")
            .with_system("be terse")
            .with_max_tokens(500)
            .with_temperature(0.0);
        assert_eq!(req.prompt, "hello");
        assert_eq!(req.system.as_deref(), Some("be terse"));
        assert_eq!(req.max_tokens, 500);
        assert_eq!(req.temperature, Some(0.0));
    }

    #[test]
    fn request_defaults() {
        let req = CompletionRequest::new("x");
        assert!(req.system.is_none());
        assert!(req.temperature.is_none());
        assert_eq!(req.max_tokens, 1024);
    }
}
