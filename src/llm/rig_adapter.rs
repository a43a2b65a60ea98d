//! Bridges rig's `CompletionModel` to our `LlmProvider` trait.

use async_trait::async_trait;
use rig::agent::AgentBuilder;
use rig::completion::{CompletionModel, Prompt};
use tracing::debug;

use super::provider::{CompletionRequest, CompletionResponse, LlmProvider};
use crate::error::LlmError;

/// Wraps a rig completion model. A fresh agent is built per request so the
/// system prompt and token budget can vary between calls.
pub struct RigAdapter<M> {
    model: M,
    model_name: String,
}

impl<M> RigAdapter<M> {
    pub fn new(model: M, model_name: &str) -> Self {
        Self {
            model,
            model_name: model_name.to_string(),
        }
    }
}

#[async_trait]
impl<M> LlmProvider for RigAdapter<M>
where
    M: CompletionModel + Send + Sync + 'static,
{
    fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let mut builder = AgentBuilder::new(self.model.clone()).max_tokens(request.max_tokens);
        if let Some(ref system) = request.system {
            builder = builder.preamble(system);
        }
        if let Some(temperature) = request.temperature {
            builder = builder.temperature(temperature);
        }
        let agent = builder.build();

        debug!(model = %self.model_name, prompt_len = request.prompt.len(), "Sending completion");

        let content = agent
            .prompt(request.prompt)
            .await
            .map_err(|e| LlmError::RequestFailed {
                provider: self.model_name.clone(),
                reason: e.to_string(),
            })?;

        non_empty(&self.model_name, content).map(|content| CompletionResponse { content })
    }
}

/// Reject completions with no text; they can never parse.
fn non_empty(provider: &str, content: String) -> Result<String, LlmError> {
    if content.trim().is_empty() {
        return Err(LlmError::InvalidResponse {
            provider: provider.to_string(),
            reason: "empty completion".to_string(),
        });
    }
    Ok(content)
}
