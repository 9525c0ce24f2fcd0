use crate::{
    error::LlmError,
    types::{CompletionRequest, CompletionResponse, FragmentStream},
};
use async_trait::async_trait;

/// Core trait for LLM clients
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Complete a request (non-streaming)
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError>;

    /// Get provider name (e.g., "openai", "anthropic")
    fn provider_name(&self) -> &str;

    /// Get default model name (e.g., "gpt-4o", "claude-sonnet-4-5")
    fn model_name(&self) -> &str;

    /// Check if streaming is supported
    fn supports_streaming(&self) -> bool {
        false
    }

    /// Open a streaming completion.
    ///
    /// The returned stream yields normalized [`crate::types::Fragment`]s and
    /// ends after a `Fragment::Done` or an error.
    async fn stream_complete(&self, _request: CompletionRequest) -> Result<FragmentStream, LlmError> {
        Err(LlmError::not_supported("Streaming not supported"))
    }
}
