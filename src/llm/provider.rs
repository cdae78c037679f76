use async_trait::async_trait;

use crate::core::errors::ApiError;

/// A text-in/text-out language-model backend.
///
/// One local variant (Ollama) and hosted variants (OpenAI, Cohere) share this
/// shape; callers never see which one answered beyond `name()`.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// return the provider name (e.g. "ollama", "openai", "cohere")
    fn name(&self) -> &str;

    /// check if the provider is healthy/reachable
    async fn health_check(&self) -> Result<bool, ApiError>;

    /// single completion: prompt plus optional system message
    async fn invoke(&self, prompt: &str, system: Option<&str>) -> Result<String, ApiError>;
}
