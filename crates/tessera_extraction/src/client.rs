use crate::error::ExtractError;
use async_trait::async_trait;

/// Parameters for a single generation request.
#[derive(Debug, Clone)]
pub struct GenerationParams {
    /// Maximum tokens to generate (clamped to provider limits).
    pub max_tokens: u32,
    /// Sampling temperature (0.0 - 2.0). Extraction wants it low.
    pub temperature: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            max_tokens: 2048,
            temperature: 0.2,
        }
    }
}

impl GenerationParams {
    pub fn from_config(llm: &tessera_core::LlmConfig) -> Self {
        Self {
            max_tokens: llm.max_tokens,
            temperature: llm.temperature,
        }
    }
}

/// A text-generation backend. The network call behind this trait is the
/// pipeline's only suspension point.
#[async_trait]
pub trait GenerativeClient: Send + Sync {
    /// Send one structured-generation request and return the raw model text.
    async fn generate(
        &self,
        system: &str,
        user_text: &str,
        params: GenerationParams,
    ) -> Result<String, ExtractError>;
}
