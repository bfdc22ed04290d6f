//! Gemini provider: structured generation via the generateContent
//! endpoint.

use crate::client::{GenerationParams, GenerativeClient};
use crate::error::ExtractError;
use crate::retry::with_retry;
use reqwest::Client;
use serde_json::{json, Value};
use std::env;
use std::time::Duration;
use tessera_core::{LlmConfig, RetryConfig};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    retry: RetryConfig,
}

impl GeminiClient {
    /// Build a client from config. The API credential comes from the
    /// `GEMINI_API_KEY` environment variable; a missing key is an auth
    /// failure up front rather than a rejected request later.
    pub fn new(llm: &LlmConfig, retry: RetryConfig) -> Result<Self, ExtractError> {
        let api_key = env::var("GEMINI_API_KEY")
            .map_err(|_| ExtractError::Auth("GEMINI_API_KEY is not set".to_string()))?;
        let base_url = llm
            .base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let client = Client::builder()
            .timeout(Duration::from_secs(llm.request_timeout_secs))
            .build()
            .map_err(|e| ExtractError::Network(e.to_string()))?;

        Ok(Self {
            client,
            api_key,
            base_url,
            model: llm.model.clone(),
            retry,
        })
    }
}

#[async_trait::async_trait]
impl GenerativeClient for GeminiClient {
    #[tracing::instrument(skip(self, system, user_text, params), fields(model = %self.model))]
    async fn generate(
        &self,
        system: &str,
        user_text: &str,
        params: GenerationParams,
    ) -> Result<String, ExtractError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let payload = json!({
            "systemInstruction": {
                "parts": [{"text": system}]
            },
            "contents": [{
                "role": "user",
                "parts": [{"text": user_text}]
            }],
            "generationConfig": {
                "maxOutputTokens": params.max_tokens,
                "temperature": params.temperature
            }
        });

        tracing::debug!(
            "Gemini request: max_tokens={}, temperature={:.2}, input {} chars",
            params.max_tokens,
            params.temperature,
            user_text.len()
        );

        let response = with_retry(&self.retry, "Gemini", || async {
            self.client.post(&url).json(&payload).send().await
        })
        .await?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| ExtractError::MalformedResponse(format!("invalid response body: {}", e)))?;

        let parts = body["candidates"][0]["content"]["parts"]
            .as_array()
            .ok_or_else(|| {
                ExtractError::MalformedResponse("response has no candidate parts".to_string())
            })?;

        let text: String = parts
            .iter()
            .filter_map(|p| p["text"].as_str())
            .collect::<Vec<_>>()
            .join("");

        if text.is_empty() {
            return Err(ExtractError::MalformedResponse(
                "candidate contains no text".to_string(),
            ));
        }

        tracing::debug!(
            "Gemini raw response (first 500 chars): {}",
            &text[..text.len().min(500)]
        );
        Ok(text)
    }
}
