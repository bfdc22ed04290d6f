//! Mock provider: scripted responses for testing without API keys.

use crate::client::{GenerationParams, GenerativeClient};
use crate::error::ExtractError;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Plays back a fixed script of responses and counts invocations, so
/// tests can assert how often the pipeline actually reached the
/// network boundary (e.g. the debounce tests).
#[derive(Debug, Default)]
pub struct MockClient {
    script: Vec<Result<String, ExtractError>>,
    cursor: AtomicUsize,
}

impl MockClient {
    /// A client that plays `script` in order. Once the script is
    /// exhausted, the last element repeats.
    pub fn new(script: Vec<Result<String, ExtractError>>) -> Self {
        Self {
            script,
            cursor: AtomicUsize::new(0),
        }
    }

    /// A client that always returns `text`.
    pub fn returning(text: &str) -> Self {
        Self::new(vec![Ok(text.to_string())])
    }

    /// A client that always fails with `err`.
    pub fn failing(err: ExtractError) -> Self {
        Self::new(vec![Err(err)])
    }

    /// How many times `generate` has been invoked.
    pub fn calls(&self) -> usize {
        self.cursor.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl GenerativeClient for MockClient {
    async fn generate(
        &self,
        _system: &str,
        _user_text: &str,
        _params: GenerationParams,
    ) -> Result<String, ExtractError> {
        let index = self.cursor.fetch_add(1, Ordering::SeqCst);
        // Simulated network latency
        tokio::time::sleep(tokio::time::Duration::from_millis(20)).await;
        self.script
            .get(index.min(self.script.len().saturating_sub(1)))
            .cloned()
            .unwrap_or_else(|| {
                Err(ExtractError::Network("mock script is empty".to_string()))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_script_plays_in_order_then_repeats() {
        let client = MockClient::new(vec![
            Ok("first".to_string()),
            Err(ExtractError::RateLimited),
        ]);
        let params = GenerationParams::default();
        assert_eq!(
            client.generate("s", "u", params.clone()).await.unwrap(),
            "first"
        );
        assert_eq!(
            client.generate("s", "u", params.clone()).await.unwrap_err(),
            ExtractError::RateLimited
        );
        // Exhausted script repeats the last element
        assert_eq!(
            client.generate("s", "u", params).await.unwrap_err(),
            ExtractError::RateLimited
        );
        assert_eq!(client.calls(), 3);
    }

    #[tokio::test]
    async fn test_returning_counts_calls() {
        let client = MockClient::returning("hello");
        assert_eq!(client.calls(), 0);
        let _ = client.generate("s", "u", GenerationParams::default()).await;
        let _ = client.generate("s", "u", GenerationParams::default()).await;
        assert_eq!(client.calls(), 2);
    }
}
