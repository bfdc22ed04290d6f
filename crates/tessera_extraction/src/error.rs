use thiserror::Error;

/// Failure modes of an extraction call.
///
/// Any of these leaves the entry's `is_analyzed` flag false so a later
/// retry is possible. Partial decode success (patterns readable but the
/// rest malformed) is treated as total failure to keep the record set
/// consistent.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    /// Transport failure or timeout, including 5xx upstream errors.
    #[error("network error: {0}")]
    Network(String),

    /// The model reply is not valid JSON or is missing required fields.
    #[error("malformed model response: {0}")]
    MalformedResponse(String),

    #[error("rate limited by provider")]
    RateLimited,

    /// Missing or rejected API credential.
    #[error("authentication failed: {0}")]
    Auth(String),
}

impl ExtractError {
    /// Transient errors that may succeed on retry. Auth failures and
    /// malformed responses will not get better by resending.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ExtractError::Network(_) | ExtractError::RateLimited)
    }
}
