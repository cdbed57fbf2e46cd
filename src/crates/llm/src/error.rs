//! Error types for the LLM gateway client.

use thiserror::Error;

/// Result type for LLM operations.
pub type Result<T> = std::result::Result<T, LlmError>;

/// Errors that can occur when calling the gateway.
#[derive(Debug, Error)]
pub enum LlmError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// API authentication failed.
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    /// API key not found in environment.
    #[error("API key not found: {0}")]
    ApiKeyNotFound(String),

    /// Rate limit exceeded.
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Response did not match the expected shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Request timed out.
    #[error("Request timeout: {0}")]
    Timeout(String),

    /// Gateway-reported error.
    #[error("Provider error: {0}")]
    ProviderError(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl LlmError {
    /// Whether a retry with backoff is worthwhile for this error.
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::Timeout(_) | LlmError::RateLimitExceeded(_) => true,
            LlmError::HttpError(err) => err.is_timeout() || err.is_connect(),
            _ => false,
        }
    }
}

impl From<serde_json::Error> for LlmError {
    fn from(err: serde_json::Error) -> Self {
        LlmError::InvalidResponse(err.to_string())
    }
}

/// Node code propagates gateway failures as graph errors.
impl From<LlmError> for dialog_graph::GraphError {
    fn from(err: LlmError) -> Self {
        dialog_graph::GraphError::Custom(format!("LLM error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(LlmError::Timeout("10s elapsed".into()).is_retryable());
        assert!(LlmError::RateLimitExceeded("429".into()).is_retryable());
        assert!(!LlmError::AuthenticationError("bad key".into()).is_retryable());
        assert!(!LlmError::InvalidResponse("truncated".into()).is_retryable());
        assert!(!LlmError::ProviderError("model gone".into()).is_retryable());
    }
}
