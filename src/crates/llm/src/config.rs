//! Gateway client configuration.

use std::time::Duration;

use crate::error::{LlmError, Result};

/// Configuration for a remote chat-completions gateway.
#[derive(Debug, Clone)]
pub struct RemoteLlmConfig {
    /// Bearer token for the gateway.
    pub api_key: String,

    /// Base URL (e.g. `https://api.openai.com/v1`), without a trailing slash.
    pub base_url: String,

    /// Model (or deployment) name.
    pub model: String,

    /// Per-call timeout.
    pub timeout: Duration,

    /// Timeout for the availability probe.
    pub health_timeout: Duration,

    /// Maximum retry attempts for retryable failures.
    pub max_retries: u32,

    /// Initial backoff delay; doubled per attempt.
    pub retry_delay: Duration,
}

impl RemoteLlmConfig {
    /// Create a config with the default timeouts (10 s per call, 5 s health
    /// probe) and retry policy (3 attempts, 500 ms initial backoff).
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            timeout: Duration::from_secs(10),
            health_timeout: Duration::from_secs(5),
            max_retries: 3,
            retry_delay: Duration::from_millis(500),
        }
    }

    /// Read the API key from an environment variable.
    pub fn from_env(
        key_var: &str,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self> {
        let api_key = std::env::var(key_var)
            .map_err(|_| LlmError::ApiKeyNotFound(key_var.to_string()))?;
        Ok(Self::new(api_key, base_url, model))
    }

    /// Override the per-call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Override the retry policy.
    pub fn with_retries(mut self, max_retries: u32, retry_delay: Duration) -> Self {
        self.max_retries = max_retries;
        self.retry_delay = retry_delay;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_stripped() {
        let config = RemoteLlmConfig::new("key", "http://localhost:4000/v1/", "gpt-4o-mini");
        assert_eq!(config.base_url, "http://localhost:4000/v1");
    }

    #[test]
    fn default_timeouts_and_retries() {
        let config = RemoteLlmConfig::new("key", "http://localhost:4000/v1", "m");
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.health_timeout, Duration::from_secs(5));
        assert_eq!(config.max_retries, 3);
    }

    #[test]
    fn missing_env_var_is_reported() {
        let err = RemoteLlmConfig::from_env("KOTORI_TEST_NO_SUCH_VAR", "http://x", "m").unwrap_err();
        assert!(matches!(err, LlmError::ApiKeyNotFound(_)));
    }
}
