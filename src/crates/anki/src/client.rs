//! The AnkiConnect envelope client.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{AnkiError, Result};

/// Default AnkiConnect endpoint.
pub const DEFAULT_URL: &str = "http://localhost:8765";

/// Protocol version sent with every request.
pub const PROTOCOL_VERSION: u32 = 6;

#[derive(Debug, Serialize)]
struct Envelope<'a> {
    action: &'a str,
    version: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct Reply {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<String>,
}

/// Client for a single AnkiConnect endpoint.
///
/// All domain operations go through [`AnkiClient::invoke`]: one POST with
/// the `{action, version, params}` envelope, 10 s timeout (5 s for the
/// version probe). A null `error` with any `result` - including null - is
/// success; what a null result means is up to the operation.
#[derive(Debug, Clone)]
pub struct AnkiClient {
    url: String,
    client: Client,
    health_client: Client,
}

impl AnkiClient {
    /// Client against the default local endpoint.
    pub fn new() -> Result<Self> {
        Self::with_url(DEFAULT_URL)
    }

    /// Client against a specific endpoint.
    pub fn with_url(url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(AnkiError::Transport)?;
        let health_client = Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .map_err(AnkiError::Transport)?;
        Ok(Self {
            url: url.into(),
            client,
            health_client,
        })
    }

    /// The endpoint this client talks to.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Invoke an action and return its `result` value.
    pub async fn invoke(&self, action: &str, params: Option<Value>) -> Result<Value> {
        self.send(&self.client, action, params).await
    }

    /// Invoke the `version` probe with the shorter health timeout.
    pub async fn version(&self) -> Result<Value> {
        self.send(&self.health_client, "version", None).await
    }

    async fn send(&self, client: &Client, action: &str, params: Option<Value>) -> Result<Value> {
        let envelope = Envelope {
            action,
            version: PROTOCOL_VERSION,
            params,
        };

        tracing::debug!(action, "anki-connect request");

        let response = client.post(&self.url).json(&envelope).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AnkiError::InvalidResponse(format!(
                "HTTP {status} from AnkiConnect"
            )));
        }

        let reply: Reply = response
            .json()
            .await
            .map_err(|err| AnkiError::InvalidResponse(err.to_string()))?;

        if let Some(message) = reply.error {
            tracing::debug!(action, error = %message, "anki-connect protocol error");
            return Err(AnkiError::Protocol(message));
        }

        Ok(reply.result)
    }
}
