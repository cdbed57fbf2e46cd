//! Chat-completions gateway client.
//!
//! Speaks the OpenAI chat-completions wire format, which also covers Azure
//! deployments and local proxies. Supports plain message lists and
//! tool-bound requests; tool calls requested by the model come back as
//! [`ToolCall`]s on the assistant message, ready for the tools node.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use dialog_graph::error::Result as GraphResult;
use dialog_graph::llm::{ChatModel, ChatRequest, ChatResponse, ToolDefinition, UsageMetadata};
use dialog_graph::{Message, MessageRole, ToolCall};

use crate::config::RemoteLlmConfig;
use crate::error::LlmError;

/// Chat-completions API client.
#[derive(Clone)]
pub struct OpenAiClient {
    config: RemoteLlmConfig,
    client: Client,
}

impl OpenAiClient {
    /// Create a new client with the given configuration.
    pub fn new(config: RemoteLlmConfig) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(LlmError::HttpError)?;
        Ok(Self { config, client })
    }

    fn convert_message(msg: &Message) -> WireMessage {
        WireMessage {
            role: match msg.role {
                MessageRole::System => "system",
                MessageRole::Human => "user",
                MessageRole::Assistant => "assistant",
                MessageRole::Tool => "tool",
            }
            .to_string(),
            content: Some(msg.content.clone()),
            name: msg.name.clone(),
            tool_call_id: msg.tool_call_id.clone(),
            tool_calls: msg.tool_calls.as_ref().map(|calls| {
                calls
                    .iter()
                    .map(|call| WireToolCall {
                        id: call.id.clone(),
                        call_type: "function".to_string(),
                        function: WireFunctionCall {
                            name: call.name.clone(),
                            arguments: call.args.to_string(),
                        },
                    })
                    .collect()
            }),
        }
    }

    fn convert_tool(def: &ToolDefinition) -> WireTool {
        WireTool {
            tool_type: "function".to_string(),
            function: WireFunction {
                name: def.name.clone(),
                description: def.description.clone(),
                parameters: def.parameters.clone(),
            },
        }
    }

    fn convert_response(response: WireResponse) -> Result<ChatResponse, LlmError> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse("response contained no choices".to_string()))?;

        let tool_calls: Option<Vec<ToolCall>> = choice.message.tool_calls.map(|calls| {
            calls
                .into_iter()
                .map(|call| {
                    // Arguments arrive as a JSON-encoded string; a model that
                    // emits malformed JSON still gets its raw text through.
                    let args = serde_json::from_str(&call.function.arguments)
                        .unwrap_or(Value::String(call.function.arguments));
                    ToolCall {
                        id: call.id,
                        name: call.function.name,
                        args,
                    }
                })
                .collect()
        });

        let mut message = Message::assistant(choice.message.content.unwrap_or_default());
        if let Some(calls) = tool_calls {
            if !calls.is_empty() {
                message = message.with_tool_calls(calls);
            }
        }

        let usage = response.usage.map(|usage| UsageMetadata {
            input_tokens: usage.prompt_tokens,
            output_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
        });

        Ok(ChatResponse { message, usage })
    }

    async fn chat_once(&self, request: &ChatRequest) -> Result<ChatResponse, LlmError> {
        let url = format!("{}/chat/completions", self.config.base_url);

        let body = WireRequest {
            model: self.config.model.clone(),
            messages: request.messages.iter().map(Self::convert_message).collect(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            tools: if request.tools.is_empty() {
                None
            } else {
                Some(request.tools.iter().map(Self::convert_tool).collect())
            },
            stream: false,
        };

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    LlmError::Timeout(format!("chat call to {url} timed out"))
                } else {
                    LlmError::HttpError(err)
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(match status.as_u16() {
                401 => LlmError::AuthenticationError(error_text),
                429 => LlmError::RateLimitExceeded(error_text),
                _ => LlmError::ProviderError(format!("gateway error {status}: {error_text}")),
            });
        }

        let wire: WireResponse = response
            .json()
            .await
            .map_err(|err| LlmError::InvalidResponse(err.to_string()))?;

        Self::convert_response(wire)
    }
}

#[async_trait]
impl ChatModel for OpenAiClient {
    async fn chat(&self, request: ChatRequest) -> GraphResult<ChatResponse> {
        let mut delay = self.config.retry_delay;
        let mut attempt = 0u32;

        loop {
            match self.chat_once(&request).await {
                Ok(response) => return Ok(response),
                Err(err) if err.is_retryable() && attempt < self.config.max_retries => {
                    attempt += 1;
                    tracing::warn!(
                        attempt,
                        max = self.config.max_retries,
                        error = %err,
                        "retryable gateway failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    async fn is_available(&self) -> GraphResult<bool> {
        let url = format!("{}/models", self.config.base_url);
        let result = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .timeout(self.config.health_timeout)
            .send()
            .await;

        Ok(matches!(result, Ok(response) if response.status().is_success()))
    }

    fn clone_box(&self) -> Box<dyn ChatModel> {
        Box::new(self.clone())
    }
}

// Wire types

#[derive(Debug, Serialize)]
struct WireRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<WireTool>>,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Serialize)]
struct WireTool {
    #[serde(rename = "type")]
    tool_type: String,
    function: WireFunction,
}

#[derive(Debug, Serialize)]
struct WireFunction {
    name: String,
    description: String,
    parameters: Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type")]
    call_type: String,
    function: WireFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
    usage: Option<WireUsage>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireResponseMessage,
}

#[derive(Debug, Deserialize)]
struct WireResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Deserialize)]
struct WireUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
    total_tokens: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn assistant_tool_calls_serialize_as_function_calls() {
        let msg = Message::assistant("").with_tool_calls(vec![ToolCall {
            id: "call_1".into(),
            name: "add_flashcard".into(),
            args: json!({"front": "tree", "back": "a tall plant"}),
        }]);

        let wire = OpenAiClient::convert_message(&msg);
        assert_eq!(wire.role, "assistant");
        let calls = wire.tool_calls.unwrap();
        assert_eq!(calls[0].function.name, "add_flashcard");
        assert!(calls[0].function.arguments.contains("tree"));
    }

    #[test]
    fn tool_result_message_keeps_call_id() {
        let msg = Message::tool("Added note 42", "call_1");
        let wire = OpenAiClient::convert_message(&msg);
        assert_eq!(wire.role, "tool");
        assert_eq!(wire.tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn response_with_tool_calls_parses_arguments() {
        let wire = WireResponse {
            choices: vec![WireChoice {
                message: WireResponseMessage {
                    content: None,
                    tool_calls: Some(vec![WireToolCall {
                        id: "call_9".into(),
                        call_type: "function".into(),
                        function: WireFunctionCall {
                            name: "check_service".into(),
                            arguments: "{}".into(),
                        },
                    }]),
                },
            }],
            usage: None,
        };

        let response = OpenAiClient::convert_response(wire).unwrap();
        assert!(response.message.has_tool_calls());
        let calls = response.message.tool_calls.unwrap();
        assert_eq!(calls[0].name, "check_service");
        assert_eq!(calls[0].args, json!({}));
    }

    #[test]
    fn malformed_arguments_fall_back_to_raw_text() {
        let wire = WireResponse {
            choices: vec![WireChoice {
                message: WireResponseMessage {
                    content: None,
                    tool_calls: Some(vec![WireToolCall {
                        id: "call_9".into(),
                        call_type: "function".into(),
                        function: WireFunctionCall {
                            name: "add_flashcard".into(),
                            arguments: "{not json".into(),
                        },
                    }]),
                },
            }],
            usage: None,
        };

        let response = OpenAiClient::convert_response(wire).unwrap();
        let calls = response.message.tool_calls.unwrap();
        assert_eq!(calls[0].args, Value::String("{not json".into()));
    }

    #[test]
    fn empty_choices_is_invalid_response() {
        let wire = WireResponse {
            choices: vec![],
            usage: None,
        };
        assert!(matches!(
            OpenAiClient::convert_response(wire),
            Err(LlmError::InvalidResponse(_))
        ));
    }
}
