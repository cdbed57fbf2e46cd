//! Tool abstractions: callable tools exposed to the model and the registry
//! that dispatches them.
//!
//! A [`Tool`] pairs a name, a description, and a JSON parameter schema with
//! an async executor. The [`ToolRegistry`] maps model-requested names to
//! executors and turns each [`ToolCall`] into a [`ToolCallResult`]; an
//! unknown tool name produces an error *result*, never an execution abort,
//! so the model can see the failure and recover.

use std::collections::HashMap;
use std::sync::Arc;

use futures::future::{join_all, BoxFuture};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::llm::ToolDefinition;

/// Result of a tool executor: a human/model-readable string, or an error
/// description.
pub type ToolResult = std::result::Result<String, ToolError>;

/// Future returned by a tool executor.
pub type ToolFuture = BoxFuture<'static, ToolResult>;

/// Tool executor function type.
pub type ToolExecutor = Arc<dyn Fn(Value) -> ToolFuture + Send + Sync>;

/// Errors produced by tool dispatch and execution.
#[derive(Debug, Error, Clone, Serialize, Deserialize)]
pub enum ToolError {
    /// Tool not found in the registry.
    #[error("Tool '{0}' not found. Available tools: {1}")]
    ToolNotFound(String, String),

    /// Arguments did not match the tool's expectations.
    #[error("Invalid arguments for tool '{tool}': {error}")]
    InvalidArguments { tool: String, error: String },

    /// The tool ran and failed.
    #[error("Tool '{tool}' execution failed: {error}")]
    ExecutionFailed { tool: String, error: String },
}

/// A callable tool.
pub struct Tool {
    /// Tool name, as requested by the model.
    pub name: String,

    /// Description shown to the model.
    pub description: String,

    /// JSON Schema of the parameters object.
    pub input_schema: Value,

    /// Executor function.
    pub executor: ToolExecutor,
}

impl Tool {
    /// Create a new tool.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
        executor: ToolExecutor,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema,
            executor,
        }
    }

    /// Execute the tool with the given arguments.
    pub async fn execute(&self, args: Value) -> ToolResult {
        (self.executor)(args).await
    }

    /// The model-facing definition of this tool.
    pub fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(&self.name, &self.description).with_parameters(self.input_schema.clone())
    }
}

impl std::fmt::Debug for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tool")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("input_schema", &self.input_schema)
            .field("executor", &"<function>")
            .finish()
    }
}

/// A tool invocation requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Call id, echoed back on the result.
    pub id: String,

    /// Tool name to invoke.
    pub name: String,

    /// Arguments (JSON object).
    pub args: Value,
}

/// Outcome of executing one tool call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallResult {
    /// Call id (matches the request).
    pub id: String,

    /// Tool name that was invoked.
    pub name: String,

    /// Success content or error description.
    pub output: ToolOutput,
}

impl ToolCallResult {
    /// The text to attach to the conversation as the tool-result message.
    pub fn content(&self) -> &str {
        match &self.output {
            ToolOutput::Success { content } => content,
            ToolOutput::Error { error } => error,
        }
    }
}

/// Tool execution output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ToolOutput {
    /// Successful execution.
    Success { content: String },

    /// Execution failed; the message is surfaced to the model.
    Error { error: String },
}

/// Registry of available tools.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Tool>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, replacing any previous tool of the same name.
    pub fn register(&mut self, tool: Tool) {
        self.tools.insert(tool.name.clone(), tool);
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&Tool> {
        self.tools.get(name)
    }

    /// Whether a tool is registered.
    pub fn has_tool(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Names of all registered tools.
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.keys().cloned().collect();
        names.sort();
        names
    }

    /// Model-facing definitions for a subset of tools, in the given order.
    /// Unknown names are skipped.
    pub fn definitions_for(&self, names: &[&str]) -> Vec<ToolDefinition> {
        names
            .iter()
            .filter_map(|name| self.tools.get(*name))
            .map(Tool::definition)
            .collect()
    }

    /// Model-facing definitions for every registered tool.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<ToolDefinition> = self.tools.values().map(Tool::definition).collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// Execute one tool call. Unknown tools and executor failures both
    /// produce an error output rather than aborting.
    pub async fn execute_tool_call(&self, tool_call: &ToolCall) -> ToolCallResult {
        let tool = match self.get(&tool_call.name) {
            Some(tool) => tool,
            None => {
                return ToolCallResult {
                    id: tool_call.id.clone(),
                    name: tool_call.name.clone(),
                    output: ToolOutput::Error {
                        error: ToolError::ToolNotFound(
                            tool_call.name.clone(),
                            self.tool_names().join(", "),
                        )
                        .to_string(),
                    },
                };
            }
        };

        match tool.execute(tool_call.args.clone()).await {
            Ok(content) => ToolCallResult {
                id: tool_call.id.clone(),
                name: tool_call.name.clone(),
                output: ToolOutput::Success { content },
            },
            Err(err) => ToolCallResult {
                id: tool_call.id.clone(),
                name: tool_call.name.clone(),
                output: ToolOutput::Error {
                    error: err.to_string(),
                },
            },
        }
    }

    /// Execute multiple tool calls concurrently, preserving request order in
    /// the results.
    pub async fn execute_tool_calls(&self, tool_calls: &[ToolCall]) -> Vec<ToolCallResult> {
        join_all(tool_calls.iter().map(|call| self.execute_tool_call(call))).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn echo_tool() -> Tool {
        Tool::new(
            "echo",
            "Echo the input back",
            json!({"type": "object", "properties": {"text": {"type": "string"}}}),
            Arc::new(|args: Value| {
                Box::pin(async move {
                    Ok(format!("echo: {}", args["text"].as_str().unwrap_or("")))
                })
            }),
        )
    }

    fn failing_tool() -> Tool {
        Tool::new(
            "always_fails",
            "Fails every time",
            json!({"type": "object"}),
            Arc::new(|_args: Value| {
                Box::pin(async move {
                    Err(ToolError::ExecutionFailed {
                        tool: "always_fails".into(),
                        error: "deck not found".into(),
                    })
                })
            }),
        )
    }

    #[tokio::test]
    async fn executes_registered_tool() {
        let mut registry = ToolRegistry::new();
        registry.register(echo_tool());

        let result = registry
            .execute_tool_call(&ToolCall {
                id: "call_1".into(),
                name: "echo".into(),
                args: json!({"text": "hi"}),
            })
            .await;

        assert_eq!(result.id, "call_1");
        assert_eq!(result.content(), "echo: hi");
        assert!(matches!(result.output, ToolOutput::Success { .. }));
    }

    #[tokio::test]
    async fn unknown_tool_becomes_error_result() {
        let mut registry = ToolRegistry::new();
        registry.register(echo_tool());

        let result = registry
            .execute_tool_call(&ToolCall {
                id: "call_2".into(),
                name: "nope".into(),
                args: json!({}),
            })
            .await;

        match &result.output {
            ToolOutput::Error { error } => {
                assert!(error.contains("'nope' not found"));
                assert!(error.contains("echo"));
            }
            other => panic!("expected error output, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn executor_failure_is_surfaced_not_raised() {
        let mut registry = ToolRegistry::new();
        registry.register(failing_tool());

        let result = registry
            .execute_tool_call(&ToolCall {
                id: "call_3".into(),
                name: "always_fails".into(),
                args: json!({}),
            })
            .await;

        assert!(result.content().contains("deck not found"));
    }

    #[tokio::test]
    async fn batch_execution_preserves_order() {
        let mut registry = ToolRegistry::new();
        registry.register(echo_tool());

        let calls = vec![
            ToolCall {
                id: "a".into(),
                name: "echo".into(),
                args: json!({"text": "1"}),
            },
            ToolCall {
                id: "b".into(),
                name: "echo".into(),
                args: json!({"text": "2"}),
            },
        ];

        let results = registry.execute_tool_calls(&calls).await;
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, "a");
        assert_eq!(results[1].id, "b");
    }

    #[test]
    fn definitions_subset_skips_unknown_names() {
        let mut registry = ToolRegistry::new();
        registry.register(echo_tool());

        let defs = registry.definitions_for(&["echo", "missing"]);
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "echo");
    }
}
