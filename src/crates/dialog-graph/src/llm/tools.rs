//! Model-facing tool definitions.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Description of a tool as presented to the model when binding tools to a
/// request. The `parameters` field is a JSON Schema object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name the model will call.
    pub name: String,

    /// What the tool does; models use this to decide when to call it.
    pub description: String,

    /// JSON Schema of the parameters object.
    pub parameters: Value,
}

impl ToolDefinition {
    /// Create a definition with an empty parameter schema.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: serde_json::json!({"type": "object", "properties": {}}),
        }
    }

    /// Set the parameter schema.
    pub fn with_parameters(mut self, parameters: Value) -> Self {
        self.parameters = parameters;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_schema_is_empty_object() {
        let def = ToolDefinition::new("check_service", "Probe the flashcard service");
        assert_eq!(def.parameters["type"], "object");
    }
}
