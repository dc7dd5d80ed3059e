use serde::{Deserialize, Serialize};

/// A function the model may call
///
/// Names are kept exactly as the caller wrote them; providers with stricter
/// naming rules encode them at their own boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON Schema of the arguments object
    #[serde(default = "empty_object_schema")]
    pub parameters: serde_json::Value,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            description: Some(description.into()),
            parameters,
        }
    }
}

fn empty_object_schema() -> serde_json::Value {
    serde_json::json!({ "type": "object", "properties": {} })
}

/// How the model should pick among the offered tools
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolChoice {
    /// Never call a tool
    None,
    /// Model decides
    #[default]
    Auto,
    /// At least one call is required
    Required,
    /// Call this tool
    Named(String),
}
