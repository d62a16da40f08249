//! Tool invocation types
//!
//! A [`ToolCall`] is what the model asked for; a [`ToolCallResult`] is what
//! came back. Results surface on the wire inside `tool_result` and
//! `step_finish` events, so their fields follow the protocol's camelCase
//! payload convention.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A tool invocation requested by a model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Identifier correlating the call with its result message
    pub id: String,
    /// Tool name
    pub name: String,
    /// Call arguments as JSON
    pub arguments: Value,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }

    /// Mint a call ID for providers that stream tool calls without one
    pub fn generate_id() -> String {
        format!("call_{}", &uuid::Uuid::new_v4().simple().to_string()[..24])
    }
}

/// Outcome of executing one tool call
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult {
    /// ID of the call this answers
    pub tool_call_id: String,
    /// Tool that ran
    pub tool_name: String,
    /// Tool output; `Value::Null` when the call failed
    pub output: Value,
    /// Whether execution succeeded
    pub success: bool,
    /// Failure message when it did not
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolCallResult {
    /// Result for a call that ran to completion
    pub fn succeeded(call: &ToolCall, output: Value) -> Self {
        Self {
            tool_call_id: call.id.clone(),
            tool_name: call.name.clone(),
            output,
            success: true,
            error: None,
        }
    }

    /// Result for a call that failed
    pub fn failed(call: &ToolCall, error: impl Into<String>) -> Self {
        Self {
            tool_call_id: call.id.clone(),
            tool_name: call.name.clone(),
            output: Value::Null,
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Definition of a tool advertised to a model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// JSON Schema for the tool's arguments
    pub parameters: Value,
}

impl ToolDefinition {
    pub fn new(name: impl Into<String>, description: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters,
        }
    }
}
