//! Model-backend wire contract.
//!
//! These types model the request/reply shapes exchanged with a language
//! model backend. The backend itself is an opaque pluggable service; the
//! port trait lives in colloquy-core and implementations outside the
//! workspace (plus a scripted one in colloquy-infra for tests).

use serde::{Deserialize, Serialize};

use crate::role::Role;

/// A single turn submitted to the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnMessage {
    pub role: Role,
    pub content: String,
}

/// Tool selection policy for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolChoice {
    None,
    Auto,
    /// Force a specific tool by name.
    Named(String),
}

impl Default for ToolChoice {
    fn default() -> Self {
        ToolChoice::None
    }
}

/// Declared schema of one callable tool, as advertised to the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    /// JSON schema of the accepted arguments.
    pub parameters: serde_json::Value,
}

/// Request to a model backend for a completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendRequest {
    pub model: String,
    pub temperature: f64,
    pub messages: Vec<TurnMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ToolSpec>>,
    #[serde(default)]
    pub tool_choice: ToolChoice,
}

/// One tool invocation requested by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    /// Raw JSON arguments, parsed by the tool registry at dispatch time.
    pub arguments_json: String,
}

/// Raw reply from a model backend.
///
/// `content = None` with no tool calls is replaced downstream by a fixed
/// no-response sentinel rather than aborting the conversation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BackendReply {
    pub content: Option<String>,
    pub tool_calls: Option<Vec<ToolCall>>,
}

/// Outcome of executing one registered tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutcome {
    /// `Some(true)` success, `Some(false)` failure, `None` not executed.
    pub status: Option<bool>,
    pub body: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_choice_serde() {
        assert_eq!(serde_json::to_string(&ToolChoice::None).unwrap(), "\"none\"");
        assert_eq!(serde_json::to_string(&ToolChoice::Auto).unwrap(), "\"auto\"");
    }

    #[test]
    fn test_request_omits_absent_tools() {
        let request = BackendRequest {
            model: "test-model".into(),
            temperature: 0.0,
            messages: vec![TurnMessage {
                role: Role::User,
                content: "hi".into(),
            }],
            tools: None,
            tool_choice: ToolChoice::None,
        };
        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("\"tools\""));
        assert!(json.contains("\"tool_choice\":\"none\""));
    }

    #[test]
    fn test_reply_default_is_empty() {
        let reply = BackendReply::default();
        assert!(reply.content.is_none());
        assert!(reply.tool_calls.is_none());
    }
}
