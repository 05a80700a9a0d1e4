//! Chat-completions request and response types.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Chat completion request.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    /// Model to use (e.g., "sonar-pro").
    pub model: String,

    /// Conversation messages.
    pub messages: Vec<Message>,

    /// Maximum tokens in the completion.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,

    /// Function-calling tool definitions.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Value>,
}

/// Chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Role: "system", "user", "assistant" or "tool".
    pub role: String,

    /// Message text; absent on assistant turns that only call tools.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,

    /// Tool calls requested by the assistant.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,

    /// Call answered by a tool message.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl Message {
    fn text(role: &str, content: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    /// Create a system message.
    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::text("system", content)
    }

    /// Create a user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::text("user", content)
    }

    /// Create a tool result message answering `call_id`.
    #[must_use]
    pub fn tool(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(call_id.into()),
            ..Self::text("tool", content)
        }
    }

    /// Non-blank text content, if any.
    #[must_use]
    pub fn answer(&self) -> Option<&str> {
        self.content.as_deref().filter(|text| !text.trim().is_empty())
    }
}

/// A tool call requested by the model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    /// Call identifier, echoed back in the tool message.
    pub id: String,

    /// Always "function".
    #[serde(rename = "type", default = "function_kind")]
    pub kind: String,

    /// Function name and JSON arguments.
    pub function: FunctionCall,
}

/// Function invocation inside a [`ToolCall`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Tool name.
    pub name: String,

    /// Arguments as a JSON string.
    #[serde(default)]
    pub arguments: String,
}

fn function_kind() -> String {
    "function".to_string()
}

/// Chat completion response.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatResponse {
    /// Completion choices; the first one is used.
    #[serde(default)]
    pub choices: Vec<Choice>,

    /// Source URLs cited by the answer.
    #[serde(default)]
    pub citations: Vec<String>,

    /// Token usage statistics.
    #[serde(default)]
    pub usage: Option<Usage>,
}

/// One completion choice.
#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    /// Assistant message.
    pub message: Message,
}

/// Token usage statistics.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens in the prompt.
    #[serde(default)]
    pub prompt_tokens: u32,

    /// Tokens in the completion.
    #[serde(default)]
    pub completion_tokens: u32,

    /// Total tokens used.
    #[serde(default)]
    pub total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_call_reply_parses() {
        let response: ChatResponse = serde_json::from_value(json!({
            "id": "cmpl-1",
            "choices": [{
                "index": 0,
                "finish_reason": "tool_calls",
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "search_nodes", "arguments": "{\"query\":\"Fender\"}"}
                    }]
                }
            }]
        }))
        .unwrap();

        let message = &response.choices[0].message;
        assert_eq!(message.answer(), None);
        assert_eq!(message.tool_calls[0].function.name, "search_nodes");
        assert!(response.usage.is_none());
    }

    #[test]
    fn test_tool_message_serializes_call_id_only_when_set() {
        let tool = serde_json::to_value(Message::tool("call_1", "{}")).unwrap();
        assert_eq!(tool, json!({"role": "tool", "content": "{}", "tool_call_id": "call_1"}));

        let user = serde_json::to_value(Message::user("Fender Jazz Bass")).unwrap();
        assert_eq!(user, json!({"role": "user", "content": "Fender Jazz Bass"}));
    }
}
