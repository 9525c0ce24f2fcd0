use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Body of `POST /chat` and `POST /chat/stream`
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ChatRequest {
    pub message: String,
    pub user_id: String,
    /// Agent to talk to, `manager` when absent
    #[serde(default)]
    #[ts(optional)]
    pub agent: Option<String>,
}

/// A tool call requested by the assistant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ChatToolCall {
    pub id: String,
    pub name: String,
    #[ts(type = "unknown")]
    pub arguments: serde_json::Value,
}

/// One entry of a conversation as shown to the client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ChatMessage {
    /// "user", "assistant" or "tool"
    pub role: String,
    pub content: String,
    #[serde(default)]
    pub tool_calls: Vec<ChatToolCall>,
    #[serde(default)]
    #[ts(optional)]
    pub tool_call_id: Option<String>,
}

/// Visible history after a buffered turn
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ChatResponse {
    pub messages: Vec<ChatMessage>,
}
