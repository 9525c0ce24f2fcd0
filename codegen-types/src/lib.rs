//! Request and response types shared by the API server and the web client

use serde::{Deserialize, Serialize};
use ts_rs::TS;

pub mod agent;
pub mod chat;
pub mod typescript_gen;

pub use agent::{AgentInfo, AgentsResponse, ProviderInfo, ProvidersResponse};
pub use chat::{ChatMessage, ChatRequest, ChatResponse, ChatToolCall};
pub use typescript_gen::generate_typescript_definitions;

#[derive(Debug, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_chat_request_agent_is_optional() {
        let request: ChatRequest =
            serde_json::from_value(json!({"message": "hi", "user_id": "u1"})).unwrap();
        assert_eq!(request.agent, None);

        let request: ChatRequest = serde_json::from_value(
            json!({"message": "hi", "user_id": "u1", "agent": "coder"}),
        )
        .unwrap();
        assert_eq!(request.agent.as_deref(), Some("coder"));
    }

    #[test]
    fn test_chat_message_shape() {
        let message = ChatMessage {
            role: "tool".to_string(),
            content: "{}".to_string(),
            tool_calls: Vec::new(),
            tool_call_id: Some("call_1".to_string()),
        };
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["tool_call_id"], "call_1");
        assert_eq!(value["tool_calls"], json!([]));
    }
}
