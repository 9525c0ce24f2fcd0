use codegen_llm_sdk::error::LlmError;
use codegen_tools::ToolExecutionError;

/// Text returned to the user whenever a turn fails on the model side
pub const FALLBACK_MESSAGE: &str = "Something went wrong, please try again later";

/// Errors surfaced while running a conversational turn.
///
/// [`AgentError::user_message`] is what a client gets to see; the `Display`
/// output carries the detail and is meant for logs.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("Failed to create session for {user_id}: {message}")]
    SessionCreation { user_id: String, message: String },

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Tool(#[from] ToolExecutionError),

    #[error("Turn cancelled")]
    Cancelled,
}

impl AgentError {
    pub fn session_creation(user_id: impl Into<String>, source: &anyhow::Error) -> Self {
        Self::SessionCreation {
            user_id: user_id.into(),
            message: format!("{:#}", source),
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            AgentError::SessionCreation { .. } => {
                "Could not start a conversation, please try again later"
            }
            AgentError::Llm(_) => FALLBACK_MESSAGE,
            AgentError::Tool(_) => "A tool failed while handling your request",
            AgentError::Cancelled => "The request was cancelled",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_hides_details() {
        let err = AgentError::from(LlmError::internal("secret upstream detail"));
        assert_eq!(err.user_message(), FALLBACK_MESSAGE);
        assert!(err.to_string().contains("secret upstream detail"));

        let err = AgentError::session_creation("u1", &anyhow::anyhow!("disk on fire"));
        assert!(!err.user_message().contains("disk"));
        assert!(err.to_string().contains("u1"));
    }
}
