use codegen_llm_sdk::{
    client::LlmClient,
    types::{CompletionRequest, Message, Role},
};
use codegen_tools::ToolRegistry;
use std::sync::Arc;

/// Everything fixed about a session at creation time
#[derive(Clone)]
pub struct SessionConfig {
    pub agent_name: String,
    pub model: String,
    pub client: Arc<dyn LlmClient>,
    pub temperature: Option<f32>,
    pub max_tokens: u32,
    pub tools: Arc<ToolRegistry>,
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("agent_name", &self.agent_name)
            .field("model", &self.model)
            .field("provider", &self.client.provider_name())
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("tools", &self.tools.names())
            .finish()
    }
}

/// One user's conversation with one agent.
///
/// The first history entry is always the system message built at creation.
#[derive(Debug)]
pub struct Session {
    id: String,
    history: Vec<Message>,
    config: SessionConfig,
}

impl Session {
    pub fn new(id: impl Into<String>, config: SessionConfig, instructions: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            history: vec![Message::system(instructions)],
            config,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    /// History without the system message
    pub fn visible_history(&self) -> Vec<Message> {
        self.history
            .iter()
            .filter(|m| m.role != Role::System)
            .cloned()
            .collect()
    }

    pub(crate) fn push(&mut self, message: Message) {
        self.history.push(message);
    }

    /// Request carrying the full history, tools and sampling settings
    pub fn completion_request(&self) -> CompletionRequest {
        let mut request = CompletionRequest::new(self.config.model.clone(), self.history.clone());
        request.max_tokens = self.config.max_tokens;
        request.temperature = self.config.temperature;
        if !self.config.tools.is_empty() {
            request.tools = Some(self.config.tools.definitions());
        }
        request
    }
}
