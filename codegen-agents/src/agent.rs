use crate::error::AgentError;
use crate::profile::{AgentKind, AgentProfile, ProfileContext};
use crate::registry::{EvictionPolicy, SessionRegistry, SharedSession};
use crate::stream::TurnStream;
use crate::turn::TurnRunner;
use codegen_llm_sdk::types::Message;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// A profile together with the sessions it owns
pub struct Agent {
    profile: AgentProfile,
    sessions: Arc<SessionRegistry>,
    context: Arc<ProfileContext>,
    runner: TurnRunner,
}

impl Agent {
    pub fn new(profile: AgentProfile, context: Arc<ProfileContext>, policy: EvictionPolicy) -> Self {
        Self {
            profile,
            sessions: Arc::new(SessionRegistry::new(policy)),
            context,
            runner: TurnRunner::new(),
        }
    }

    pub fn kind(&self) -> AgentKind {
        self.profile.kind()
    }

    pub fn profile(&self) -> &AgentProfile {
        &self.profile
    }

    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }

    pub async fn session(&self, user_id: &str) -> Result<SharedSession, AgentError> {
        self.sessions
            .get_or_create(user_id, || self.profile.create_session(user_id, &self.context))
            .await
    }

    /// Buffered turn: visible history, or the fallback message on failure
    pub async fn chat(
        &self,
        user_id: &str,
        message: impl Into<String>,
        cancel: CancellationToken,
    ) -> Result<Vec<Message>, AgentError> {
        let session = self.session(user_id).await?;
        Ok(self.runner.buffered(session, message, cancel).await)
    }

    /// Streamed turn; the stream always ends with a terminal event
    pub async fn chat_stream(
        &self,
        user_id: &str,
        message: impl Into<String>,
        cancel: CancellationToken,
    ) -> Result<TurnStream, AgentError> {
        let session = self.session(user_id).await?;
        Ok(self.runner.streaming(session, message, cancel).await)
    }

    pub fn clear(&self, user_id: &str) -> bool {
        self.sessions.clear(user_id)
    }
}
