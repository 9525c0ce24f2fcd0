use crate::error::{AgentError, FALLBACK_MESSAGE};
use crate::registry::SharedSession;
use crate::stream::{run_tool, tool_message_content, StreamAssembler, TurnEvent, TurnStream};
use codegen_llm_sdk::{
    types::{CompletionResponse, Fragment, FragmentStream, Message},
    LlmError,
};
use futures_util::stream;
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::session::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnMode {
    Buffered,
    Streaming,
}

pub enum TurnOutput {
    /// Visible history after a buffered turn, or the fallback message
    Messages(Vec<Message>),
    Stream(TurnStream),
}

impl std::fmt::Debug for TurnOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TurnOutput::Messages(messages) => f.debug_tuple("Messages").field(messages).finish(),
            TurnOutput::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

/// Runs one conversational turn against a session.
///
/// The user message is appended before the model is called and stays in
/// history whatever happens next. The session lock is held until the turn
/// ends, which for streaming turns means until the stream is finished or
/// dropped.
#[derive(Debug, Default, Clone, Copy)]
pub struct TurnRunner;

impl TurnRunner {
    pub fn new() -> Self {
        Self
    }

    pub async fn run(
        &self,
        session: SharedSession,
        input: impl Into<String>,
        mode: TurnMode,
        cancel: CancellationToken,
    ) -> TurnOutput {
        match mode {
            TurnMode::Buffered => TurnOutput::Messages(self.buffered(session, input, cancel).await),
            TurnMode::Streaming => TurnOutput::Stream(self.streaming(session, input, cancel).await),
        }
    }

    pub async fn buffered(
        &self,
        session: SharedSession,
        input: impl Into<String>,
        cancel: CancellationToken,
    ) -> Vec<Message> {
        let guard = begin(session, input, TurnMode::Buffered).await;
        self.complete(guard, cancel).await
    }

    pub async fn streaming(
        &self,
        session: SharedSession,
        input: impl Into<String>,
        cancel: CancellationToken,
    ) -> TurnStream {
        let guard = begin(session, input, TurnMode::Streaming).await;
        self.open_stream(guard, cancel).await
    }

    async fn complete(
        &self,
        mut guard: OwnedMutexGuard<Session>,
        cancel: CancellationToken,
    ) -> Vec<Message> {
        let request = guard.completion_request();
        let client = Arc::clone(&guard.config().client);

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AgentError::Cancelled),
            response = client.complete(request) => response.map_err(AgentError::from),
        };

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                error!(session = %guard.id(), error = %e, "buffered turn failed");
                return vec![Message::assistant(FALLBACK_MESSAGE)];
            }
        };

        let calls = response.tool_calls;
        guard.push(Message::assistant_with_tools(response.content, calls.clone()));

        let tools = Arc::clone(&guard.config().tools);
        for call in calls {
            let result = run_tool(
                Arc::clone(&tools),
                call.name(),
                call.raw_arguments().clone(),
                &cancel,
            )
            .await;
            if let Err(e) = &result {
                error!(session = %guard.id(), tool = %call.name(), error = %e, "tool call failed");
            }
            guard.push(Message::tool_result(call.id(), tool_message_content(&result)));
        }

        guard.visible_history()
    }

    async fn open_stream(
        &self,
        guard: OwnedMutexGuard<Session>,
        cancel: CancellationToken,
    ) -> TurnStream {
        let request = guard.completion_request();
        let client = Arc::clone(&guard.config().client);

        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(AgentError::Cancelled),
            fragments = async {
                if client.supports_streaming() {
                    client.stream_complete(request).await
                } else {
                    client.complete(request).await.map(buffered_fragments)
                }
            } => fragments.map_err(AgentError::from),
        };

        match opened {
            Ok(fragments) => StreamAssembler::new(guard, cancel).into_stream(fragments),
            Err(AgentError::Cancelled) => {
                info!(session = %guard.id(), "turn cancelled before the model answered");
                Box::pin(stream::iter([TurnEvent::Done]))
            }
            Err(e) => {
                error!(session = %guard.id(), error = %e, "failed to open model stream");
                Box::pin(stream::iter([
                    TurnEvent::Error(e.user_message().to_string()),
                    TurnEvent::Done,
                ]))
            }
        }
    }
}

/// Lock the session for the turn and record the user's message
async fn begin(
    session: SharedSession,
    input: impl Into<String>,
    mode: TurnMode,
) -> OwnedMutexGuard<Session> {
    let mut guard = session.lock_owned().await;
    guard.push(Message::user(input));
    info!(session = %guard.id(), agent = %guard.config().agent_name, ?mode, "running turn");
    guard
}

/// Replay a buffered completion as fragments, for clients that cannot stream
fn buffered_fragments(response: CompletionResponse) -> FragmentStream {
    let mut fragments: Vec<Result<Fragment, LlmError>> = Vec::new();
    if !response.content.is_empty() {
        fragments.push(Ok(Fragment::Message(response.content)));
    }
    for (index, call) in response.tool_calls.into_iter().enumerate() {
        fragments.push(Ok(Fragment::ToolCallDelta {
            index,
            id: Some(call.id().to_string()),
            name: Some(call.name().to_string()),
            arguments_chunk: call.raw_arguments().to_string(),
        }));
    }
    fragments.push(Ok(Fragment::Done));
    Box::pin(stream::iter(fragments))
}
