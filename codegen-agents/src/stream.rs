use crate::error::AgentError;
use crate::session::Session;
use codegen_llm_sdk::{
    tools::ToolCall,
    types::{Fragment, FragmentStream, Message},
};
use codegen_tools::{ToolExecutionError, ToolRegistry};
use futures_util::{Stream, StreamExt};
use serde_json::Value;
use std::collections::BTreeMap;
use std::pin::Pin;
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Outbound events of one streamed turn. The last event is always `Done`.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnEvent {
    ContentDelta(String),
    ToolResult {
        call_id: String,
        name: String,
        result: Value,
    },
    ToolError {
        call_id: String,
        name: String,
        message: String,
    },
    Error(String),
    Done,
}

impl TurnEvent {
    /// Text carried in the event's `data:` field
    pub fn payload(&self) -> String {
        match self {
            TurnEvent::ContentDelta(text) => text.clone(),
            TurnEvent::ToolResult { result, .. } => format!("\nTool Result: {}", result),
            TurnEvent::ToolError { message, .. } => format!("\nError executing tool: {}", message),
            TurnEvent::Error(message) => format!("Error: {}", message),
            TurnEvent::Done => String::new(),
        }
    }

    /// Encode as one server-sent event. Every payload line gets its own
    /// `data: ` prefix so clients rebuild the exact text.
    pub fn to_sse(&self) -> String {
        let payload = self.payload();
        let mut out = String::with_capacity(payload.len() + 8);
        for line in payload.split('\n') {
            out.push_str("data: ");
            out.push_str(line.trim_end_matches('\r'));
            out.push('\n');
        }
        out.push('\n');
        out
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TurnEvent::Done)
    }
}

/// Lazy, single-consumer event stream of one turn
pub type TurnStream = Pin<Box<dyn Stream<Item = TurnEvent> + Send>>;

/// Run a tool on the blocking pool, giving up if `cancel` fires first
pub(crate) async fn run_tool(
    tools: Arc<ToolRegistry>,
    name: &str,
    arguments: Value,
    cancel: &CancellationToken,
) -> Result<Value, AgentError> {
    if cancel.is_cancelled() {
        return Err(AgentError::Cancelled);
    }

    let tool_name = name.to_string();
    let task = tokio::task::spawn_blocking(move || tools.execute(&tool_name, arguments));

    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(AgentError::Cancelled),
        joined = task => match joined {
            Ok(result) => result.map_err(AgentError::from),
            Err(e) => Err(ToolExecutionError::failed(name, e).into()),
        },
    }
}

/// History text recorded for a tool outcome
pub(crate) fn tool_message_content(result: &Result<Value, AgentError>) -> String {
    match result {
        Ok(value) => value.to_string(),
        Err(e) => format!("Error executing tool: {}", e),
    }
}

#[derive(Debug, Default)]
struct PendingCall {
    id: Option<String>,
    name: Option<String>,
    arguments: String,
    executed: bool,
    depth: usize,
    opened: bool,
    in_string: bool,
    escaped: bool,
}

impl PendingCall {
    /// Append an argument chunk, tracking object nesting as it goes
    fn push(&mut self, chunk: &str) {
        for c in chunk.chars() {
            if self.in_string {
                if self.escaped {
                    self.escaped = false;
                } else if c == '\\' {
                    self.escaped = true;
                } else if c == '"' {
                    self.in_string = false;
                }
                continue;
            }
            match c {
                '"' => self.in_string = true,
                '{' => {
                    self.depth += 1;
                    self.opened = true;
                }
                '}' => self.depth = self.depth.saturating_sub(1),
                _ => {}
            }
        }
        self.arguments.push_str(chunk);
    }

    /// Braces seen so far are closed again
    fn balanced(&self) -> bool {
        self.opened && self.depth == 0 && !self.in_string
    }

    /// Arguments parsed, once they form a complete JSON object
    fn complete_arguments(&self) -> Option<Value> {
        if !self.balanced() {
            return None;
        }
        match serde_json::from_str::<Value>(&self.arguments) {
            Ok(value @ Value::Object(_)) => Some(value),
            _ => None,
        }
    }
}

/// Turns one model fragment stream into [`TurnEvent`]s, running tool calls
/// as soon as their arguments are complete, and commits the outcome to the
/// session when the stream ends.
///
/// The session lock is owned by the assembler for the whole turn. Dropping
/// the assembler, as happens when the consumer of the stream goes away,
/// commits whatever the turn produced before releasing the lock.
pub struct StreamAssembler {
    session: OwnedMutexGuard<Session>,
    tools: Arc<ToolRegistry>,
    cancel: CancellationToken,
    content: String,
    calls: BTreeMap<usize, PendingCall>,
    executed: Vec<ToolCall>,
    tool_messages: Vec<Message>,
}

impl StreamAssembler {
    pub fn new(session: OwnedMutexGuard<Session>, cancel: CancellationToken) -> Self {
        let tools = Arc::clone(&session.config().tools);
        Self {
            session,
            tools,
            cancel,
            content: String::new(),
            calls: BTreeMap::new(),
            executed: Vec::new(),
            tool_messages: Vec::new(),
        }
    }

    /// Consume `fragments`, yielding events in arrival order
    pub fn into_stream(self, mut fragments: FragmentStream) -> TurnStream {
        let mut this = self;
        Box::pin(async_stream::stream! {
            let cancel = this.cancel.clone();
            let mut cancelled = false;

            loop {
                let next = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => {
                        cancelled = true;
                        None
                    }
                    fragment = fragments.next() => fragment,
                };

                let fragment = match next {
                    Some(Ok(fragment)) => fragment,
                    Some(Err(e)) => {
                        let err = AgentError::from(e);
                        error!(session = %this.session.id(), error = %err, "model stream failed");
                        yield TurnEvent::Error(err.user_message().to_string());
                        break;
                    }
                    None => break,
                };

                match fragment {
                    Fragment::ContentDelta(text) | Fragment::Message(text) => {
                        if text.is_empty() {
                            continue;
                        }
                        this.content.push_str(&text);
                        yield TurnEvent::ContentDelta(text);
                    }
                    Fragment::ToolCallDelta { index, id, name, arguments_chunk } => {
                        let ready = match this.accept(index, id, name, &arguments_chunk) {
                            Some(ready) => ready,
                            None => continue,
                        };
                        match this.execute(ready).await {
                            Some(event) => {
                                yield event;
                            }
                            None => {
                                cancelled = true;
                                break;
                            }
                        }
                    }
                    Fragment::Done => break,
                }
            }

            if cancelled {
                info!(session = %this.session.id(), "turn cancelled");
            } else {
                for event in this.incomplete_calls() {
                    yield event;
                }
            }

            // Commits and releases the session before the terminal event
            drop(this);
            yield TurnEvent::Done;
        })
    }

    /// Fold a delta into its call. Returns the call index once the call is
    /// ready to run.
    fn accept(
        &mut self,
        index: usize,
        id: Option<String>,
        name: Option<String>,
        chunk: &str,
    ) -> Option<usize> {
        let call = self.calls.entry(index).or_default();
        if call.executed {
            warn!(index, "ignoring delta for a tool call that already ran");
            return None;
        }
        if let Some(id) = id.filter(|id| !id.is_empty()) {
            call.id = Some(id);
        }
        if let Some(name) = name.filter(|name| !name.is_empty()) {
            call.name = Some(name);
        }
        call.push(chunk);

        if call.name.is_some() && call.complete_arguments().is_some() {
            Some(index)
        } else {
            None
        }
    }

    /// Run a ready call. `None` means the turn was cancelled meanwhile.
    async fn execute(&mut self, index: usize) -> Option<TurnEvent> {
        let call = self.calls.get_mut(&index)?;
        call.executed = true;
        let name = call.name.clone().unwrap_or_default();
        let call_id = call.id.clone().unwrap_or_else(|| format!("call_{}", index));
        let arguments = call.complete_arguments().unwrap_or(Value::Null);

        debug!(session = %self.session.id(), tool = %name, call_id = %call_id, "running tool call");
        let result = run_tool(Arc::clone(&self.tools), &name, arguments.clone(), &self.cancel).await;
        if matches!(result, Err(AgentError::Cancelled)) {
            return None;
        }

        self.executed
            .push(ToolCall::new(call_id.clone(), name.clone(), arguments));
        self.tool_messages.push(Message::tool_result(
            call_id.clone(),
            tool_message_content(&result),
        ));

        Some(match result {
            Ok(result) => TurnEvent::ToolResult {
                call_id,
                name,
                result,
            },
            Err(e) => TurnEvent::ToolError {
                call_id,
                name,
                message: e.to_string(),
            },
        })
    }

    fn incomplete_calls(&self) -> Vec<TurnEvent> {
        self.calls
            .iter()
            .filter(|(_, call)| !call.executed)
            .map(|(index, call)| {
                let name = call.name.clone().unwrap_or_default();
                warn!(session = %self.session.id(), index, tool = %name, "tool call never completed");
                TurnEvent::ToolError {
                    call_id: call.id.clone().unwrap_or_else(|| format!("call_{}", index)),
                    name,
                    message: "incomplete tool call arguments".to_string(),
                }
            })
            .collect()
    }

    /// Append the assistant message, then tool results in execution order
    fn commit(&mut self) {
        if self.content.is_empty() && self.executed.is_empty() {
            return;
        }
        let content = std::mem::take(&mut self.content);
        let calls = std::mem::take(&mut self.executed);
        debug!(session = %self.session.id(), tool_calls = calls.len(), "committing turn");
        self.session
            .push(Message::assistant_with_tools(content, calls));
        for message in std::mem::take(&mut self.tool_messages) {
            self.session.push(message);
        }
    }
}

impl Drop for StreamAssembler {
    fn drop(&mut self) {
        self.commit();
    }
}
