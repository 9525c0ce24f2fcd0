#![allow(dead_code)]

use codegen_agents::{Session, SessionConfig};
use codegen_llm_sdk::client::LlmClient;
use codegen_llm_sdk::error::LlmError;
use codegen_llm_sdk::tools::ToolCall;
use codegen_llm_sdk::types::{
    CompletionRequest, CompletionResponse, Fragment, FragmentStream, Role, Usage,
};
use codegen_tools::{ToolExecutionError, ToolRegistry};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// One scripted item of a mock fragment stream
#[derive(Debug)]
pub enum Step {
    Fragment(Fragment),
    Error(LlmError),
    /// Never yields again
    Hang,
}

pub fn text(s: &str) -> Step {
    Step::Fragment(Fragment::ContentDelta(s.to_string()))
}

pub fn call(index: usize, id: Option<&str>, name: Option<&str>, chunk: &str) -> Step {
    Step::Fragment(Fragment::ToolCallDelta {
        index,
        id: id.map(String::from),
        name: name.map(String::from),
        arguments_chunk: chunk.to_string(),
    })
}

pub fn done() -> Step {
    Step::Fragment(Fragment::Done)
}

pub fn response(content: &str, tool_calls: Vec<ToolCall>) -> CompletionResponse {
    CompletionResponse {
        content: content.to_string(),
        role: Role::Assistant,
        usage: Usage {
            input_tokens: 10,
            output_tokens: 20,
        },
        stop_reason: Some("end_turn".to_string()),
        tool_calls,
    }
}

/// Scripted client. Buffered calls pop from `responses`, streamed calls pop
/// from `streams`; every request is recorded.
pub struct MockLlmClient {
    pub responses: Mutex<VecDeque<Result<CompletionResponse, LlmError>>>,
    pub streams: Mutex<VecDeque<Vec<Step>>>,
    pub requests: Mutex<Vec<CompletionRequest>>,
    pub streaming: bool,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            streams: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            streaming: true,
        }
    }

    pub fn buffered_only() -> Self {
        Self {
            streaming: false,
            ..Self::new()
        }
    }

    pub fn push_response(&self, response: Result<CompletionResponse, LlmError>) {
        self.responses.lock().unwrap().push_back(response);
    }

    pub fn push_stream(&self, steps: Vec<Step>) {
        self.streams.lock().unwrap().push_back(steps);
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn last_request(&self) -> Option<CompletionRequest> {
        self.requests.lock().unwrap().last().cloned()
    }
}

impl Default for MockLlmClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(response("ok", Vec::new())))
    }

    fn provider_name(&self) -> &str {
        "mock"
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }

    fn supports_streaming(&self) -> bool {
        self.streaming
    }

    async fn stream_complete(&self, request: CompletionRequest) -> Result<FragmentStream, LlmError> {
        self.requests.lock().unwrap().push(request);
        let steps = self
            .streams
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| vec![done()]);

        Ok(Box::pin(async_stream::stream! {
            for step in steps {
                match step {
                    Step::Fragment(fragment) => {
                        yield Ok(fragment);
                    }
                    Step::Error(e) => {
                        yield Err(e);
                    }
                    Step::Hang => std::future::pending::<()>().await,
                }
            }
        }))
    }
}

/// Registry with `echo` (returns its arguments) and `fail` (always errors)
pub fn test_tools() -> ToolRegistry {
    let mut tools = ToolRegistry::new();
    let schema = json!({"type": "object", "properties": {"value": {"type": "string"}}});
    tools
        .register("echo", "Echo the arguments back", schema.clone(), |args: Value| {
            Ok(json!({"echo": args}))
        })
        .unwrap();
    tools
        .register("fail", "Always fails", schema, |_args: Value| {
            Err(ToolExecutionError::failed("fail", "boom"))
        })
        .unwrap();
    tools
}

pub fn test_config(client: Arc<MockLlmClient>) -> SessionConfig {
    SessionConfig {
        agent_name: "test".to_string(),
        model: "mock-model".to_string(),
        client,
        temperature: None,
        max_tokens: 1024,
        tools: Arc::new(test_tools()),
    }
}

pub fn test_session(id: &str, client: Arc<MockLlmClient>) -> Session {
    Session::new(id, test_config(client), "You are a test agent.")
}
