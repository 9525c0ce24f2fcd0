use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::{
    claude::{
        tools::ClaudeToolFormat,
        types::{
            ClaudeContentBlock, ClaudeErrorResponse, ClaudeMessage, ClaudeMessageRequest,
            ClaudeMessageResponse, ClaudeRole, ClaudeStreamBlock, ClaudeStreamDelta,
            ClaudeStreamEvent,
        },
    },
    error::LlmError,
    tools::{ProviderToolFormat, ToolCall},
    types::{CompletionRequest, CompletionResponse, Fragment, FragmentStream, Message, Role, Usage},
};

/// Claude (Anthropic) LLM client
pub struct ClaudeClient {
    api_key: String,
    base_url: String,
    http_client: reqwest::Client,
}

impl ClaudeClient {
    /// Create a new Claude client with the given API key
    pub fn new(api_key: impl Into<String>) -> Result<Self, LlmError> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(LlmError::authentication("API key cannot be empty"));
        }

        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(300)) // 5 minute timeout
            .build()
            .map_err(|e| LlmError::Network { source: e })?;

        Ok(Self {
            api_key,
            base_url: "https://api.anthropic.com".to_string(),
            http_client,
        })
    }

    /// Set a custom base URL for the API
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    async fn send(&self, request: &ClaudeMessageRequest) -> Result<reqwest::Response, LlmError> {
        let url = format!("{}/v1/messages", self.base_url);
        debug!(url = %url, model = %request.model, stream = ?request.stream, "sending claude message");

        let mut headers = HeaderMap::new();
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(&self.api_key)
                .map_err(|_| LlmError::authentication("Invalid API key format"))?,
        );
        headers.insert("anthropic-version", HeaderValue::from_static("2023-06-01"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let response = self
            .http_client
            .post(&url)
            .headers(headers)
            .json(request)
            .send()
            .await
            .map_err(|e| LlmError::Network { source: e })?;

        if response.status().is_success() {
            return Ok(response);
        }

        let status = response.status();
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.parse().ok());

        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        let message = match serde_json::from_str::<ClaudeErrorResponse>(&error_text) {
            Ok(error_response) => error_response.error.message,
            Err(_) => error_text,
        };
        Err(LlmError::from_status(status, message, retry_after))
    }

    /// Create a message using the Claude Messages API
    pub async fn create_message(
        &self,
        request: ClaudeMessageRequest,
    ) -> Result<ClaudeMessageResponse, LlmError> {
        self.send(&request)
            .await?
            .json()
            .await
            .map_err(|e| LlmError::internal(format!("Failed to parse response: {}", e)))
    }
}

/// Claude takes the system prompt out of band and wants tool results inside
/// user turns, so consecutive tool messages collapse into one user message.
fn to_claude_messages(messages: Vec<Message>) -> Vec<ClaudeMessage> {
    let mut out: Vec<ClaudeMessage> = Vec::new();

    for message in messages {
        match message.role {
            Role::System => continue,
            Role::User => out.push(ClaudeMessage::text(ClaudeRole::User, message.content)),
            Role::Assistant => {
                let mut content = Vec::new();
                if !message.content.is_empty() {
                    content.push(ClaudeContentBlock::Text {
                        text: message.content,
                    });
                }
                for call in message.tool_calls {
                    content.push(ClaudeContentBlock::ToolUse {
                        id: call.id().to_string(),
                        name: call.name().to_string(),
                        input: call.raw_arguments().clone(),
                    });
                }
                if !content.is_empty() {
                    out.push(ClaudeMessage {
                        role: ClaudeRole::Assistant,
                        content,
                    });
                }
            }
            Role::Tool => {
                let block = ClaudeContentBlock::ToolResult {
                    tool_use_id: message.tool_call_id.unwrap_or_default(),
                    content: message.content,
                };
                match out.last_mut() {
                    Some(last)
                        if last.role == ClaudeRole::User
                            && last
                                .content
                                .iter()
                                .all(|b| matches!(b, ClaudeContentBlock::ToolResult { .. })) =>
                    {
                        last.content.push(block)
                    }
                    _ => out.push(ClaudeMessage {
                        role: ClaudeRole::User,
                        content: vec![block],
                    }),
                }
            }
        }
    }

    out
}

fn to_claude_request(request: CompletionRequest, stream: bool) -> ClaudeMessageRequest {
    let system = request.system_prompt();
    ClaudeMessageRequest {
        model: request.model,
        max_tokens: request.max_tokens,
        messages: to_claude_messages(request.messages),
        system,
        temperature: request.temperature,
        top_p: request.top_p,
        stop_sequences: request.stop_sequences,
        tools: request
            .tools
            .filter(|tools| !tools.is_empty())
            .map(|tools| ClaudeToolFormat::to_provider_tools(&tools)),
        stream: stream.then_some(true),
    }
}

/// Tracks open tool_use blocks so a block that streamed no input still
/// produces a complete (empty object) argument payload.
#[derive(Debug, Default)]
pub(crate) struct ClaudeStreamState {
    tool_blocks: HashMap<usize, bool>,
}

impl ClaudeStreamState {
    pub(crate) fn fragments(&mut self, event: ClaudeStreamEvent) -> Result<Vec<Fragment>, LlmError> {
        let fragments = match event {
            ClaudeStreamEvent::ContentBlockStart {
                index,
                content_block,
            } => match content_block {
                ClaudeStreamBlock::Text { text } if !text.is_empty() => {
                    vec![Fragment::ContentDelta(text)]
                }
                ClaudeStreamBlock::ToolUse { id, name } => {
                    self.tool_blocks.insert(index, false);
                    vec![Fragment::ToolCallDelta {
                        index,
                        id: Some(id),
                        name: Some(name),
                        arguments_chunk: String::new(),
                    }]
                }
                _ => vec![],
            },
            ClaudeStreamEvent::ContentBlockDelta { index, delta } => match delta {
                ClaudeStreamDelta::TextDelta { text } if !text.is_empty() => {
                    vec![Fragment::ContentDelta(text)]
                }
                ClaudeStreamDelta::InputJsonDelta { partial_json } if !partial_json.is_empty() => {
                    self.tool_blocks.insert(index, true);
                    vec![Fragment::ToolCallDelta {
                        index,
                        id: None,
                        name: None,
                        arguments_chunk: partial_json,
                    }]
                }
                _ => vec![],
            },
            ClaudeStreamEvent::ContentBlockStop { index } => match self.tool_blocks.remove(&index) {
                Some(false) => vec![Fragment::ToolCallDelta {
                    index,
                    id: None,
                    name: None,
                    arguments_chunk: "{}".to_string(),
                }],
                _ => vec![],
            },
            ClaudeStreamEvent::MessageStop {} => vec![Fragment::Done],
            ClaudeStreamEvent::Error { error } => {
                return Err(LlmError::stream(format!("{}: {}", error.error_type, error.message)))
            }
            _ => vec![],
        };
        Ok(fragments)
    }
}

#[async_trait]
impl crate::client::LlmClient for ClaudeClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let claude_response = self.create_message(to_claude_request(request, false)).await?;

        let mut content = String::new();
        let mut tool_calls = Vec::new();

        for block in claude_response.content {
            match block {
                ClaudeContentBlock::Text { text } => content.push_str(&text),
                ClaudeContentBlock::ToolUse { id, name, input } => {
                    tool_calls.push(ToolCall::new(id, name, input));
                }
                ClaudeContentBlock::ToolResult { .. } => {}
            }
        }

        Ok(CompletionResponse {
            content,
            role: Role::Assistant,
            usage: Usage {
                input_tokens: claude_response.usage.input_tokens,
                output_tokens: claude_response.usage.output_tokens,
            },
            stop_reason: claude_response.stop_reason,
            tool_calls,
        })
    }

    fn provider_name(&self) -> &str {
        crate::providers::ANTHROPIC
    }

    fn model_name(&self) -> &str {
        crate::models::claude::SONNET_4_5_ID
    }

    fn supports_streaming(&self) -> bool {
        true
    }

    async fn stream_complete(&self, request: CompletionRequest) -> Result<FragmentStream, LlmError> {
        let response = self.send(&to_claude_request(request, true)).await?;
        let mut payloads = Box::pin(crate::sse::data_payloads(response));

        let stream = async_stream::stream! {
            let mut state = ClaudeStreamState::default();
            while let Some(payload) = payloads.next().await {
                let payload = match payload {
                    Ok(payload) => payload,
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                };

                let event = match serde_json::from_str::<ClaudeStreamEvent>(&payload) {
                    Ok(event) => event,
                    Err(e) => {
                        warn!(payload = %payload, error = %e, "failed to parse claude stream event");
                        continue;
                    }
                };

                match state.fragments(event) {
                    Ok(fragments) => {
                        for fragment in fragments {
                            let done = fragment == Fragment::Done;
                            yield Ok(fragment);
                            if done {
                                return;
                            }
                        }
                    }
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}
