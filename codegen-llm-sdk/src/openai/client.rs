use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use tracing::{debug, warn};

use crate::{
    error::LlmError,
    openai::{
        tools::OpenAIToolFormat,
        types::{
            OpenAIChatCompletionChunk, OpenAIChatCompletionRequest, OpenAIChatCompletionResponse,
            OpenAIErrorResponse, OpenAIFunctionCall, OpenAIMessage, OpenAIRole, OpenAIToolCall,
        },
    },
    tools::{ProviderToolFormat, ToolCall},
    types::{CompletionRequest, CompletionResponse, Fragment, FragmentStream, Message, Role, Usage},
};

/// OpenAI LLM client
pub struct OpenAIClient {
    api_key: String,
    base_url: String,
    http_client: reqwest::Client,
}

impl OpenAIClient {
    /// Create a new OpenAI client with the given API key
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
            base_url: "https://api.openai.com".to_string(),
            http_client,
        })
    }

    /// Set a custom base URL for the API
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn headers(&self) -> Result<HeaderMap, LlmError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_key))
                .map_err(|_| LlmError::authentication("Invalid API key format"))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    async fn send(
        &self,
        request: &OpenAIChatCompletionRequest,
    ) -> Result<reqwest::Response, LlmError> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        debug!(url = %url, model = %request.model, stream = ?request.stream, "sending chat completion");

        let response = self
            .http_client
            .post(&url)
            .headers(self.headers()?)
            .json(request)
            .send()
            .await
            .map_err(|e| LlmError::Network { source: e })?;

        if response.status().is_success() {
            Ok(response)
        } else {
            Err(error_from_response(response).await)
        }
    }

    /// Create a chat completion using the OpenAI Chat Completions API
    pub async fn create_chat_completion(
        &self,
        request: OpenAIChatCompletionRequest,
    ) -> Result<OpenAIChatCompletionResponse, LlmError> {
        let response = self.send(&request).await?;
        response
            .json()
            .await
            .map_err(|e| LlmError::internal(format!("Failed to parse response: {}", e)))
    }
}

async fn error_from_response(response: reqwest::Response) -> LlmError {
    let status = response.status();
    let retry_after = response
        .headers()
        .get("retry-after")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok());

    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());

    let message = match serde_json::from_str::<OpenAIErrorResponse>(&error_text) {
        Ok(error_response) => error_response.error.message,
        Err(_) => error_text,
    };
    LlmError::from_status(status, message, retry_after)
}

fn to_openai_message(message: Message) -> OpenAIMessage {
    let role = match message.role {
        Role::System => OpenAIRole::System,
        Role::User => OpenAIRole::User,
        Role::Assistant => OpenAIRole::Assistant,
        Role::Tool => OpenAIRole::Tool,
    };

    let tool_calls = if message.tool_calls.is_empty() {
        None
    } else {
        Some(
            message
                .tool_calls
                .iter()
                .map(|call| OpenAIToolCall {
                    id: call.id().to_string(),
                    r#type: "function".to_string(),
                    function: OpenAIFunctionCall {
                        name: call.name().to_string(),
                        arguments: call.raw_arguments().to_string(),
                    },
                })
                .collect(),
        )
    };

    let content = if message.content.is_empty() && tool_calls.is_some() {
        None
    } else {
        Some(message.content)
    };

    OpenAIMessage {
        role,
        content,
        tool_calls,
        tool_call_id: message.tool_call_id,
    }
}

fn to_chat_request(request: CompletionRequest, stream: bool) -> OpenAIChatCompletionRequest {
    OpenAIChatCompletionRequest {
        model: request.model,
        messages: request.messages.into_iter().map(to_openai_message).collect(),
        max_completion_tokens: Some(request.max_tokens),
        temperature: request.temperature,
        top_p: request.top_p,
        stop: request.stop_sequences,
        stream: stream.then_some(true),
        tools: request
            .tools
            .filter(|tools| !tools.is_empty())
            .map(|tools| OpenAIToolFormat::to_provider_tools(&tools)),
    }
}

/// Convert one streamed chunk into normalized fragments
pub(crate) fn chunk_fragments(chunk: OpenAIChatCompletionChunk) -> Vec<Fragment> {
    let mut fragments = Vec::new();
    for choice in chunk.choices {
        if let Some(delta) = choice.delta {
            if let Some(content) = delta.content.filter(|c| !c.is_empty()) {
                fragments.push(Fragment::ContentDelta(content));
            }
            for call in delta.tool_calls {
                let (name, arguments) = match call.function {
                    Some(function) => (function.name, function.arguments.unwrap_or_default()),
                    None => (None, String::new()),
                };
                fragments.push(Fragment::ToolCallDelta {
                    index: call.index,
                    id: call.id,
                    name,
                    arguments_chunk: arguments,
                });
            }
        } else if let Some(message) = choice.message {
            if let Some(content) = message.content.filter(|c| !c.is_empty()) {
                fragments.push(Fragment::Message(content));
            }
            for (index, call) in message.tool_calls.unwrap_or_default().into_iter().enumerate() {
                fragments.push(Fragment::ToolCallDelta {
                    index,
                    id: Some(call.id),
                    name: Some(call.function.name),
                    arguments_chunk: call.function.arguments,
                });
            }
        }
    }
    fragments
}

impl OpenAIChatCompletionResponse {
    /// Get the content of the first choice
    pub fn content(&self) -> &str {
        self.choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
            .unwrap_or_default()
    }

    /// Extract tool calls from the first choice
    pub fn tool_calls(&self) -> Vec<ToolCall> {
        self.choices
            .first()
            .and_then(|choice| choice.message.tool_calls.as_ref())
            .map(|calls| {
                calls
                    .iter()
                    .map(|call| {
                        let arguments: serde_json::Value =
                            serde_json::from_str(&call.function.arguments)
                                .unwrap_or(serde_json::Value::Null);
                        ToolCall::new(call.id.clone(), call.function.name.clone(), arguments)
                    })
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[async_trait]
impl crate::client::LlmClient for OpenAIClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let openai_response = self
            .create_chat_completion(to_chat_request(request, false))
            .await?;

        let choice = openai_response
            .choices
            .first()
            .ok_or_else(|| LlmError::internal("No completion choices returned"))?;
        let usage = openai_response.usage.clone().unwrap_or_default();

        Ok(CompletionResponse {
            content: openai_response.content().to_string(),
            role: Role::Assistant,
            usage: Usage {
                input_tokens: usage.prompt_tokens,
                output_tokens: usage.completion_tokens,
            },
            stop_reason: choice.finish_reason.clone(),
            tool_calls: openai_response.tool_calls(),
        })
    }

    fn provider_name(&self) -> &str {
        crate::providers::OPENAI
    }

    fn model_name(&self) -> &str {
        crate::models::openai::GPT_4O_ID
    }

    fn supports_streaming(&self) -> bool {
        true
    }

    async fn stream_complete(&self, request: CompletionRequest) -> Result<FragmentStream, LlmError> {
        let response = self.send(&to_chat_request(request, true)).await?;
        let mut payloads = Box::pin(crate::sse::data_payloads(response));

        let stream = async_stream::stream! {
            while let Some(payload) = payloads.next().await {
                let payload = match payload {
                    Ok(payload) => payload,
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                };

                if payload.trim() == "[DONE]" {
                    yield Ok(Fragment::Done);
                    return;
                }

                match serde_json::from_str::<OpenAIChatCompletionChunk>(&payload) {
                    Ok(chunk) => {
                        for fragment in chunk_fragments(chunk) {
                            yield Ok(fragment);
                        }
                    }
                    Err(parse_error) => {
                        if let Ok(error) = serde_json::from_str::<OpenAIErrorResponse>(&payload) {
                            yield Err(LlmError::stream(error.error.message));
                            return;
                        }
                        warn!(payload = %payload, error = %parse_error, "failed to parse stream chunk");
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}
