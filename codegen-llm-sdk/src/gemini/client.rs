use super::tools::GeminiToolFormat;
use super::types::*;
use crate::error::LlmError;
use crate::tools::{ProviderToolFormat, ToolCall};
use crate::types::{
    CompletionRequest, CompletionResponse, Fragment, FragmentStream, Message, Role, Usage,
};
use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Google Gemini API client
pub struct GeminiClient {
    api_key: String,
    base_url: String,
    http_client: reqwest::Client,
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self, LlmError> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(LlmError::authentication("API key cannot be empty"));
        }

        let http_client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(300))
            .build()
            .map_err(|e| LlmError::Network { source: e })?;

        Ok(Self {
            api_key,
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            http_client,
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    async fn send(
        &self,
        url: String,
        request: &GeminiGenerateContentRequest,
    ) -> Result<reqwest::Response, LlmError> {
        debug!(url = %url, "sending gemini request");

        let mut headers = HeaderMap::new();
        headers.insert(
            "x-goog-api-key",
            HeaderValue::from_str(&self.api_key)
                .map_err(|e| LlmError::authentication(format!("Invalid API key format: {}", e)))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let response = self
            .http_client
            .post(&url)
            .headers(headers)
            .json(request)
            .send()
            .await
            .map_err(|e| LlmError::Network { source: e })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let error_body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unable to read error response".to_string());

        let message = match serde_json::from_str::<GeminiErrorResponse>(&error_body) {
            Ok(error_response) => error_response.error.message,
            Err(_) => error_body,
        };
        Err(LlmError::from_status(status, message, None))
    }

    pub async fn generate_content(
        &self,
        model: &str,
        request: GeminiGenerateContentRequest,
    ) -> Result<GeminiGenerateContentResponse, LlmError> {
        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, model);
        self.send(url, &request)
            .await?
            .json::<GeminiGenerateContentResponse>()
            .await
            .map_err(|e| LlmError::internal(format!("Failed to parse response: {}", e)))
    }
}

/// Gemini has no tool-call ids on the wire, so tool results are matched back
/// to the function name through the assistant message that requested them.
fn to_gemini_contents(messages: Vec<Message>) -> Vec<GeminiContent> {
    let mut call_names: HashMap<String, String> = HashMap::new();
    let mut contents: Vec<GeminiContent> = Vec::new();

    for message in messages {
        match message.role {
            Role::System => continue,
            Role::User => contents.push(GeminiContent {
                role: GeminiRole::User,
                parts: vec![GeminiPart::text(message.content)],
            }),
            Role::Assistant => {
                let mut parts = Vec::new();
                if !message.content.is_empty() {
                    parts.push(GeminiPart::text(message.content));
                }
                for call in message.tool_calls {
                    call_names.insert(call.id().to_string(), call.name().to_string());
                    parts.push(GeminiPart {
                        function_call: Some(GeminiFunctionCall {
                            name: call.name().to_string(),
                            args: call.raw_arguments().clone(),
                        }),
                        ..Default::default()
                    });
                }
                if !parts.is_empty() {
                    contents.push(GeminiContent {
                        role: GeminiRole::Model,
                        parts,
                    });
                }
            }
            Role::Tool => {
                let call_id = message.tool_call_id.unwrap_or_default();
                let name = call_names.get(&call_id).cloned().unwrap_or(call_id);
                let response = match serde_json::from_str::<Value>(&message.content) {
                    Ok(value @ Value::Object(_)) => value,
                    _ => serde_json::json!({ "result": message.content }),
                };
                let part = GeminiPart {
                    function_response: Some(GeminiFunctionResponse { name, response }),
                    ..Default::default()
                };
                match contents.last_mut() {
                    Some(last)
                        if last.role == GeminiRole::User
                            && last.parts.iter().all(|p| p.function_response.is_some()) =>
                    {
                        last.parts.push(part)
                    }
                    _ => contents.push(GeminiContent {
                        role: GeminiRole::User,
                        parts: vec![part],
                    }),
                }
            }
        }
    }

    contents
}

fn to_gemini_request(request: CompletionRequest) -> GeminiGenerateContentRequest {
    let system_instruction = request.system_prompt().map(|text| GeminiContent {
        role: GeminiRole::User,
        parts: vec![GeminiPart::text(text)],
    });

    GeminiGenerateContentRequest {
        contents: to_gemini_contents(request.messages),
        system_instruction,
        tools: request
            .tools
            .filter(|tools| !tools.is_empty())
            .map(|tools| GeminiToolFormat::to_provider_tools(&tools)),
        generation_config: Some(GenerationConfig {
            temperature: request.temperature,
            top_p: request.top_p,
            max_output_tokens: Some(request.max_tokens),
            stop_sequences: request.stop_sequences,
        }),
    }
}

fn call_id(name: &str, index: usize) -> String {
    format!("{}-{}", name, index)
}

/// Numbers function calls across the whole stream; each arrives complete.
#[derive(Debug, Default)]
pub(crate) struct GeminiStreamState {
    next_call: usize,
}

impl GeminiStreamState {
    pub(crate) fn fragments(&mut self, chunk: &GeminiGenerateContentResponse) -> Vec<Fragment> {
        let mut fragments = Vec::new();
        for part in chunk.parts() {
            if let Some(text) = part.text.as_ref().filter(|t| !t.is_empty()) {
                fragments.push(Fragment::ContentDelta(text.clone()));
            }
            if let Some(call) = &part.function_call {
                let index = self.next_call;
                self.next_call += 1;
                let arguments = match &call.args {
                    Value::Null => "{}".to_string(),
                    args => args.to_string(),
                };
                fragments.push(Fragment::ToolCallDelta {
                    index,
                    id: Some(call_id(&call.name, index)),
                    name: Some(call.name.clone()),
                    arguments_chunk: arguments,
                });
            }
        }
        fragments
    }
}

#[async_trait]
impl crate::client::LlmClient for GeminiClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let model = request.model.clone();
        let response = self
            .generate_content(&model, to_gemini_request(request))
            .await?;

        let mut content = String::new();
        let mut tool_calls = Vec::new();
        for part in response.parts() {
            if let Some(text) = &part.text {
                content.push_str(text);
            }
            if let Some(call) = &part.function_call {
                tool_calls.push(ToolCall::new(
                    call_id(&call.name, tool_calls.len()),
                    call.name.clone(),
                    call.args.clone(),
                ));
            }
        }

        let usage = response.usage_metadata.clone().unwrap_or_default();
        Ok(CompletionResponse {
            content,
            role: Role::Assistant,
            usage: Usage {
                input_tokens: usage.prompt_token_count,
                output_tokens: usage.candidates_token_count,
            },
            stop_reason: response
                .candidates
                .first()
                .and_then(|c| c.finish_reason.clone()),
            tool_calls,
        })
    }

    fn provider_name(&self) -> &str {
        crate::providers::GOOGLE
    }

    fn model_name(&self) -> &str {
        crate::models::gemini::GEMINI_2_5_FLASH_ID
    }

    fn supports_streaming(&self) -> bool {
        true
    }

    async fn stream_complete(&self, request: CompletionRequest) -> Result<FragmentStream, LlmError> {
        let url = format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse",
            self.base_url, request.model
        );
        let response = self.send(url, &to_gemini_request(request)).await?;
        let mut payloads = Box::pin(crate::sse::data_payloads(response));

        let stream = async_stream::stream! {
            let mut state = GeminiStreamState::default();
            while let Some(payload) = payloads.next().await {
                let payload = match payload {
                    Ok(payload) => payload,
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                };

                match serde_json::from_str::<GeminiGenerateContentResponse>(&payload) {
                    Ok(chunk) => {
                        for fragment in state.fragments(&chunk) {
                            yield Ok(fragment);
                        }
                    }
                    Err(parse_error) => {
                        if let Ok(error) = serde_json::from_str::<GeminiErrorResponse>(&payload) {
                            yield Err(LlmError::stream(error.error.message));
                            return;
                        }
                        warn!(payload = %payload, error = %parse_error, "failed to parse gemini chunk");
                    }
                }
            }
            yield Ok(Fragment::Done);
        };

        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_creation() {
        let client = GeminiClient::new("test-key");
        assert!(client.is_ok());
    }

    #[test]
    fn test_client_creation_empty_key() {
        let client = GeminiClient::new("");
        assert!(client.is_err());
    }

    #[test]
    fn test_tool_result_uses_function_name() {
        let contents = to_gemini_contents(vec![
            Message::user("hi"),
            Message::assistant_with_tools(
                "",
                vec![ToolCall::new(
                    "get_base_repo-0".to_string(),
                    "get_base_repo".to_string(),
                    json!({}),
                )],
            ),
            Message::tool_result("get_base_repo-0", "[1, 2]"),
        ]);

        assert_eq!(contents.len(), 3);
        let response = contents[2].parts[0].function_response.as_ref().unwrap();
        assert_eq!(response.name, "get_base_repo");
        assert_eq!(response.response, json!({"result": "[1, 2]"}));
    }

    #[test]
    fn test_stream_chunk_fragments() {
        let chunk: GeminiGenerateContentResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": {
                    "role": "model",
                    "parts": [
                        {"text": "Looking"},
                        {"functionCall": {"name": "get_project_structure", "args": {}}}
                    ]
                }
            }]
        }))
        .unwrap();

        let mut state = GeminiStreamState::default();
        let fragments = state.fragments(&chunk);
        assert_eq!(
            fragments,
            vec![
                Fragment::ContentDelta("Looking".to_string()),
                Fragment::ToolCallDelta {
                    index: 0,
                    id: Some("get_project_structure-0".to_string()),
                    name: Some("get_project_structure".to_string()),
                    arguments_chunk: "{}".to_string(),
                },
            ]
        );

        // A second call in a later chunk gets the next index
        let again = state.fragments(&chunk);
        assert!(matches!(again[1], Fragment::ToolCallDelta { index: 1, .. }));
    }
}
