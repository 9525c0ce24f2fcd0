#![allow(dead_code)]

use actix_web::{web, App};
use codegen_agents::{
    Agent, AgentKind, AgentProfile, EvictionPolicy, InMemoryProjectCache, ProfileContext,
};
use codegen_api::state::AppState;
use codegen_llm_sdk::client::LlmClient;
use codegen_llm_sdk::error::LlmError;
use codegen_llm_sdk::types::{
    CompletionRequest, CompletionResponse, Fragment, FragmentStream, Role, Usage,
};
use codegen_tools::{register_project_tools, ProjectPaths, ToolRegistry};
use codegen_types::ProviderInfo;
use futures_util::StreamExt;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

pub struct MockLlmClient {
    pub responses: Mutex<Vec<CompletionResponse>>,
    /// Scripted fragments, and whether the stream stalls after them
    pub streams: Mutex<Vec<(Vec<Fragment>, bool)>>,
    pub call_count: Mutex<usize>,
}

impl MockLlmClient {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(Vec::new()),
            streams: Mutex::new(Vec::new()),
            call_count: Mutex::new(0),
        }
    }

    pub fn push_response(&self, response: CompletionResponse) {
        self.responses.lock().unwrap().push(response);
    }

    pub fn push_stream(&self, fragments: Vec<Fragment>) {
        self.streams.lock().unwrap().push((fragments, false));
    }

    /// Stream that never ends after `fragments`, like a stalled connection
    pub fn push_stalled_stream(&self, fragments: Vec<Fragment>) {
        self.streams.lock().unwrap().push((fragments, true));
    }

    pub fn get_call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }
}

impl Default for MockLlmClient {
    fn default() -> Self {
        Self::new()
    }
}

pub fn create_completion_response_with_text(text: &str) -> CompletionResponse {
    CompletionResponse {
        content: text.to_string(),
        role: Role::Assistant,
        usage: Usage {
            input_tokens: 10,
            output_tokens: 20,
        },
        stop_reason: Some("end_turn".to_string()),
        tool_calls: Vec::new(),
    }
}

#[async_trait::async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        *self.call_count.lock().unwrap() += 1;

        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            Ok(create_completion_response_with_text("Here is the plan."))
        } else {
            Ok(responses.remove(0))
        }
    }

    fn provider_name(&self) -> &str {
        "mock"
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }

    fn supports_streaming(&self) -> bool {
        true
    }

    async fn stream_complete(&self, _request: CompletionRequest) -> Result<FragmentStream, LlmError> {
        *self.call_count.lock().unwrap() += 1;

        let mut streams = self.streams.lock().unwrap();
        let (fragments, stalls) = if streams.is_empty() {
            (
                vec![Fragment::ContentDelta("Here is the plan.".to_string()), Fragment::Done],
                false,
            )
        } else {
            streams.remove(0)
        };
        let scripted = futures_util::stream::iter(fragments.into_iter().map(Ok));
        if stalls {
            Ok(Box::pin(scripted.chain(futures_util::stream::pending())))
        } else {
            Ok(Box::pin(scripted))
        }
    }
}

pub struct TestApp<S> {
    pub mock_llm_client: Arc<MockLlmClient>,
    pub app: S,
    _dir: TempDir,
}

/// App with the manager and coder agents backed by one mock client;
/// `coder_gemini` is left disabled.
pub async fn setup_test_app() -> anyhow::Result<
    TestApp<
        impl actix_web::dev::Service<
            actix_http::Request,
            Response = actix_web::dev::ServiceResponse,
            Error = actix_web::Error,
        >,
    >,
> {
    let dir = TempDir::new()?;
    let project_root = dir.path().join("app");
    std::fs::create_dir_all(&project_root)?;
    std::fs::write(project_root.join("package.json"), "{}")?;
    let base_repo_path = dir.path().join("base_repo.json");
    std::fs::write(&base_repo_path, "{\"base\": {\"files\": {}, \"directories\": {}}}")?;

    let paths = ProjectPaths {
        base_repo_path,
        project_root,
    };
    let mut tools = ToolRegistry::new();
    register_project_tools(&mut tools, &paths)?;
    let context = Arc::new(ProfileContext {
        project: paths,
        cache: Arc::new(InMemoryProjectCache::new()),
    });

    let mock_llm_client = Arc::new(MockLlmClient::new());
    let client = mock_llm_client.clone() as Arc<dyn LlmClient>;
    let agents = [AgentKind::Manager, AgentKind::Coder]
        .into_iter()
        .map(|kind| {
            Agent::new(
                AgentProfile::new(kind, Arc::clone(&client), &tools),
                Arc::clone(&context),
                EvictionPolicy::default(),
            )
        })
        .collect();
    let providers = vec![ProviderInfo {
        name: "openai".to_string(),
        default_model: "gpt-4o".to_string(),
        configured: true,
    }];

    let app = actix_web::test::init_service(
        App::new()
            .app_data(web::Data::new(AppState::new(agents, providers)))
            .configure(codegen_api::configure),
    )
    .await;

    Ok(TestApp {
        mock_llm_client,
        app,
        _dir: dir,
    })
}

