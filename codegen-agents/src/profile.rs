use crate::cache::{ProjectCache, ProjectDetails};
use crate::session::{Session, SessionConfig};
use anyhow::Context;
use codegen_llm_sdk::{client::LlmClient, models, providers::Provider};
use codegen_tools::{project, ProjectPaths, ToolRegistry};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// The agents this service offers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    /// Plans the work and sets up the base project
    Manager,
    /// Writes code with Claude
    Coder,
    /// Writes code with Gemini
    CoderGemini,
}

impl AgentKind {
    pub const ALL: [AgentKind; 3] = [AgentKind::Manager, AgentKind::Coder, AgentKind::CoderGemini];

    pub fn name(&self) -> &'static str {
        match self {
            AgentKind::Manager => "manager",
            AgentKind::Coder => "coder",
            AgentKind::CoderGemini => "coder_gemini",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    pub fn description(&self) -> &'static str {
        match self {
            AgentKind::Manager => "Technical lead that plans features and sets up the base project",
            AgentKind::Coder => "Developer that returns complete file implementations (Claude)",
            AgentKind::CoderGemini => "Developer that returns complete file implementations (Gemini)",
        }
    }

    pub fn provider(&self) -> Provider {
        match self {
            AgentKind::Manager => Provider::OpenAI,
            AgentKind::Coder => Provider::Anthropic,
            AgentKind::CoderGemini => Provider::Google,
        }
    }

    pub fn default_model(&self) -> &'static str {
        match self {
            AgentKind::Manager => models::openai::GPT_4O_ID,
            AgentKind::Coder => models::claude::SONNET_4_5_ID,
            AgentKind::CoderGemini => models::gemini::GEMINI_2_5_FLASH_ID,
        }
    }

    pub fn temperature(&self) -> Option<f32> {
        match self {
            AgentKind::Manager => None,
            AgentKind::Coder | AgentKind::CoderGemini => Some(0.6),
        }
    }

    pub fn tool_names(&self) -> &'static [&'static str] {
        match self {
            AgentKind::Manager => &[project::GET_BASE_REPO, project::GET_PROJECT_STRUCTURE],
            AgentKind::Coder | AgentKind::CoderGemini => &[],
        }
    }
}

impl std::fmt::Display for AgentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Collaborators a profile reads from while building a session
pub struct ProfileContext {
    pub project: ProjectPaths,
    pub cache: Arc<dyn ProjectCache>,
}

/// How sessions of one agent kind are configured
pub struct AgentProfile {
    kind: AgentKind,
    model: String,
    client: Arc<dyn LlmClient>,
    tools: Arc<ToolRegistry>,
    max_tokens: u32,
}

impl AgentProfile {
    /// `available` is narrowed to the tools this kind may call
    pub fn new(kind: AgentKind, client: Arc<dyn LlmClient>, available: &ToolRegistry) -> Self {
        Self {
            kind,
            model: kind.default_model().to_string(),
            client,
            tools: Arc::new(available.select(kind.tool_names())),
            max_tokens: 4096,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn kind(&self) -> AgentKind {
        self.kind
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn provider_name(&self) -> &str {
        self.client.provider_name()
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            agent_name: self.kind.name().to_string(),
            model: self.model.clone(),
            client: Arc::clone(&self.client),
            temperature: self.kind.temperature(),
            max_tokens: self.max_tokens,
            tools: Arc::clone(&self.tools),
        }
    }

    /// Build a fresh session, instructions included
    pub async fn create_session(
        &self,
        user_id: &str,
        context: &ProfileContext,
    ) -> anyhow::Result<Session> {
        let instructions = match self.kind {
            AgentKind::Manager => {
                let details = match context.cache.get_project_details(user_id).await {
                    Ok(details) => details,
                    Err(e) => {
                        warn!(user_id = %user_id, error = %e, "project cache lookup failed");
                        None
                    }
                };
                manager_instructions(details.as_ref())
            }
            AgentKind::Coder => {
                let root = context.project.project_root.clone();
                let structure = tokio::task::spawn_blocking(move || project::project_structure(&root))
                    .await
                    .context("project structure task failed")?
                    .with_context(|| {
                        format!(
                            "reading project structure from {}",
                            context.project.project_root.display()
                        )
                    })?;
                coder_instructions(&structure)
            }
            AgentKind::CoderGemini => {
                let path = context.project.base_repo_path.clone();
                let structure = tokio::task::spawn_blocking(move || project::load_base_repo(&path))
                    .await
                    .context("base repo task failed")?
                    .with_context(|| {
                        format!(
                            "reading base repo from {}",
                            context.project.base_repo_path.display()
                        )
                    })?;
                coder_instructions(&structure)
            }
        };

        debug!(user_id = %user_id, agent = %self.kind, chars = instructions.len(), "built instructions");
        Ok(Session::new(user_id, self.session_config(), instructions))
    }
}

fn manager_instructions(details: Option<&ProjectDetails>) -> String {
    let mut text = String::from(
        "You are the technical lead of a small team building web applications. \
Understand what the user wants, explain the plan you will follow, and ask \
clarifying questions when the request is ambiguous.\n\n\
Every application is a Next.js project written in TypeScript with Shadcn UI \
and Tailwind CSS. New features are always built on top of the base project.\n\n\
Conversation flow:\n\
1. When the user asks for a new application, call get_base_repo to set up the base project.\n\
2. When the user wants to continue, call get_project_structure to see the current files \
and describe which files must be created or changed.\n\n\
Available tools:\n\
- get_base_repo: returns the base Next.js project structure as JSON.\n\
- get_project_structure: returns the current project tree with file contents as JSON.\n",
    );

    if let Some(details) = details {
        let json = serde_json::to_string_pretty(details).unwrap_or_default();
        text.push_str("\nKnown details about this user's project:\n");
        text.push_str(&json);
        text.push('\n');
    }
    text
}

fn coder_instructions(structure: &Value) -> String {
    format!(
        "You are an expert developer working on a Next.js project written in TypeScript \
with Shadcn UI and Tailwind CSS. For each task, respond with a complete implementation.\n\n\
Current project structure as JSON:\n{structure}\n\n\
Always answer with a single valid JSON object and nothing else:\n\
{{\n  \"file_name\": \"name of the file, e.g. todo.tsx\",\n  \
\"file_path\": \"full path of the file, e.g. src/app/todo.tsx\",\n  \
\"code\": \"the complete code of the file\",\n  \
\"description\": \"short explanation of the code\"\n}}\n"
    )
}
