use crate::config::ApiConfig;
use crate::helpers::llm::{api_key_for, create_llm_client, default_model};
use crate::state::AppState;
use codegen_agents::{
    Agent, AgentKind, AgentProfile, FileProjectCache, InMemoryProjectCache, ProfileContext,
    ProjectCache,
};
use codegen_llm_sdk::providers::Provider;
use codegen_tools::{register_project_tools, ProjectPaths, ToolRegistry};
use codegen_types::ProviderInfo;
use std::sync::Arc;
use tracing::{info, warn};

/// Build every agent whose provider has an API key. The rest are listed as
/// disabled.
pub fn build_app_state(config: &ApiConfig) -> anyhow::Result<AppState> {
    let paths = ProjectPaths {
        base_repo_path: config.project.base_repo_path.clone(),
        project_root: config.project.project_root.clone(),
    };

    let mut tools = ToolRegistry::new();
    register_project_tools(&mut tools, &paths)?;

    let cache: Arc<dyn ProjectCache> = match &config.project.cache_dir {
        Some(dir) => Arc::new(FileProjectCache::new(dir)),
        None => Arc::new(InMemoryProjectCache::new()),
    };
    let context = Arc::new(ProfileContext {
        project: paths,
        cache,
    });
    let policy = config.sessions.eviction_policy();

    let mut agents = Vec::new();
    for kind in AgentKind::ALL {
        match create_llm_client(kind.provider(), config) {
            Ok(client) => {
                let profile = AgentProfile::new(kind, client, &tools);
                info!(agent = %kind, model = %profile.model(), "agent enabled");
                agents.push(Agent::new(profile, Arc::clone(&context), policy));
            }
            Err(e) => warn!(agent = %kind, error = %e, "agent disabled"),
        }
    }

    Ok(AppState::new(agents, provider_infos(config)))
}

pub fn provider_infos(config: &ApiConfig) -> Vec<ProviderInfo> {
    Provider::ALL
        .into_iter()
        .map(|provider| ProviderInfo {
            name: provider.name().to_string(),
            default_model: default_model(provider).to_string(),
            configured: api_key_for(provider, config).is_some(),
        })
        .collect()
}
