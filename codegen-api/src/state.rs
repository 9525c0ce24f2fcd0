use codegen_agents::{Agent, AgentKind, EvictionPolicy};
use codegen_types::{AgentInfo, ProviderInfo};
use std::collections::HashMap;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Shared handler state: one [`Agent`] per enabled kind
pub struct AppState {
    agents: HashMap<AgentKind, Agent>,
    providers: Vec<ProviderInfo>,
}

#[derive(Debug, PartialEq, Eq)]
pub enum AgentLookupError {
    Unknown(String),
    Disabled(AgentKind),
}

impl AppState {
    pub fn new(agents: Vec<Agent>, providers: Vec<ProviderInfo>) -> Self {
        Self {
            agents: agents.into_iter().map(|agent| (agent.kind(), agent)).collect(),
            providers,
        }
    }

    /// Resolve a requested agent name; `manager` when none is given
    pub fn agent(&self, name: Option<&str>) -> Result<&Agent, AgentLookupError> {
        let name = name.unwrap_or(AgentKind::Manager.name());
        let kind = AgentKind::from_name(name)
            .ok_or_else(|| AgentLookupError::Unknown(name.to_string()))?;
        self.agents.get(&kind).ok_or(AgentLookupError::Disabled(kind))
    }

    pub fn agent_infos(&self) -> Vec<AgentInfo> {
        AgentKind::ALL
            .into_iter()
            .map(|kind| match self.agents.get(&kind) {
                Some(agent) => AgentInfo {
                    id: kind.name().to_string(),
                    description: kind.description().to_string(),
                    provider: agent.profile().provider_name().to_string(),
                    model: agent.profile().model().to_string(),
                    tools: agent
                        .profile()
                        .tools()
                        .names()
                        .into_iter()
                        .map(String::from)
                        .collect(),
                    enabled: true,
                },
                None => AgentInfo {
                    id: kind.name().to_string(),
                    description: kind.description().to_string(),
                    provider: kind.provider().name().to_string(),
                    model: kind.default_model().to_string(),
                    tools: kind.tool_names().iter().map(|t| t.to_string()).collect(),
                    enabled: false,
                },
            })
            .collect()
    }

    pub fn providers(&self) -> &[ProviderInfo] {
        &self.providers
    }

    /// Start one eviction sweeper per agent whose policy evicts anything
    pub fn spawn_sweepers(&self, interval: Duration, cancel: &CancellationToken) -> Vec<JoinHandle<()>> {
        self.agents
            .values()
            .filter(|agent| agent.sessions().policy() != EvictionPolicy::default())
            .map(|agent| {
                agent
                    .sessions()
                    .clone()
                    .spawn_sweeper(interval, cancel.child_token())
            })
            .collect()
    }
}

/// Wait for sweepers to stop. Returns how many ended in a panic or abort.
pub async fn join_sweepers(sweepers: Vec<JoinHandle<()>>) -> usize {
    let mut failed = 0;
    for sweeper in sweepers {
        if let Err(e) = sweeper.await {
            warn!("Session sweeper task failed: {}", e);
            failed += 1;
        }
    }
    failed
}
