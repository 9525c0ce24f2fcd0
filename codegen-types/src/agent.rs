use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Agent information for the agents list
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AgentInfo {
    pub id: String,
    pub description: String,
    pub provider: String,
    pub model: String,
    pub tools: Vec<String>,
    /// False when the provider has no API key configured
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AgentsResponse {
    pub agents: Vec<AgentInfo>,
}

/// A model vendor and whether it can be used
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProviderInfo {
    pub name: String,
    pub default_model: String,
    pub configured: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProvidersResponse {
    pub providers: Vec<ProviderInfo>,
}
