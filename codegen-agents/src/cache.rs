use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::RwLock;
use tracing::debug;

/// What is known about a user's project when their session starts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Anything else the cache holds for the project
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Invalid cache key: {0}")]
    InvalidKey(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Read-only project metadata lookup, consulted when a session is created
#[async_trait]
pub trait ProjectCache: Send + Sync {
    async fn get_project_details(&self, user_id: &str)
        -> Result<Option<ProjectDetails>, CacheError>;
}

#[derive(Debug, Default)]
pub struct InMemoryProjectCache {
    entries: RwLock<HashMap<String, ProjectDetails>>,
}

impl InMemoryProjectCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, user_id: impl Into<String>, details: ProjectDetails) {
        self.entries.write().await.insert(user_id.into(), details);
    }
}

#[async_trait]
impl ProjectCache for InMemoryProjectCache {
    async fn get_project_details(
        &self,
        user_id: &str,
    ) -> Result<Option<ProjectDetails>, CacheError> {
        Ok(self.entries.read().await.get(user_id).cloned())
    }
}

/// One `<user_id>.json` file per user inside a directory
#[derive(Debug, Clone)]
pub struct FileProjectCache {
    dir: PathBuf,
}

impl FileProjectCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, user_id: &str) -> Result<PathBuf, CacheError> {
        let valid = !user_id.is_empty()
            && user_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '@'))
            && !user_id.starts_with('.');
        if !valid {
            return Err(CacheError::InvalidKey(user_id.to_string()));
        }
        Ok(self.dir.join(format!("{}.json", user_id)))
    }
}

#[async_trait]
impl ProjectCache for FileProjectCache {
    async fn get_project_details(
        &self,
        user_id: &str,
    ) -> Result<Option<ProjectDetails>, CacheError> {
        let path = self.path_for(user_id)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no cached project details");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}
