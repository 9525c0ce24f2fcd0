use codegen_agents::EvictionPolicy;
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ApiConfig {
    pub server: ServerConfig,
    pub cors: Option<CorsConfig>,
    pub api_keys: Option<ApiKeysConfig>,
    #[serde(default)]
    pub sessions: SessionsConfig,
    #[serde(default)]
    pub project: ProjectConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct ApiKeysConfig {
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub gemini_api_key: Option<String>,
}

/// Session retention. Without `idle_ttl_secs` or `max_sessions` sessions
/// live until cleared.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SessionsConfig {
    pub idle_ttl_secs: Option<u64>,
    pub max_sessions: Option<usize>,
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

fn default_sweep_interval_secs() -> u64 {
    60
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            idle_ttl_secs: None,
            max_sessions: None,
            sweep_interval_secs: default_sweep_interval_secs(),
        }
    }
}

impl SessionsConfig {
    pub fn eviction_policy(&self) -> EvictionPolicy {
        EvictionPolicy {
            idle_ttl: self.idle_ttl_secs.map(Duration::from_secs),
            max_sessions: self.max_sessions,
        }
    }

    pub fn eviction_enabled(&self) -> bool {
        self.idle_ttl_secs.is_some() || self.max_sessions.is_some()
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ProjectConfig {
    /// JSON snapshot of the base template project
    pub base_repo_path: PathBuf,
    /// Project tree the coder agent works on
    pub project_root: PathBuf,
    /// Directory of `<user_id>.json` project details; in-memory when unset
    pub cache_dir: Option<PathBuf>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        let data_dir = get_default_data_dir();
        Self {
            base_repo_path: data_dir.join("base_repo.json"),
            project_root: data_dir.join("project"),
            cache_dir: None,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            cors: Some(CorsConfig {
                allowed_origins: vec!["http://localhost:3000".to_string()],
            }),
            api_keys: None,
            sessions: SessionsConfig::default(),
            project: ProjectConfig::default(),
        }
    }
}

impl ApiConfig {
    /// Load from `path`, or from the per-user config file, writing a default
    /// file first if none exists. `CODEGEN__SECTION__KEY` variables override
    /// file values.
    pub fn load(path: Option<&Path>) -> Result<(Self, PathBuf), ConfigError> {
        let config_path = path.map(Path::to_path_buf).unwrap_or_else(get_config_path);

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ConfigError::Message(format!("Failed to create config directory: {e}"))
            })?;
        }

        if !config_path.exists() {
            std::fs::write(&config_path, default_config_file()).map_err(|e| {
                ConfigError::Message(format!("Failed to write default config: {e}"))
            })?;
        }

        let builder = Config::builder()
            .add_source(File::from(config_path.clone()))
            .add_source(
                Environment::with_prefix("CODEGEN")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut config: ApiConfig = builder.try_deserialize()?;

        config.project.base_repo_path = expand_tilde(&config.project.base_repo_path);
        config.project.project_root = expand_tilde(&config.project.project_root);
        config.project.cache_dir = config.project.cache_dir.as_deref().map(expand_tilde);

        Ok((config, config_path))
    }
}

fn default_config_file() -> String {
    let project = ProjectConfig::default();
    format!(
        r#"
[server]
host = "127.0.0.1"
port = 8080

[cors]
allowed_origins = ["http://localhost:3000"]

[api_keys]
# openai_api_key = "your-openai-key"
# anthropic_api_key = "your-anthropic-key"
# gemini_api_key = "your-gemini-key"

[sessions]
# idle_ttl_secs = 3600
# max_sessions = 1000
sweep_interval_secs = 60

[project]
base_repo_path = "{}"
project_root = "{}"
# cache_dir = "~/.local/share/codegen/cache"
"#,
        project.base_repo_path.display(),
        project.project_root.display()
    )
}

fn expand_tilde(path: &Path) -> PathBuf {
    if path.starts_with("~") {
        if let Some(home) = home::home_dir() {
            let path_str = path.to_string_lossy();
            return PathBuf::from(path_str.replacen('~', &home.to_string_lossy(), 1));
        }
    }
    path.to_path_buf()
}

fn get_config_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        config_dir.join("codegen/api.toml")
    } else {
        PathBuf::from("api.toml")
    }
}

fn get_default_data_dir() -> PathBuf {
    if let Some(data_dir) = dirs::data_local_dir() {
        data_dir.join("codegen")
    } else {
        PathBuf::from(".")
    }
}
