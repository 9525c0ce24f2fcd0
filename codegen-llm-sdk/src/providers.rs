//! Provider name constants
//!
//! Canonical provider names used throughout the SDK, plus a small factory
//! that turns a provider and an API key into a boxed [`LlmClient`].

use crate::{
    claude::ClaudeClient, client::LlmClient, error::LlmError, gemini::GeminiClient,
    openai::OpenAIClient,
};
use std::sync::Arc;

/// Anthropic (Claude) provider
pub const ANTHROPIC: &str = "anthropic";

/// OpenAI provider
pub const OPENAI: &str = "openai";

/// Google (Gemini models)
pub const GOOGLE: &str = "google";

/// A vendor this SDK can talk to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    OpenAI,
    Anthropic,
    Google,
}

impl Provider {
    pub const ALL: [Provider; 3] = [Provider::OpenAI, Provider::Anthropic, Provider::Google];

    pub fn name(&self) -> &'static str {
        match self {
            Provider::OpenAI => OPENAI,
            Provider::Anthropic => ANTHROPIC,
            Provider::Google => GOOGLE,
        }
    }

    /// Environment variable consulted when no key is configured
    pub fn api_key_env(&self) -> &'static str {
        match self {
            Provider::OpenAI => "OPENAI_API_KEY",
            Provider::Anthropic => "ANTHROPIC_API_KEY",
            Provider::Google => "GEMINI_API_KEY",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            OPENAI => Some(Provider::OpenAI),
            ANTHROPIC | "claude" => Some(Provider::Anthropic),
            GOOGLE | "gemini" => Some(Provider::Google),
            _ => None,
        }
    }

    /// Build a client for this provider, optionally against a custom base URL
    pub fn client(
        &self,
        api_key: &str,
        base_url: Option<&str>,
    ) -> Result<Arc<dyn LlmClient>, LlmError> {
        let client: Arc<dyn LlmClient> = match self {
            Provider::OpenAI => {
                let client = OpenAIClient::new(api_key)?;
                Arc::new(match base_url {
                    Some(url) => client.with_base_url(url),
                    None => client,
                })
            }
            Provider::Anthropic => {
                let client = ClaudeClient::new(api_key)?;
                Arc::new(match base_url {
                    Some(url) => client.with_base_url(url),
                    None => client,
                })
            }
            Provider::Google => {
                let client = GeminiClient::new(api_key)?;
                Arc::new(match base_url {
                    Some(url) => client.with_base_url(url),
                    None => client,
                })
            }
        };
        Ok(client)
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
