use crate::config::ApiConfig;
use anyhow::anyhow;
use codegen_llm_sdk::{client::LlmClient, models, providers::Provider};
use std::env;
use std::sync::Arc;

/// Key from the config file, falling back to the provider's environment variable
pub fn api_key_for(provider: Provider, config: &ApiConfig) -> Option<String> {
    let configured = config.api_keys.as_ref().and_then(|keys| match provider {
        Provider::OpenAI => keys.openai_api_key.clone(),
        Provider::Anthropic => keys.anthropic_api_key.clone(),
        Provider::Google => keys.gemini_api_key.clone(),
    });

    configured
        .or_else(|| env::var(provider.api_key_env()).ok())
        .filter(|key| !key.trim().is_empty())
}

pub fn default_model(provider: Provider) -> &'static str {
    match provider {
        Provider::OpenAI => models::openai::GPT_4O_ID,
        Provider::Anthropic => models::claude::SONNET_4_5_ID,
        Provider::Google => models::gemini::GEMINI_2_5_FLASH_ID,
    }
}

pub fn create_llm_client(provider: Provider, config: &ApiConfig) -> anyhow::Result<Arc<dyn LlmClient>> {
    let api_key = api_key_for(provider, config).ok_or_else(|| {
        anyhow!(
            "No API key for {}. Set it under [api_keys] or in {}.",
            provider,
            provider.api_key_env()
        )
    })?;

    Ok(provider.client(&api_key, None)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ApiKeysConfig;

    #[test]
    fn test_configured_key_wins() {
        let config = ApiConfig {
            api_keys: Some(ApiKeysConfig {
                gemini_api_key: Some("from-config".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(
            api_key_for(Provider::Google, &config).as_deref(),
            Some("from-config")
        );
        assert!(create_llm_client(Provider::Google, &config).is_ok());
    }

    #[test]
    fn test_blank_key_is_missing() {
        let config = ApiConfig {
            api_keys: Some(ApiKeysConfig {
                openai_api_key: Some("  ".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        if env::var(Provider::OpenAI.api_key_env()).is_err() {
            assert!(api_key_for(Provider::OpenAI, &config).is_none());
            assert!(create_llm_client(Provider::OpenAI, &config).is_err());
        }
    }
}
