//! Reasoner clients for genaiops.
//!
//! Every client implements `genaiops_core::Provider`. [`build_from_config`]
//! turns the `[provider]` config section into a ready-to-use client.

pub mod openai_compat;

pub use openai_compat::{NVIDIA_BASE_URL, OpenAiCompatProvider};

use genaiops_config::AppConfig;
use genaiops_core::Provider;
use genaiops_core::error::ProviderError;
use std::sync::Arc;
use std::time::Duration;

pub use genaiops_config::DEFAULT_MODEL;

/// Build the configured reasoner client.
///
/// Fails with [`ProviderError::NotConfigured`] when no API key is available.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let settings = &config.provider;
    let api_key = settings
        .api_key
        .clone()
        .filter(|k| !k.trim().is_empty())
        .ok_or_else(|| {
            ProviderError::NotConfigured(
                "set GENAIOPS_API_KEY or NVIDIA_API_KEY, or provider.api_key in config.toml".into(),
            )
        })?;

    tracing::debug!(
        provider = %settings.name,
        base_url = %settings.base_url,
        model = %settings.model,
        "Building provider"
    );

    let provider = OpenAiCompatProvider::with_timeout(
        settings.name.clone(),
        settings.base_url.clone(),
        api_key,
        Duration::from_secs(settings.timeout_secs),
    )
    .with_model(settings.model.clone());

    Ok(Arc::new(provider))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_requires_api_key() {
        let config = AppConfig::default();
        let err = build_from_config(&config).err().unwrap();
        assert!(matches!(err, ProviderError::NotConfigured(_)));
    }

    #[test]
    fn build_uses_configured_name() {
        let mut config = AppConfig::default();
        config.provider.api_key = Some("nvapi-test".into());
        config.provider.name = "nim".into();
        let provider = build_from_config(&config).unwrap();
        assert_eq!(provider.name(), "nim");
    }
}
