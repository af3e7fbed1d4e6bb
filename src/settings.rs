use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;

use crate::models::{MaskConfig, ResolvedSettings};

/// Supplies connection settings. Called once per job, when the job starts.
#[async_trait]
pub trait SettingsProvider: Send + Sync {
    async fn resolved_settings(&self) -> Result<ResolvedSettings>;
}

/// Always returns the same settings.
pub struct StaticSettingsProvider {
    settings: ResolvedSettings,
}

impl StaticSettingsProvider {
    pub fn new(settings: ResolvedSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl SettingsProvider for StaticSettingsProvider {
    async fn resolved_settings(&self) -> Result<ResolvedSettings> {
        Ok(self.settings.clone())
    }
}

/// Re-reads the config file and `MASK_CUT_*` environment on every call.
pub struct ConfigSettingsProvider {
    config_path: Option<PathBuf>,
}

impl ConfigSettingsProvider {
    pub fn new(config_path: Option<PathBuf>) -> Self {
        Self { config_path }
    }

    /// Config file plus `MASK_CUT_*` environment overrides.
    pub async fn load_config(&self) -> Result<MaskConfig> {
        let mut config = match self.config_path {
            Some(ref path) => MaskConfig::load(path).await?,
            None => MaskConfig::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }
}

#[async_trait]
impl SettingsProvider for ConfigSettingsProvider {
    async fn resolved_settings(&self) -> Result<ResolvedSettings> {
        let config = self.load_config().await?;
        let api_key = std::env::var(&config.api_key_env).ok();
        Ok(config.resolve(api_key))
    }
}
