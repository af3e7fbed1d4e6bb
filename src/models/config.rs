use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::errors::MaskError;

/// Connection settings for one job, resolved when the job starts running.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedSettings {
    pub endpoint_url: String,
    pub model_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_ms: Option<u64>,
}

impl ResolvedSettings {
    /// Explicit label, else the URL host, else the raw endpoint string.
    pub fn endpoint_label(&self) -> String {
        if let Some(label) = self.endpoint_label.as_deref().filter(|l| !l.is_empty()) {
            return label.to_string();
        }
        match reqwest::Url::parse(&self.endpoint_url) {
            Ok(url) => match url.host_str() {
                Some(host) if !host.is_empty() => host.to_string(),
                _ => self.endpoint_url.clone(),
            },
            Err(_) => self.endpoint_url.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaskConfig {
    #[serde(default = "default_endpoint_url")]
    pub endpoint_url: String,
    #[serde(default = "default_model_name")]
    pub model_name: String,
    #[serde(default)]
    pub endpoint_label: Option<String>,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default)]
    pub cache_path: Option<PathBuf>,
}

fn default_endpoint_url() -> String {
    "http://localhost:1234/v1".to_string()
}

fn default_model_name() -> String {
    "gpt-4o-mini".to_string()
}

fn default_timeout_ms() -> u64 {
    60_000
}

fn default_api_key_env() -> String {
    "MASK_CUT_API_KEY".to_string()
}

impl Default for MaskConfig {
    fn default() -> Self {
        Self {
            endpoint_url: default_endpoint_url(),
            model_name: default_model_name(),
            endpoint_label: None,
            timeout_ms: default_timeout_ms(),
            api_key_env: default_api_key_env(),
            cache_path: None,
        }
    }
}

impl MaskConfig {
    /// Read a JSON config file. A missing file yields the defaults.
    pub async fn load(path: &Path) -> anyhow::Result<Self> {
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            tracing::debug!("config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = serde_json::from_str(&content)
            .map_err(|e| MaskError::Config(format!("{}: {}", path.display(), e)))?;
        Ok(config)
    }

    /// Default config location: `<config dir>/mask-cut/config.json`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("mask-cut").join("config.json"))
    }

    /// Cache file location, falling back to `<data dir>/mask-cut/cache.json`.
    pub fn resolved_cache_path(&self) -> Option<PathBuf> {
        self.cache_path
            .clone()
            .or_else(|| dirs::data_dir().map(|dir| dir.join("mask-cut").join("cache.json")))
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply `MASK_CUT_*` overrides read through `lookup`.
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("MASK_CUT_ENDPOINT_URL").filter(|v| !v.trim().is_empty()) {
            self.endpoint_url = url;
        }
        if let Some(model) = lookup("MASK_CUT_MODEL_NAME").filter(|v| !v.trim().is_empty()) {
            self.model_name = model;
        }
        if let Some(label) = lookup("MASK_CUT_ENDPOINT_LABEL").filter(|v| !v.trim().is_empty()) {
            self.endpoint_label = Some(label);
        }
        if let Some(timeout) = lookup("MASK_CUT_TIMEOUT_MS").and_then(|v| parse_timeout(&v)) {
            self.timeout_ms = timeout;
        }
    }

    pub fn resolve(&self, api_key: Option<String>) -> ResolvedSettings {
        ResolvedSettings {
            endpoint_url: self.endpoint_url.clone(),
            model_name: self.model_name.clone(),
            api_key: api_key.filter(|k| !k.is_empty()),
            endpoint_label: self.endpoint_label.clone(),
            timeout_ms: (self.timeout_ms > 0).then_some(self.timeout_ms),
        }
    }
}

fn parse_timeout(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok().filter(|ms| *ms > 0)
}
