use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Record of one completed masking result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub input_text: String,
    pub masked_text: String,
    pub model: String,
    pub endpoint: String,
    pub finished_at: DateTime<Utc>,
}

/// Whole persisted cache document. There is no version field; changing this
/// shape breaks anything reading the file directly.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CacheState {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_input: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_result: Option<Snapshot>,
}

impl CacheState {
    pub fn is_empty(&self) -> bool {
        self.last_input.is_none() && self.last_result.is_none()
    }
}
