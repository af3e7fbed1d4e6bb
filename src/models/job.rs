use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum MaskingStyle {
    #[default]
    Block,
    Asterisk,
    MaskTag,
}

impl MaskingStyle {
    /// The literal token substituted for each masked span.
    pub fn token(self) -> &'static str {
        match self {
            MaskingStyle::Block => "■■■",
            MaskingStyle::Asterisk => "***",
            MaskingStyle::MaskTag => "[MASK]",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MaskingLanguage {
    #[default]
    Ja,
    En,
    Auto,
}

impl MaskingLanguage {
    pub fn as_str(self) -> &'static str {
        match self {
            MaskingLanguage::Ja => "ja",
            MaskingLanguage::En => "en",
            MaskingLanguage::Auto => "auto",
        }
    }
}

/// Per-job knobs handed through to the masking operation untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MaskingOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<MaskingStyle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep_length: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<MaskingLanguage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask_unknown_entities: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    pub id: String,
    pub text: String,
    pub requested_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<MaskingOptions>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    #[serde(rename = "E_USAGE")]
    Usage,
    #[serde(rename = "E_NETWORK")]
    Network,
    #[serde(rename = "E_TIMEOUT")]
    Timeout,
    #[serde(rename = "E_MASK_FAILED")]
    MaskFailed,
    #[serde(rename = "E_CANCELLED")]
    Cancelled,
    #[serde(rename = "E_INTERNAL")]
    Internal,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Usage => "E_USAGE",
            ErrorCode::Network => "E_NETWORK",
            ErrorCode::Timeout => "E_TIMEOUT",
            ErrorCode::MaskFailed => "E_MASK_FAILED",
            ErrorCode::Cancelled => "E_CANCELLED",
            ErrorCode::Internal => "E_INTERNAL",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, thiserror::Error)]
#[error("{code}: {message}")]
pub struct JobError {
    pub code: ErrorCode,
    pub message: String,
}

impl JobError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn cancelled() -> Self {
        Self::new(ErrorCode::Cancelled, "Job was cancelled before execution.")
    }
}

/// Terminal result of one job. Exactly one is produced per job.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum JobOutcome {
    #[serde(rename_all = "camelCase")]
    Succeeded {
        masked_text: String,
        model: String,
        endpoint: String,
        finished_at: DateTime<Utc>,
    },
    Failed { error: JobError },
}

impl JobOutcome {
    pub fn failed(code: ErrorCode, message: impl Into<String>) -> Self {
        JobOutcome::Failed {
            error: JobError::new(code, message),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, JobOutcome::Succeeded { .. })
    }

    pub fn error_code(&self) -> Option<ErrorCode> {
        match self {
            JobOutcome::Succeeded { .. } => None,
            JobOutcome::Failed { error } => Some(error.code),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_tokens() {
        assert_eq!(MaskingStyle::Block.token(), "■■■");
        assert_eq!(MaskingStyle::Asterisk.token(), "***");
        assert_eq!(MaskingStyle::MaskTag.token(), "[MASK]");
        assert_eq!(MaskingStyle::default(), MaskingStyle::Block);
    }

    #[test]
    fn test_error_code_serializes_as_stable_string() {
        let variants = vec![
            (ErrorCode::Usage, "\"E_USAGE\""),
            (ErrorCode::Network, "\"E_NETWORK\""),
            (ErrorCode::Timeout, "\"E_TIMEOUT\""),
            (ErrorCode::MaskFailed, "\"E_MASK_FAILED\""),
            (ErrorCode::Cancelled, "\"E_CANCELLED\""),
            (ErrorCode::Internal, "\"E_INTERNAL\""),
        ];
        for (code, expected) in variants {
            let json = serde_json::to_string(&code).expect("serialize");
            assert_eq!(json, expected);
            assert_eq!(format!("\"{}\"", code), expected);
        }
    }

    #[test]
    fn test_options_deserialize_camel_case() {
        let json = r#"{"style": "maskTag", "keepLength": true, "language": "en"}"#;
        let options: MaskingOptions = serde_json::from_str(json).expect("deserialize");
        assert_eq!(options.style, Some(MaskingStyle::MaskTag));
        assert_eq!(options.keep_length, Some(true));
        assert_eq!(options.language, Some(MaskingLanguage::En));
        assert!(options.mask_unknown_entities.is_none());
        assert!(options.model.is_none());
    }

    #[test]
    fn test_outcome_tagged_serialization() {
        let outcome = JobOutcome::failed(ErrorCode::Network, "refused");
        let value = serde_json::to_value(&outcome).expect("serialize");
        assert_eq!(value["status"], "failed");
        assert_eq!(value["error"]["code"], "E_NETWORK");
        assert_eq!(value["error"]["message"], "refused");

        let outcome = JobOutcome::Succeeded {
            masked_text: "■■■ said hi".to_string(),
            model: "m".to_string(),
            endpoint: "host".to_string(),
            finished_at: Utc::now(),
        };
        let value = serde_json::to_value(&outcome).expect("serialize");
        assert_eq!(value["status"], "succeeded");
        assert_eq!(value["maskedText"], "■■■ said hi");
        assert!(value.get("finishedAt").is_some());
    }

    #[test]
    fn test_cancelled_error() {
        let err = JobError::cancelled();
        assert_eq!(err.code, ErrorCode::Cancelled);
        assert_eq!(err.message, "Job was cancelled before execution.");
        assert_eq!(
            err.to_string(),
            "E_CANCELLED: Job was cancelled before execution."
        );
        let outcome = JobOutcome::Failed { error: err };
        assert!(!outcome.is_success());
        assert_eq!(outcome.error_code(), Some(ErrorCode::Cancelled));
    }
}
