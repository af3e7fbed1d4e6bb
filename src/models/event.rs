use serde::{Deserialize, Serialize};

use crate::models::job::{ErrorCode, JobOutcome};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Queued,
    Running,
    Succeeded,
    Failed,
}

impl JobState {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }
}

/// Broadcast notification of one job transition.
///
/// `locked` is the queue's busyness right after the transition it announces.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StatusEvent {
    pub job_id: String,
    pub state: JobState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub masked_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<ErrorCode>,
    pub locked: bool,
}

impl StatusEvent {
    pub fn transition(job_id: &str, state: JobState, locked: bool) -> Self {
        Self {
            job_id: job_id.to_string(),
            state,
            masked_text: None,
            model: None,
            endpoint: None,
            message: None,
            error_code: None,
            locked,
        }
    }

    /// Fold a job outcome into its terminal event.
    pub fn terminal(job_id: &str, outcome: &JobOutcome, locked: bool) -> Self {
        match outcome {
            JobOutcome::Succeeded {
                masked_text,
                model,
                endpoint,
                ..
            } => Self {
                masked_text: Some(masked_text.clone()),
                model: Some(model.clone()),
                endpoint: Some(endpoint.clone()),
                ..Self::transition(job_id, JobState::Succeeded, locked)
            },
            JobOutcome::Failed { error } => Self {
                message: Some(error.message.clone()),
                error_code: Some(error.code),
                ..Self::transition(job_id, JobState::Failed, locked)
            },
        }
    }
}
