//! JSON body shared by the HTTP and CLI front ends.

use serde::{Deserialize, Serialize};

use crate::outcome::TaskOutcome;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Success,
    Error,
}

/// `{"status":"success","result":...}` or
/// `{"status":"error","error":...,"details":...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskResponse {
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl From<&TaskOutcome> for TaskResponse {
    fn from(outcome: &TaskOutcome) -> Self {
        match outcome {
            TaskOutcome::Success { message, artifact } => Self {
                status: Status::Success,
                result: Some(message.clone()),
                artifact: artifact.clone(),
                error: None,
                details: None,
            },
            TaskOutcome::Failure { kind, details } => Self {
                status: Status::Error,
                result: None,
                artifact: None,
                error: Some(kind.as_str().to_string()),
                details: Some(details.clone()),
            },
        }
    }
}
