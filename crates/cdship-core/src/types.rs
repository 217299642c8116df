//! Shared types passed between the cdship crates.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ShipConfig;

/// Statuses that end a deployment without success.
const FAILED_STATUSES: &[&str] = &["Failed", "Stopped"];

/// A published build artifact plus its storage coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    pub bucket: String,
    pub key: String,
    /// Content fingerprint assigned by the store.
    pub etag: String,
    pub url: String,
}

/// What the store returns for a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub etag: String,
    pub url: String,
}

/// Everything the orchestrator needs to start a rollout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRequest {
    pub application_name: String,
    pub deployment_group: String,
    pub revision: Revision,
    pub deployment_config_name: String,
    pub description: String,
    pub ignore_application_stop_failures: bool,
}

impl DeploymentRequest {
    pub fn new(config: &ShipConfig, group: &str, revision: Revision, description: &str) -> Self {
        Self {
            application_name: config.deploy.application.clone(),
            deployment_group: group.to_string(),
            revision,
            deployment_config_name: config.deploy.deployment_config.clone(),
            description: description.to_string(),
            ignore_application_stop_failures: true,
        }
    }
}

/// Error descriptor attached to a deployment by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub code: String,
    pub message: String,
}

impl ErrorInfo {
    pub fn is_empty(&self) -> bool {
        self.code.is_empty() && self.message.is_empty()
    }
}

/// One observation of a deployment.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DeploymentSnapshot {
    pub status: String,
    pub error: Option<ErrorInfo>,
    pub complete_time: Option<DateTime<Utc>>,
}

impl DeploymentSnapshot {
    pub fn new(status: &str) -> Self {
        Self {
            status: status.to_string(),
            ..Default::default()
        }
    }

    pub fn completed_at(mut self, at: DateTime<Utc>) -> Self {
        self.complete_time = Some(at);
        self
    }

    pub fn with_error(mut self, code: &str, message: &str) -> Self {
        self.error = Some(ErrorInfo {
            code: code.to_string(),
            message: message.to_string(),
        });
        self
    }

    /// The error descriptor, if present and non-empty.
    pub fn error(&self) -> Option<&ErrorInfo> {
        self.error.as_ref().filter(|e| !e.is_empty())
    }

    pub fn is_failed_status(&self) -> bool {
        FAILED_STATUSES.contains(&self.status.as_str())
    }
}

/// Terminal result of a rollout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeploymentOutcome {
    Succeeded {
        deployment_id: String,
        status: String,
        completed_at: DateTime<Utc>,
    },
    Failed {
        deployment_id: String,
        status: Option<String>,
        error: ErrorInfo,
    },
}

impl DeploymentOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, DeploymentOutcome::Succeeded { .. })
    }

    pub fn deployment_id(&self) -> &str {
        match self {
            DeploymentOutcome::Succeeded { deployment_id, .. }
            | DeploymentOutcome::Failed { deployment_id, .. } => deployment_id,
        }
    }
}

/// Description used when the operator does not supply one.
pub fn default_description(now: DateTime<Local>) -> String {
    format!("Deploy from CLI on {}", now.format("%Y-%m-%d %H:%M:%S"))
}
