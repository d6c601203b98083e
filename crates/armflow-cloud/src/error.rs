//! Provisioning error types

use crate::deployment::ProvisioningState;
use std::time::Duration;
use thiserror::Error;

/// Defects in a deployment template, detected before anything is submitted
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("Resource '{resource}' references undefined variable '{variable}'")]
    UnresolvedVariable { resource: String, variable: String },

    #[error("Variable '{variable}' references undefined variable '{missing}'")]
    UnresolvedNestedVariable { variable: String, missing: String },

    #[error("Resource '{resource}' depends on '{dependency}', which is not declared in the template")]
    UnresolvedDependency { resource: String, dependency: String },

    #[error("Resource '{resource}' reads the state of '{variable}', which names no resource in the template")]
    UnresolvedReference { resource: String, variable: String },

    #[error("Resource '{resource}' references {target} without a dependsOn edge")]
    MissingDependsOn { resource: String, target: String },

    #[error("Resource '{resource}' has type '{declared}' but carries {actual} properties")]
    PropertiesMismatch {
        resource: String,
        declared: String,
        actual: String,
    },

    #[error("Resource declared twice: {0}")]
    DuplicateResource(String),
}

/// Errors raised while submitting, polling or reconciling a deployment
#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error("Invalid template: {0}")]
    Template(#[from] TemplateError),

    #[error("Deployment '{deployment}' was rejected: {message}")]
    Submission { deployment: String, message: String },

    #[error("Status query for deployment '{deployment}' failed: {message}")]
    Poll { deployment: String, message: String },

    #[error(
        "Timed out after {}s waiting for deployment '{deployment}' (last state: {})",
        .elapsed.as_secs(),
        state_label(.last_state)
    )]
    PollingTimeout {
        deployment: String,
        elapsed: Duration,
        last_state: Option<ProvisioningState>,
    },

    #[error("Deployment '{deployment}' finished in state {state}")]
    ProviderFailed {
        deployment: String,
        state: ProvisioningState,
    },

    #[error("Polling for deployment '{0}' was cancelled")]
    Cancelled(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ProvisionError {
    /// Whether the failure is a client-side deadline rather than a provider verdict
    pub fn is_timeout(&self) -> bool {
        matches!(self, ProvisionError::PollingTimeout { .. })
    }
}

fn state_label(state: &Option<ProvisioningState>) -> String {
    match state {
        Some(state) => state.to_string(),
        None => "none".to_string(),
    }
}

pub type Result<T> = std::result::Result<T, ProvisionError>;
