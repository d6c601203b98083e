//! Azure transport error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AzureError {
    #[error("Environment variable not set: {0}")]
    MissingEnvVar(String),

    #[error("Azure authentication failed (HTTP 401): {0}")]
    AuthenticationFailed(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<AzureError> for armflow_cloud::ProvisionError {
    fn from(err: AzureError) -> Self {
        armflow_cloud::ProvisionError::Transport(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AzureError>;
