//! reqwest implementation of [`armflow_cloud::Transport`]

use crate::error::{AzureError, Result};
use armflow_cloud::{Method, Transport, TransportResponse};
use async_trait::async_trait;

pub const RESOURCE_MANAGER_URL: &str = "https://management.azure.com";

const ACCESS_TOKEN_VAR: &str = "AZURE_ACCESS_TOKEN";
const SUBSCRIPTION_ID_VAR: &str = "AZURE_SUBSCRIPTION_ID";
const RESOURCE_MANAGER_URL_VAR: &str = "AZURE_RESOURCE_MANAGER_URL";

/// Connection settings for the Resource Manager API
#[derive(Debug, Clone)]
pub struct AzureConfig {
    pub access_token: String,
    pub subscription_id: String,
    pub base_url: String,
}

impl AzureConfig {
    /// Read the token and subscription from the environment
    pub fn from_env() -> Result<Self> {
        Self::from_env_or(None)
    }

    /// Like [`from_env`](Self::from_env), falling back to a configured
    /// subscription when `AZURE_SUBSCRIPTION_ID` is unset
    pub fn from_env_or(subscription_id: Option<&str>) -> Result<Self> {
        let access_token = std::env::var(ACCESS_TOKEN_VAR)
            .map_err(|_| AzureError::MissingEnvVar(ACCESS_TOKEN_VAR.to_string()))?;
        let subscription_id = std::env::var(SUBSCRIPTION_ID_VAR)
            .ok()
            .or_else(|| subscription_id.map(str::to_string))
            .ok_or_else(|| AzureError::MissingEnvVar(SUBSCRIPTION_ID_VAR.to_string()))?;
        let base_url = std::env::var(RESOURCE_MANAGER_URL_VAR)
            .unwrap_or_else(|_| RESOURCE_MANAGER_URL.to_string());

        Ok(Self {
            access_token,
            subscription_id,
            base_url,
        })
    }
}

/// Authenticated HTTP channel scoped to one subscription
pub struct AzureTransport {
    client: reqwest::Client,
    config: AzureConfig,
}

impl AzureTransport {
    pub fn new(config: AzureConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Absolute URL for a subscription-relative path
    pub fn url(&self, path: &str) -> String {
        format!(
            "{}/subscriptions/{}/{}",
            self.config.base_url.trim_end_matches('/'),
            self.config.subscription_id,
            path.trim_start_matches('/')
        )
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<TransportResponse> {
        let url = self.url(path);
        let method = match method {
            Method::Get => reqwest::Method::GET,
            Method::Put => reqwest::Method::PUT,
        };

        tracing::debug!(method = %method, url = %url, "Resource Manager request");

        let mut request = self
            .client
            .request(method, &url)
            .bearer_auth(&self.config.access_token);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(AzureError::AuthenticationFailed(text));
        }

        Ok(TransportResponse::new(status.as_u16(), parse_body(&text)))
    }
}

/// Empty or non-JSON bodies become `None`
fn parse_body(text: &str) -> Option<serde_json::Value> {
    if text.trim().is_empty() {
        return None;
    }
    match serde_json::from_str(text) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::debug!(error = %e, "Response body is not JSON, ignoring");
            None
        }
    }
}

#[async_trait]
impl Transport for AzureTransport {
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> armflow_cloud::Result<TransportResponse> {
        Ok(self.send(method, path, body).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn config(base_url: &str) -> AzureConfig {
        AzureConfig {
            access_token: "token".to_string(),
            subscription_id: "sub-123".to_string(),
            base_url: base_url.to_string(),
        }
    }

    #[test]
    fn test_url() {
        let transport = AzureTransport::new(config(RESOURCE_MANAGER_URL));
        assert_eq!(
            transport.url("resourcegroups/rg1/providers/Microsoft.Resources/deployments/web-01a?api-version=2016-02-01"),
            "https://management.azure.com/subscriptions/sub-123/resourcegroups/rg1/providers/Microsoft.Resources/deployments/web-01a?api-version=2016-02-01"
        );
    }

    #[test]
    fn test_url_trims_slashes() {
        let transport = AzureTransport::new(config("http://localhost:8080/"));
        assert_eq!(
            transport.url("/resourcegroups/rg1"),
            "http://localhost:8080/subscriptions/sub-123/resourcegroups/rg1"
        );
    }

    #[test]
    fn test_parse_body() {
        assert_eq!(parse_body(""), None);
        assert_eq!(parse_body("  \n"), None);
        assert_eq!(parse_body("<html>oops</html>"), None);
        assert_eq!(
            parse_body(r#"{"properties":{"provisioningState":"Running"}}"#)
                .unwrap()["properties"]["provisioningState"],
            "Running"
        );
    }

    #[test]
    #[serial]
    fn test_config_from_env() {
        temp_env::with_vars(
            [
                (ACCESS_TOKEN_VAR, Some("abc")),
                (SUBSCRIPTION_ID_VAR, Some("sub-env")),
                (RESOURCE_MANAGER_URL_VAR, None),
            ],
            || {
                let config = AzureConfig::from_env_or(Some("sub-file")).unwrap();
                assert_eq!(config.access_token, "abc");
                assert_eq!(config.subscription_id, "sub-env");
                assert_eq!(config.base_url, RESOURCE_MANAGER_URL);
            },
        );
    }

    #[test]
    #[serial]
    fn test_config_subscription_fallback() {
        temp_env::with_vars(
            [
                (ACCESS_TOKEN_VAR, Some("abc")),
                (SUBSCRIPTION_ID_VAR, None),
                (RESOURCE_MANAGER_URL_VAR, Some("http://localhost:9000")),
            ],
            || {
                let config = AzureConfig::from_env_or(Some("sub-file")).unwrap();
                assert_eq!(config.subscription_id, "sub-file");
                assert_eq!(config.base_url, "http://localhost:9000");

                let err = AzureConfig::from_env().unwrap_err();
                assert!(matches!(err, AzureError::MissingEnvVar(v) if v == SUBSCRIPTION_ID_VAR));
            },
        );
    }

    #[test]
    #[serial]
    fn test_config_requires_token() {
        temp_env::with_vars(
            [
                (ACCESS_TOKEN_VAR, None::<&str>),
                (SUBSCRIPTION_ID_VAR, Some("sub")),
            ],
            || {
                let err = AzureConfig::from_env().unwrap_err();
                assert!(matches!(err, AzureError::MissingEnvVar(v) if v == ACCESS_TOKEN_VAR));
            },
        );
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() {
        let transport = AzureTransport::new(config("http://127.0.0.1:1"));
        let err = transport
            .request(Method::Get, "resourcegroups/rg1", None)
            .await
            .unwrap_err();
        assert!(matches!(err, armflow_cloud::ProvisionError::Transport(_)));
    }
}
