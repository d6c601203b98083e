//! Transport boundary and the deployment API built on top of it
//!
//! The core never talks HTTP itself. A [`Transport`] takes a method, a
//! path relative to the subscription, and an optional JSON body; bearer
//! tokens and retries on expired credentials are its business.

use crate::builder::RESOURCE_API_VERSION;
use crate::deployment::{Deployment, ProvisioningState, PublicIpAddress, VirtualMachineInstance};
use crate::error::{ProvisionError, Result};
use crate::template::DeploymentBody;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

pub const DEPLOYMENTS_API_VERSION: &str = "2016-02-01";

/// HTTP method understood by the transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Put,
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Method::Get => write!(f, "GET"),
            Method::Put => write!(f, "PUT"),
        }
    }
}

/// Raw provider response
#[derive(Debug, Clone, PartialEq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Option<serde_json::Value>,
}

impl TransportResponse {
    pub fn new(status: u16, body: Option<serde_json::Value>) -> Self {
        Self { status, body }
    }

    /// 2xx and 3xx count as accepted
    pub fn is_success(&self) -> bool {
        (200..400).contains(&self.status)
    }

    /// Provider error message from an `{"error": {"message": ...}}` body
    pub fn error_message(&self) -> String {
        self.body
            .as_ref()
            .and_then(|b| b.get("error"))
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
            .map(|m| format!("HTTP {}: {}", self.status, m))
            .unwrap_or_else(|| format!("HTTP {}", self.status))
    }

    fn parse<T: serde::de::DeserializeOwned>(self) -> Result<T> {
        let body = self.body.unwrap_or(serde_json::Value::Null);
        Ok(serde_json::from_value(body)?)
    }
}

/// Request/response channel to the provider
#[async_trait]
pub trait Transport: Send + Sync {
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<TransportResponse>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<TransportResponse> {
        (**self).request(method, path, body).await
    }
}

/// Read side of deployments, all the poller needs
#[async_trait]
pub trait DeploymentApi: Send + Sync {
    async fn get_deployment(&self, name: &str) -> Result<Deployment>;
}

/// Proof that the provider accepted a deployment request
#[derive(Debug, Clone, PartialEq)]
pub struct DeploymentHandle {
    pub name: String,

    /// State echoed by the create call, if the provider sent one
    pub initial_state: Option<ProvisioningState>,

    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    value: Vec<T>,
}

/// Resource-group scoped client for deployments and the resources they create
pub struct ArmClient<T> {
    transport: T,
    resource_group: String,
    api_version: String,
}

impl<T: Transport> ArmClient<T> {
    pub fn new(transport: T, resource_group: impl Into<String>) -> Self {
        Self {
            transport,
            resource_group: resource_group.into(),
            api_version: DEPLOYMENTS_API_VERSION.to_string(),
        }
    }

    pub fn with_api_version(mut self, api_version: impl Into<String>) -> Self {
        self.api_version = api_version.into();
        self
    }

    fn deployment_path(&self, name: &str) -> String {
        format!(
            "resourcegroups/{}/providers/Microsoft.Resources/deployments/{}?api-version={}",
            self.resource_group, name, self.api_version
        )
    }

    fn instance_view_path(&self, vm_name: &str) -> String {
        format!(
            "resourcegroups/{}/providers/Microsoft.Compute/virtualMachines/{}/instanceView?api-version={}",
            self.resource_group, vm_name, RESOURCE_API_VERSION
        )
    }

    fn public_ip_addresses_path(&self) -> String {
        format!(
            "resourcegroups/{}/providers/Microsoft.Network/publicIPAddresses?api-version={}",
            self.resource_group, RESOURCE_API_VERSION
        )
    }

    /// Submit a deployment. Acceptance does not mean it has started running.
    pub async fn submit(&self, name: &str, body: &DeploymentBody) -> Result<DeploymentHandle> {
        let submission_error = |message: String| ProvisionError::Submission {
            deployment: name.to_string(),
            message,
        };

        let payload = body.to_json()?;
        let response = self
            .transport
            .request(Method::Put, &self.deployment_path(name), Some(&payload))
            .await
            .map_err(|e| submission_error(e.to_string()))?;

        if !response.is_success() {
            return Err(submission_error(response.error_message()));
        }

        let initial_state = response
            .body
            .and_then(|b| serde_json::from_value::<Deployment>(b).ok())
            .map(|d| d.state());

        tracing::info!(
            deployment = %name,
            resource_group = %self.resource_group,
            initial_state = ?initial_state,
            "Deployment submitted"
        );

        Ok(DeploymentHandle {
            name: name.to_string(),
            initial_state,
            submitted_at: Utc::now(),
        })
    }

    async fn get(&self, path: &str) -> Result<TransportResponse> {
        let response = self.transport.request(Method::Get, path, None).await?;
        if !response.is_success() {
            return Err(ProvisionError::Transport(format!(
                "GET {} failed: {}",
                path,
                response.error_message()
            )));
        }
        Ok(response)
    }

    pub async fn instance_view(&self, vm_name: &str) -> Result<VirtualMachineInstance> {
        self.get(&self.instance_view_path(vm_name)).await?.parse()
    }

    /// Public IPs in the resource group. Entries may be null.
    pub async fn public_ip_addresses(&self) -> Result<Vec<Option<PublicIpAddress>>> {
        let list: ListResponse<Option<PublicIpAddress>> =
            self.get(&self.public_ip_addresses_path()).await?.parse()?;
        Ok(list.value)
    }
}

#[async_trait]
impl<T: Transport> DeploymentApi for ArmClient<T> {
    async fn get_deployment(&self, name: &str) -> Result<Deployment> {
        self.get(&self.deployment_path(name)).await?.parse()
    }
}
