//! Provider-side deployment snapshots and the canonical node view
//!
//! A deployment moves through `Accepted -> (Ready | Running) -> terminal`.
//! The resources it created are only meaningful once it has `Succeeded`;
//! before that, the VM instance view and public IPs are ignored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Provisioning state reported by the provider for a deployment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ProvisioningState {
    Accepted,
    Ready,
    Running,
    Succeeded,
    Failed,
    Canceled,
    Deleted,
    /// Anything outside the known set. Never terminal.
    Unrecognized,
}

impl ProvisioningState {
    /// Parse a provider state string. Unknown input maps to `Unrecognized`.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "accepted" => Self::Accepted,
            "ready" => Self::Ready,
            "running" => Self::Running,
            "succeeded" => Self::Succeeded,
            "failed" => Self::Failed,
            "canceled" | "cancelled" => Self::Canceled,
            "deleted" => Self::Deleted,
            _ => Self::Unrecognized,
        }
    }

    /// The provider's spelling of this state
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accepted => "Accepted",
            Self::Ready => "Ready",
            Self::Running => "Running",
            Self::Succeeded => "Succeeded",
            Self::Failed => "Failed",
            Self::Canceled => "Canceled",
            Self::Deleted => "Deleted",
            Self::Unrecognized => "Unrecognized",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Succeeded | Self::Failed | Self::Canceled | Self::Deleted
        )
    }

    pub fn is_success(&self) -> bool {
        *self == Self::Succeeded
    }

    /// Terminal, but not `Succeeded`
    pub fn is_failure(&self) -> bool {
        self.is_terminal() && !self.is_success()
    }
}

impl From<String> for ProvisioningState {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<ProvisioningState> for String {
    fn from(state: ProvisioningState) -> Self {
        state.as_str().to_string()
    }
}

impl std::fmt::Display for ProvisioningState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Latest polled snapshot of a deployment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deployment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub name: String,

    pub properties: DeploymentStatus,
}

impl Deployment {
    pub fn new(name: impl Into<String>, provisioning_state: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            properties: DeploymentStatus {
                provisioning_state: provisioning_state.into(),
                correlation_id: None,
                timestamp: None,
            },
        }
    }

    pub fn state(&self) -> ProvisioningState {
        ProvisioningState::parse(&self.properties.provisioning_state)
    }
}

/// Status portion of a deployment response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentStatus {
    /// Raw provider string, kept verbatim so unknown states can be logged
    pub provisioning_state: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// Instance view of a virtual machine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VirtualMachineInstance {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub statuses: Option<Vec<VirtualMachineStatus>>,
}

/// One status entry of a VM instance view (provisioning or power state)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMachineStatus {
    pub code: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    #[serde(default)]
    pub display_status: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<DateTime<Utc>>,
}

impl VirtualMachineStatus {
    pub fn new(code: impl Into<String>, display_status: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            level: None,
            display_status: display_status.into(),
            time: None,
        }
    }
}

/// Public IP address resource as returned by the provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PublicIpAddress {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<PublicIpAddressStatus>,
}

impl PublicIpAddress {
    pub fn with_address(address: Option<&str>) -> Self {
        Self {
            name: None,
            properties: Some(PublicIpAddressStatus {
                ip_address: address.map(str::to_string),
                public_ip_allocation_method: None,
                provisioning_state: None,
            }),
        }
    }

    pub fn ip_address(&self) -> Option<&str> {
        self.properties.as_ref()?.ip_address.as_deref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PublicIpAddressStatus {
    #[serde(rename = "ipAddress", default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,

    #[serde(
        rename = "publicIPAllocationMethod",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub public_ip_allocation_method: Option<String>,

    #[serde(
        rename = "provisioningState",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub provisioning_state: Option<String>,
}

/// Everything known about one node's deployment, gathered for one reconciliation
#[derive(Debug, Clone, PartialEq)]
pub struct VmDeployment {
    pub deployment: Deployment,

    pub vm: Option<VirtualMachineInstance>,

    /// Entries may be null on the wire, hence `Option`
    pub ip_addresses: Vec<Option<PublicIpAddress>>,
}

impl VmDeployment {
    pub fn new(deployment: Deployment) -> Self {
        Self {
            deployment,
            vm: None,
            ip_addresses: Vec::new(),
        }
    }

    pub fn with_vm(mut self, vm: VirtualMachineInstance) -> Self {
        self.vm = Some(vm);
        self
    }

    pub fn with_ip_addresses(mut self, ip_addresses: Vec<Option<PublicIpAddress>>) -> Self {
        self.ip_addresses = ip_addresses;
        self
    }

    /// Key under which login credentials for this node are stored
    pub fn credential_key(&self) -> String {
        credential_key(&self.deployment.name)
    }
}

/// `node#<deployment>` key used by the credential store
pub fn credential_key(deployment_name: &str) -> String {
    format!("node#{}", deployment_name)
}

/// Canonical lifecycle status of a compute node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeStatus {
    Pending,
    Running,
    Suspended,
    Error,
    Terminated,
    Unrecognized,
}

impl std::fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeStatus::Pending => write!(f, "pending"),
            NodeStatus::Running => write!(f, "running"),
            NodeStatus::Suspended => write!(f, "suspended"),
            NodeStatus::Error => write!(f, "error"),
            NodeStatus::Terminated => write!(f, "terminated"),
            NodeStatus::Unrecognized => write!(f, "unrecognized"),
        }
    }
}

/// Login identity for a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginCredentials {
    pub user: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl LoginCredentials {
    pub fn new(user: impl Into<String>, password: Option<String>) -> Self {
        Self {
            user: user.into(),
            password,
        }
    }
}

/// Reconciled view of a node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeMetadata {
    pub id: String,
    pub provider_id: String,
    pub name: String,
    pub group: Option<String>,
    pub status: NodeStatus,
    pub public_addresses: Vec<String>,
    pub credentials: LoginCredentials,
}
