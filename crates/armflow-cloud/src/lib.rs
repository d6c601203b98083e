//! ArmFlow Cloud
//!
//! Provisions compute nodes through Azure Resource Manager deployments.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                   armflow CLI                    │
//! │        (template / validate / deploy / status)   │
//! └─────────────────┬────────────────────────────────┘
//!                   │
//! ┌─────────────────▼────────────────────────────────┐
//! │                 armflow-cloud                    │
//! │  ┌──────────────┐  ┌──────────────┐              │
//! │  │ Graph Builder│─>│  Assembler   │── body ──┐   │
//! │  └──────────────┘  └──────────────┘          │   │
//! │  ┌──────────────┐  ┌──────────────┐  ┌───────▼─┐ │
//! │  │  Reconciler  │<─│    Poller    │<─│Submitter│ │
//! │  └──────────────┘  └──────────────┘  └─────────┘ │
//! │            trait Transport { request(..) }       │
//! └─────────────────┬────────────────────────────────┘
//!                   │
//! ┌─────────────────▼────────────────────────────────┐
//! │              armflow-cloud-azure                 │
//! │         (reqwest, bearer token, ARM REST)        │
//! └──────────────────────────────────────────────────┘
//! ```

pub mod builder;
pub mod credentials;
pub mod deployment;
pub mod error;
pub mod poller;
pub mod provider;
pub mod provisioner;
pub mod reconcile;
pub mod resources;
pub mod template;

#[cfg(test)]
mod testing;

// Re-exports
pub use builder::{DeploymentTemplateBuilder, ImageSpec, NodeSpec, ResourceNames, group_of};
pub use credentials::{CredentialLookup, CredentialStore};
pub use deployment::{
    Deployment, LoginCredentials, NodeMetadata, NodeStatus, ProvisioningState, PublicIpAddress,
    VirtualMachineInstance, VirtualMachineStatus, VmDeployment, credential_key,
};
pub use error::{ProvisionError, Result, TemplateError};
pub use poller::{PollConfig, PollOutcome, ProvisioningPoller};
pub use provider::{
    ArmClient, DeploymentApi, DeploymentHandle, Method, Transport, TransportResponse,
};
pub use provisioner::Provisioner;
pub use reconcile::{StatusReconciler, node_status_for};
pub use template::{DeploymentBody, DeploymentMode, DeploymentTemplate, ResourceDefinition};
