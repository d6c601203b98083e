//! Submit → poll → reconcile for one node

use crate::builder::{DeploymentTemplateBuilder, NodeSpec, ResourceNames};
use crate::credentials::CredentialStore;
use crate::deployment::{Deployment, NodeMetadata, VmDeployment};
use crate::error::{ProvisionError, Result};
use crate::poller::{PollConfig, PollOutcome, ProvisioningPoller};
use crate::provider::{ArmClient, DeploymentApi, DeploymentHandle, Transport};
use crate::reconcile::StatusReconciler;
use tokio_util::sync::CancellationToken;

/// Drives node deployments against one resource group
pub struct Provisioner<T> {
    client: ArmClient<T>,
    builder: DeploymentTemplateBuilder,
    poll: PollConfig,
    reconciler: StatusReconciler,
    credentials: CredentialStore,
}

impl<T: Transport> Provisioner<T> {
    pub fn new(
        client: ArmClient<T>,
        reconciler: StatusReconciler,
        credentials: CredentialStore,
    ) -> Self {
        Self {
            client,
            builder: DeploymentTemplateBuilder::new(),
            poll: PollConfig::default(),
            reconciler,
            credentials,
        }
    }

    pub fn with_builder(mut self, builder: DeploymentTemplateBuilder) -> Self {
        self.builder = builder;
        self
    }

    pub fn with_poll_config(mut self, poll: PollConfig) -> Self {
        self.poll = poll;
        self
    }

    /// Build, validate and submit the node's deployment without waiting
    ///
    /// Template defects are reported before anything goes over the wire.
    pub async fn deploy(&self, spec: &NodeSpec) -> Result<DeploymentHandle> {
        let body = self.builder.build_body(spec)?;
        self.client.submit(&spec.name, &body).await
    }

    /// Wait for a submitted deployment to settle
    pub async fn wait(&self, name: &str, cancel: &CancellationToken) -> Result<PollOutcome> {
        ProvisioningPoller::new(&self.client, self.poll)
            .wait_for_terminal(name, cancel)
            .await
    }

    /// Deploy a node and return its reconciled view once it is up
    ///
    /// A deployment that ends FAILED, CANCELED or DELETED is an error; the
    /// remote deployment is left untouched in every failure case.
    pub async fn provision(
        &self,
        spec: &NodeSpec,
        cancel: &CancellationToken,
    ) -> Result<NodeMetadata> {
        let handle = self.deploy(spec).await?;
        let outcome = self.wait(&handle.name, cancel).await?;
        tracing::info!(
            deployment = %handle.name,
            state = %outcome.state,
            polls = outcome.polls,
            elapsed_secs = outcome.elapsed.as_secs(),
            "Deployment settled"
        );
        let deployment = outcome.into_succeeded()?;
        Ok(self.reconcile(deployment).await)
    }

    /// One-shot status of an existing deployment
    pub async fn status(&self, name: &str) -> Result<NodeMetadata> {
        let deployment =
            self.client
                .get_deployment(name)
                .await
                .map_err(|e| ProvisionError::Poll {
                    deployment: name.to_string(),
                    message: e.to_string(),
                })?;
        Ok(self.reconcile(deployment).await)
    }

    /// Gather side data for `deployment` and map it to a node
    pub async fn reconcile(&self, deployment: Deployment) -> NodeMetadata {
        let from = self.gather(deployment).await;
        self.reconciler.reconcile(&from, &self.credentials)
    }

    /// VM instance view and public IPs, only once the deployment succeeded
    ///
    /// Side-data failures are logged and treated as absent.
    async fn gather(&self, deployment: Deployment) -> VmDeployment {
        if !deployment.state().is_success() {
            return VmDeployment::new(deployment);
        }

        let names = ResourceNames::for_node(&deployment.name);
        let mut from = VmDeployment::new(deployment);

        match self.client.instance_view(&names.virtual_machine).await {
            Ok(vm) => from = from.with_vm(vm),
            Err(e) => tracing::warn!(
                deployment = %from.deployment.name,
                vm = %names.virtual_machine,
                error = %e,
                "Could not fetch VM instance view"
            ),
        }

        match self.client.public_ip_addresses().await {
            Ok(ips) => {
                let ips = ips
                    .into_iter()
                    .filter(|ip| {
                        ip.as_ref()
                            .is_some_and(|ip| ip.name.as_deref() == Some(names.public_ip_address.as_str()))
                    })
                    .collect();
                from = from.with_ip_addresses(ips);
            }
            Err(e) => tracing::warn!(
                deployment = %from.deployment.name,
                error = %e,
                "Could not list public IP addresses"
            ),
        }

        from
    }
}
