//! Map a polled deployment plus side data onto the canonical node view

use crate::builder::group_of;
use crate::credentials::CredentialLookup;
use crate::deployment::{
    LoginCredentials, NodeMetadata, NodeStatus, ProvisioningState, PublicIpAddress,
    VirtualMachineInstance, VmDeployment,
};

/// Code prefix of the instance-view entry carrying the power state
pub const POWER_STATE_PREFIX: &str = "PowerState";

const VM_STOPPED: &str = "VM stopped";

/// Base node status for a deployment state
pub fn node_status_for(state: ProvisioningState) -> NodeStatus {
    match state {
        ProvisioningState::Accepted | ProvisioningState::Ready | ProvisioningState::Running => {
            NodeStatus::Pending
        }
        ProvisioningState::Canceled | ProvisioningState::Deleted => NodeStatus::Terminated,
        ProvisioningState::Failed => NodeStatus::Error,
        ProvisioningState::Succeeded => NodeStatus::Running,
        ProvisioningState::Unrecognized => NodeStatus::Unrecognized,
    }
}

/// Adjust a RUNNING status using the VM's power state
///
/// Only the first `PowerState*` entry is considered. Codes shorter than the
/// prefix simply don't match.
pub fn refine_with_power_state(
    status: NodeStatus,
    vm: Option<&VirtualMachineInstance>,
) -> NodeStatus {
    if status != NodeStatus::Running {
        return status;
    }

    let power_state = vm
        .and_then(|vm| vm.statuses.as_deref())
        .and_then(|statuses| {
            statuses
                .iter()
                .find(|s| s.code.starts_with(POWER_STATE_PREFIX))
        });

    match power_state.map(|s| s.display_status.as_str()) {
        Some(VM_STOPPED) => NodeStatus::Suspended,
        // "VM running", unknown displays and missing data all keep RUNNING
        _ => NodeStatus::Running,
    }
}

/// First non-null address in list order
pub fn first_public_address(ip_addresses: &[Option<PublicIpAddress>]) -> Option<String> {
    ip_addresses
        .iter()
        .flatten()
        .find_map(|ip| ip.ip_address())
        .map(str::to_string)
}

/// Pure mapping from [`VmDeployment`] to [`NodeMetadata`]
#[derive(Debug, Clone)]
pub struct StatusReconciler {
    default_login: LoginCredentials,
}

impl StatusReconciler {
    pub fn new(default_login: LoginCredentials) -> Self {
        Self { default_login }
    }

    pub fn reconcile<C>(&self, from: &VmDeployment, credentials: &C) -> NodeMetadata
    where
        C: CredentialLookup + ?Sized,
    {
        let name = from.deployment.name.clone();
        let base = node_status_for(from.deployment.state());
        let status = refine_with_power_state(base, from.vm.as_ref());

        let credentials = credentials
            .credentials(&from.credential_key())
            .unwrap_or_else(|| self.default_login.clone());

        NodeMetadata {
            id: name.clone(),
            provider_id: name.clone(),
            group: group_of(&name),
            status,
            public_addresses: first_public_address(&from.ip_addresses)
                .into_iter()
                .collect(),
            credentials,
            name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::CredentialStore;
    use crate::deployment::{Deployment, VirtualMachineStatus};
    use std::collections::HashMap;

    fn reconciler() -> StatusReconciler {
        StatusReconciler::new(LoginCredentials::new("jclouds", Some("Password1!".to_string())))
    }

    fn vm(statuses: &[(&str, &str)]) -> VirtualMachineInstance {
        VirtualMachineInstance {
            statuses: Some(
                statuses
                    .iter()
                    .map(|(code, display)| VirtualMachineStatus::new(*code, *display))
                    .collect(),
            ),
        }
    }

    fn deployment(state: &str) -> VmDeployment {
        VmDeployment::new(Deployment::new("web-01a", state))
    }

    #[test]
    fn test_base_mapping() {
        use NodeStatus as N;
        use ProvisioningState as P;
        let cases = [
            (P::Accepted, N::Pending),
            (P::Ready, N::Pending),
            (P::Running, N::Pending),
            (P::Canceled, N::Terminated),
            (P::Deleted, N::Terminated),
            (P::Failed, N::Error),
            (P::Succeeded, N::Running),
            (P::Unrecognized, N::Unrecognized),
        ];
        for (state, expected) in cases {
            assert_eq!(node_status_for(state), expected, "{}", state);
        }
    }

    #[test]
    fn test_succeeded_without_vm_data_is_running() {
        let node = reconciler().reconcile(&deployment("Succeeded"), &CredentialStore::new());
        assert_eq!(node.status, NodeStatus::Running);
    }

    #[test]
    fn test_stopped_vm_is_suspended() {
        let from = deployment("Succeeded").with_vm(vm(&[
            ("ProvisioningState/succeeded", "Provisioning succeeded"),
            ("PowerState/stopped", "VM stopped"),
        ]));
        let node = reconciler().reconcile(&from, &CredentialStore::new());
        assert_eq!(node.status, NodeStatus::Suspended);
    }

    #[test]
    fn test_running_vm_stays_running() {
        let from = deployment("Succeeded").with_vm(vm(&[("PowerState/running", "VM running")]));
        let node = reconciler().reconcile(&from, &CredentialStore::new());
        assert_eq!(node.status, NodeStatus::Running);
    }

    #[test]
    fn test_failed_ignores_vm_data() {
        let from = deployment("Failed").with_vm(vm(&[("PowerState/stopped", "VM stopped")]));
        let node = reconciler().reconcile(&from, &CredentialStore::new());
        assert_eq!(node.status, NodeStatus::Error);
    }

    #[test]
    fn test_refinement_only_applies_to_running() {
        let stopped = vm(&[("PowerState/stopped", "VM stopped")]);
        for status in [
            NodeStatus::Pending,
            NodeStatus::Error,
            NodeStatus::Terminated,
            NodeStatus::Unrecognized,
            NodeStatus::Suspended,
        ] {
            assert_eq!(refine_with_power_state(status, Some(&stopped)), status);
        }
    }

    #[test]
    fn test_only_first_power_state_entry_counts() {
        let instance = vm(&[
            ("PowerState/running", "VM running"),
            ("PowerState/stopped", "VM stopped"),
        ]);
        assert_eq!(
            refine_with_power_state(NodeStatus::Running, Some(&instance)),
            NodeStatus::Running
        );
    }

    #[test]
    fn test_short_and_unknown_codes() {
        let instance = vm(&[("Pow", "VM stopped"), ("", "VM stopped")]);
        assert_eq!(
            refine_with_power_state(NodeStatus::Running, Some(&instance)),
            NodeStatus::Running
        );

        let deallocating = vm(&[("PowerState/deallocating", "VM deallocating")]);
        assert_eq!(
            refine_with_power_state(NodeStatus::Running, Some(&deallocating)),
            NodeStatus::Running
        );

        let empty = VirtualMachineInstance { statuses: None };
        assert_eq!(
            refine_with_power_state(NodeStatus::Running, Some(&empty)),
            NodeStatus::Running
        );
    }

    #[test]
    fn test_first_non_null_public_address() {
        let from = deployment("Succeeded").with_ip_addresses(vec![
            None,
            Some(PublicIpAddress::with_address(None)),
            Some(PublicIpAddress::with_address(Some("10.1.2.3"))),
            Some(PublicIpAddress::with_address(Some("10.1.2.4"))),
        ]);
        let node = reconciler().reconcile(&from, &CredentialStore::new());
        assert_eq!(node.public_addresses, vec!["10.1.2.3".to_string()]);
    }

    #[test]
    fn test_no_public_address() {
        let from = deployment("Succeeded").with_ip_addresses(vec![None, Some(PublicIpAddress::default())]);
        let node = reconciler().reconcile(&from, &CredentialStore::new());
        assert!(node.public_addresses.is_empty());
    }

    #[test]
    fn test_stored_credentials_win() {
        let store = CredentialStore::new();
        let stored = LoginCredentials::new("azureuser", Some("s3cret".to_string()));
        store.insert("node#web-01a", stored.clone());

        let node = reconciler().reconcile(&deployment("Succeeded"), &store);
        assert_eq!(node.credentials, stored);
    }

    #[test]
    fn test_default_credentials_fallback() {
        let mut other = HashMap::new();
        other.insert(
            "node#someone-else".to_string(),
            LoginCredentials::new("x", None),
        );

        let node = reconciler().reconcile(&deployment("Succeeded"), &other);
        assert_eq!(node.credentials.user, "jclouds");
    }

    #[test]
    fn test_identity_fields() {
        let node = reconciler().reconcile(&deployment("Running"), &CredentialStore::new());
        assert_eq!(node.id, "web-01a");
        assert_eq!(node.provider_id, "web-01a");
        assert_eq!(node.name, "web-01a");
        assert_eq!(node.group.as_deref(), Some("web"));
        assert_eq!(node.status, NodeStatus::Pending);
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let from = deployment("Succeeded")
            .with_vm(vm(&[("PowerState/stopped", "VM stopped")]))
            .with_ip_addresses(vec![Some(PublicIpAddress::with_address(Some("10.0.0.9")))]);
        let store = CredentialStore::new();
        let r = reconciler();
        assert_eq!(r.reconcile(&from, &store), r.reconcile(&from, &store));
    }
}
