//! Resource graph for a single node
//!
//! ```text
//! storageAccount ─────────────────────────────┐
//! virtualNetwork ──┐                          │
//!                  ├─> networkInterface ──> virtualMachine
//! publicIPAddress ─┘
//! ```
//!
//! Edges are `dependsOn` entries; the provider schedules creation from them.
//! All names and cross references are `variables(...)` expressions backed by
//! the map returned from [`DeploymentTemplateBuilder::variables`].

use crate::error::TemplateError;
use crate::resources::{
    AddressSpace, BootDiagnostics, DataDisk, DiagnosticsProfile, DnsSettings, HardwareProfile,
    IdReference, ImageReference, IpConfiguration, IpConfigurationProperties, NetworkInterfaceProperties,
    NetworkProfile, OsDisk, OsProfile, PublicIpAddressProperties, ResourceProperties,
    StorageAccountProperties, StorageProfile, Subnet, SubnetProperties, Vhd,
    VirtualMachineProperties, VirtualNetworkProperties, NETWORK_INTERFACES, PUBLIC_IP_ADDRESSES,
    STORAGE_ACCOUNTS, VIRTUAL_NETWORKS,
};
use crate::template::{
    expr, DeploymentBody, DeploymentMode, DeploymentTemplate, ResourceDefinition,
};
use std::collections::BTreeMap;

pub const RESOURCE_API_VERSION: &str = "2015-06-15";
pub const RESOURCE_GROUP_LOCATION: &str = "[resourceGroup().location]";

const STORAGE_ACCOUNT_NAME_MAX: usize = 24;

// Variable names shared by the resources and the variables map
pub mod vars {
    pub const STORAGE_ACCOUNT_NAME: &str = "StorageAccountName";
    pub const VIRTUAL_NETWORK_NAME: &str = "VirtualNetworkName";
    pub const VIRTUAL_NETWORK_PREFIX: &str = "VirtualNetworkPrefix";
    pub const SUBNET_NAME: &str = "SubnetName";
    pub const SUBNET_PREFIX: &str = "SubnetPrefix";
    pub const PUBLIC_IP_ADDRESS_NAME: &str = "PublicIPAddressName";
    pub const DNS_LABEL_PREFIX: &str = "DnsLabelPrefix";
    pub const NETWORK_INTERFACE_NAME: &str = "NetworkInterfaceCardName";
    pub const VNET_ID: &str = "VnetID";
    pub const SUBNET_REF: &str = "SubnetRef";
    pub const VIRTUAL_MACHINE_NAME: &str = "VirtualMachineName";
    pub const VM_SIZE: &str = "VmSize";
    pub const COMPUTER_NAME: &str = "ComputerName";
    pub const IMAGE_PUBLISHER: &str = "ImagePublisher";
    pub const IMAGE_OFFER: &str = "ImageOffer";
    pub const OS_VERSION: &str = "OSVersion";
    pub const OS_DISK_NAME: &str = "OsDiskName";
    pub const DATA_DISK_NAME: &str = "DataDiskName";
    pub const DATA_DISK_SIZE: &str = "DataDiskSize";
    pub const VM_STORAGE_CONTAINER: &str = "VmStorageAccountContainerName";
    pub const ADMIN_USERNAME: &str = "AdminUsername";
    pub const ADMIN_PASSWORD: &str = "AdminPassword";
}

/// Image to boot the VM from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageSpec {
    pub publisher: String,
    pub offer: String,
    pub sku: String,
}

impl Default for ImageSpec {
    fn default() -> Self {
        Self {
            publisher: "Canonical".to_string(),
            offer: "UbuntuServer".to_string(),
            sku: "12.04.5-LTS".to_string(),
        }
    }
}

/// What the caller wants deployed for one node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSpec {
    /// Node name; also the deployment name
    pub name: String,
    pub vm_size: String,
    pub image: ImageSpec,
    pub admin_username: String,
    pub admin_password: String,
    pub address_prefix: String,
    pub subnet_prefix: String,
    pub data_disk_size_gb: u32,
}

impl NodeSpec {
    pub fn new(
        name: impl Into<String>,
        admin_username: impl Into<String>,
        admin_password: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            vm_size: "Standard_A0".to_string(),
            image: ImageSpec::default(),
            admin_username: admin_username.into(),
            admin_password: admin_password.into(),
            address_prefix: "10.0.0.0/16".to_string(),
            subnet_prefix: "10.0.0.0/24".to_string(),
            data_disk_size_gb: 100,
        }
    }

    pub fn with_vm_size(mut self, vm_size: impl Into<String>) -> Self {
        self.vm_size = vm_size.into();
        self
    }

    pub fn with_image(mut self, image: ImageSpec) -> Self {
        self.image = image;
        self
    }

    pub fn names(&self) -> ResourceNames {
        ResourceNames::for_node(&self.name)
    }
}

/// Concrete resource names derived from a node name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceNames {
    pub storage_account: String,
    pub virtual_network: String,
    pub subnet: String,
    pub public_ip_address: String,
    pub dns_label: String,
    pub network_interface: String,
    pub virtual_machine: String,
    pub computer: String,
    pub os_disk: String,
    pub data_disk: String,
}

impl ResourceNames {
    pub fn for_node(node: &str) -> Self {
        let alnum: String = node
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        let storage_prefix: String = alnum.chars().take(STORAGE_ACCOUNT_NAME_MAX - 2).collect();

        Self {
            storage_account: format!("{}sa", storage_prefix),
            virtual_network: format!("{}VirtualNetwork", node),
            subnet: format!("{}Subnet", node),
            public_ip_address: format!("{}PublicIP", node),
            dns_label: alnum.clone(),
            network_interface: format!("{}NIC", node),
            virtual_machine: format!("{}VirtualMachine", node),
            computer: format!("{}Computer", node),
            os_disk: format!("{}osdisk", alnum),
            data_disk: format!("{}datadisk", alnum),
        }
    }
}

/// Builds the fixed five-resource topology for one node
#[derive(Debug, Clone)]
pub struct DeploymentTemplateBuilder {
    location: String,
    api_version: String,
    vhd_container: String,
}

impl Default for DeploymentTemplateBuilder {
    fn default() -> Self {
        Self {
            location: RESOURCE_GROUP_LOCATION.to_string(),
            api_version: RESOURCE_API_VERSION.to_string(),
            vhd_container: "vhds".to_string(),
        }
    }
}

impl DeploymentTemplateBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin resources to an explicit location instead of the resource group's
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    fn resource(&self, name_var: &str, properties: ResourceProperties) -> ResourceDefinition {
        ResourceDefinition::new(
            expr::variable(name_var),
            self.location.clone(),
            self.api_version.clone(),
            properties,
        )
    }

    /// `http://<storage>.blob.core.windows.net/<container>/<disk>.vhd`
    fn vhd_uri(disk_var: &str) -> String {
        expr::concat(&[
            expr::literal("http://"),
            expr::var(vars::STORAGE_ACCOUNT_NAME),
            expr::literal(".blob.core.windows.net/"),
            expr::var(vars::VM_STORAGE_CONTAINER),
            expr::literal("/"),
            expr::var(disk_var),
            expr::literal(".vhd"),
        ])
    }

    pub fn storage_account(&self) -> ResourceDefinition {
        self.resource(
            vars::STORAGE_ACCOUNT_NAME,
            ResourceProperties::StorageAccount(StorageAccountProperties {
                account_type: "Standard_LRS".to_string(),
            }),
        )
    }

    pub fn virtual_network(&self) -> ResourceDefinition {
        self.resource(
            vars::VIRTUAL_NETWORK_NAME,
            ResourceProperties::VirtualNetwork(VirtualNetworkProperties {
                address_space: AddressSpace {
                    address_prefixes: vec![expr::variable(vars::VIRTUAL_NETWORK_PREFIX)],
                },
                subnets: vec![Subnet {
                    name: expr::variable(vars::SUBNET_NAME),
                    properties: SubnetProperties {
                        address_prefix: expr::variable(vars::SUBNET_PREFIX),
                    },
                }],
            }),
        )
    }

    pub fn public_ip_address(&self) -> ResourceDefinition {
        self.resource(
            vars::PUBLIC_IP_ADDRESS_NAME,
            ResourceProperties::PublicIpAddress(PublicIpAddressProperties {
                public_ip_allocation_method: "Dynamic".to_string(),
                dns_settings: DnsSettings {
                    domain_name_label: expr::variable(vars::DNS_LABEL_PREFIX),
                },
            }),
        )
    }

    pub fn network_interface(&self) -> ResourceDefinition {
        let ip_config = IpConfiguration {
            name: "IpConfig1".to_string(),
            properties: IpConfigurationProperties {
                private_ip_allocation_method: "Dynamic".to_string(),
                public_ip_address: IdReference::new(expr::resource_id(
                    PUBLIC_IP_ADDRESSES,
                    vars::PUBLIC_IP_ADDRESS_NAME,
                )),
                subnet: IdReference::new(expr::variable(vars::SUBNET_REF)),
            },
        };

        self.resource(
            vars::NETWORK_INTERFACE_NAME,
            ResourceProperties::NetworkInterface(NetworkInterfaceProperties {
                ip_configurations: vec![ip_config],
            }),
        )
        .with_depends_on(expr::depends_on(PUBLIC_IP_ADDRESSES, vars::PUBLIC_IP_ADDRESS_NAME))
        .with_depends_on(expr::depends_on(VIRTUAL_NETWORKS, vars::VIRTUAL_NETWORK_NAME))
    }

    pub fn virtual_machine(&self) -> ResourceDefinition {
        let storage_profile = StorageProfile {
            image_reference: ImageReference {
                publisher: expr::variable(vars::IMAGE_PUBLISHER),
                offer: expr::variable(vars::IMAGE_OFFER),
                sku: expr::variable(vars::OS_VERSION),
                version: "latest".to_string(),
            },
            os_disk: OsDisk {
                name: expr::variable(vars::OS_DISK_NAME),
                caching: "ReadWrite".to_string(),
                create_option: "FromImage".to_string(),
                vhd: Vhd {
                    uri: Self::vhd_uri(vars::OS_DISK_NAME),
                },
            },
            data_disks: vec![DataDisk {
                name: expr::variable(vars::DATA_DISK_NAME),
                disk_size_gb: expr::variable(vars::DATA_DISK_SIZE),
                lun: "0".to_string(),
                create_option: "Empty".to_string(),
                vhd: Vhd {
                    uri: Self::vhd_uri(vars::DATA_DISK_NAME),
                },
            }],
        };

        let properties = VirtualMachineProperties {
            hardware_profile: HardwareProfile {
                vm_size: expr::variable(vars::VM_SIZE),
            },
            os_profile: OsProfile {
                computer_name: expr::variable(vars::COMPUTER_NAME),
                admin_username: expr::variable(vars::ADMIN_USERNAME),
                admin_password: expr::variable(vars::ADMIN_PASSWORD),
            },
            storage_profile,
            network_profile: NetworkProfile {
                network_interfaces: vec![IdReference::new(expr::resource_id(
                    NETWORK_INTERFACES,
                    vars::NETWORK_INTERFACE_NAME,
                ))],
            },
            diagnostics_profile: DiagnosticsProfile {
                boot_diagnostics: BootDiagnostics {
                    enabled: "true".to_string(),
                    storage_uri: expr::concat(&[
                        expr::literal("http://"),
                        expr::var(vars::STORAGE_ACCOUNT_NAME),
                        expr::literal(".blob.core.windows.net"),
                    ]),
                },
            },
        };

        self.resource(
            vars::VIRTUAL_MACHINE_NAME,
            ResourceProperties::VirtualMachine(Box::new(properties)),
        )
        .with_depends_on(expr::depends_on(STORAGE_ACCOUNTS, vars::STORAGE_ACCOUNT_NAME))
        .with_depends_on(expr::depends_on(NETWORK_INTERFACES, vars::NETWORK_INTERFACE_NAME))
        .with_tag("displayName", "VirtualMachine")
    }

    /// All five resources in creation order
    pub fn resources(&self) -> Vec<ResourceDefinition> {
        vec![
            self.storage_account(),
            self.virtual_network(),
            self.public_ip_address(),
            self.network_interface(),
            self.virtual_machine(),
        ]
    }

    /// The `variables` map backing every expression the resources use
    pub fn variables(&self, spec: &NodeSpec) -> BTreeMap<String, String> {
        let names = spec.names();
        let entries = [
            (vars::STORAGE_ACCOUNT_NAME, names.storage_account),
            (vars::VIRTUAL_NETWORK_NAME, names.virtual_network),
            (vars::VIRTUAL_NETWORK_PREFIX, spec.address_prefix.clone()),
            (vars::SUBNET_NAME, names.subnet),
            (vars::SUBNET_PREFIX, spec.subnet_prefix.clone()),
            (vars::PUBLIC_IP_ADDRESS_NAME, names.public_ip_address),
            (vars::DNS_LABEL_PREFIX, names.dns_label),
            (vars::NETWORK_INTERFACE_NAME, names.network_interface),
            (
                vars::VNET_ID,
                expr::resource_id(VIRTUAL_NETWORKS, vars::VIRTUAL_NETWORK_NAME),
            ),
            (
                vars::SUBNET_REF,
                expr::concat(&[
                    expr::var(vars::VNET_ID),
                    expr::literal("/subnets/"),
                    expr::var(vars::SUBNET_NAME),
                ]),
            ),
            (vars::VIRTUAL_MACHINE_NAME, names.virtual_machine),
            (vars::VM_SIZE, spec.vm_size.clone()),
            (vars::COMPUTER_NAME, names.computer),
            (vars::IMAGE_PUBLISHER, spec.image.publisher.clone()),
            (vars::IMAGE_OFFER, spec.image.offer.clone()),
            (vars::OS_VERSION, spec.image.sku.clone()),
            (vars::OS_DISK_NAME, names.os_disk),
            (vars::DATA_DISK_NAME, names.data_disk),
            (vars::DATA_DISK_SIZE, spec.data_disk_size_gb.to_string()),
            (vars::VM_STORAGE_CONTAINER, self.vhd_container.clone()),
            (vars::ADMIN_USERNAME, spec.admin_username.clone()),
            (vars::ADMIN_PASSWORD, spec.admin_password.clone()),
        ];
        entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    /// Assemble and validate the template for `spec`
    pub fn build(&self, spec: &NodeSpec) -> Result<DeploymentTemplate, TemplateError> {
        DeploymentTemplate::assemble(self.resources(), self.variables(spec))
    }

    /// Submittable body for `spec`; node deployments are always incremental
    pub fn build_body(&self, spec: &NodeSpec) -> Result<DeploymentBody, TemplateError> {
        Ok(DeploymentBody::new(
            self.build(spec)?,
            DeploymentMode::Incremental,
        ))
    }
}

/// Group part of a node name: everything before the last `-`
pub fn group_of(node: &str) -> Option<String> {
    node.rsplit_once('-')
        .map(|(group, _)| group)
        .filter(|group| !group.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::VIRTUAL_MACHINES;

    fn spec() -> NodeSpec {
        NodeSpec::new("web-01a", "azureuser", "s3cret!Pass")
    }

    #[test]
    fn test_builds_five_resources_in_order() {
        let template = DeploymentTemplateBuilder::new().build(&spec()).unwrap();
        let types: Vec<&str> = template
            .resources
            .iter()
            .map(|r| r.resource_type.as_str())
            .collect();
        assert_eq!(
            types,
            vec![
                STORAGE_ACCOUNTS,
                VIRTUAL_NETWORKS,
                PUBLIC_IP_ADDRESSES,
                NETWORK_INTERFACES,
                VIRTUAL_MACHINES
            ]
        );
        for resource in &template.resources {
            assert_eq!(resource.location, RESOURCE_GROUP_LOCATION);
            assert_eq!(resource.api_version, RESOURCE_API_VERSION);
        }
    }

    #[test]
    fn test_every_depends_on_names_a_sibling() {
        let template = DeploymentTemplateBuilder::new().build(&spec()).unwrap();
        let siblings: Vec<(String, String)> = template
            .resources
            .iter()
            .map(|r| (r.resource_type.clone(), r.name.clone()))
            .collect();

        let with_edges: Vec<_> = template
            .resources
            .iter()
            .filter(|r| !r.depends_on.is_empty())
            .collect();
        assert_eq!(with_edges.len(), 2);

        for resource in with_edges {
            for dep in &resource.depends_on {
                let found = siblings.iter().any(|(t, n)| {
                    let var = n.trim_start_matches("[variables('").trim_end_matches("')]");
                    *dep == expr::depends_on(t, var)
                });
                assert!(found, "{} has dangling edge {}", resource.name, dep);
            }
        }
    }

    #[test]
    fn test_nic_and_vm_edges() {
        let builder = DeploymentTemplateBuilder::new();
        assert_eq!(
            builder.network_interface().depends_on,
            vec![
                "[concat('Microsoft.Network/publicIPAddresses/', variables('PublicIPAddressName'))]",
                "[concat('Microsoft.Network/virtualNetworks/', variables('VirtualNetworkName'))]",
            ]
        );
        let vm = builder.virtual_machine();
        assert_eq!(
            vm.depends_on,
            vec![
                "[concat('Microsoft.Storage/storageAccounts/', variables('StorageAccountName'))]",
                "[concat('Microsoft.Network/networkInterfaces/', variables('NetworkInterfaceCardName'))]",
            ]
        );
        assert_eq!(vm.tags.get("displayName").map(String::as_str), Some("VirtualMachine"));
    }

    #[test]
    fn test_vm_without_storage_edge_is_rejected() {
        let builder = DeploymentTemplateBuilder::new();
        let mut resources = builder.resources();
        let vm = resources
            .iter_mut()
            .find(|r| r.resource_type == VIRTUAL_MACHINES)
            .unwrap();
        vm.depends_on.retain(|dep| !dep.contains(STORAGE_ACCOUNTS));

        let err = DeploymentTemplate::assemble(resources, builder.variables(&spec())).unwrap_err();
        assert_eq!(
            err,
            TemplateError::MissingDependsOn {
                resource: "[variables('VirtualMachineName')]".to_string(),
                target: expr::resource_id(STORAGE_ACCOUNTS, vars::STORAGE_ACCOUNT_NAME),
            }
        );
    }

    #[test]
    fn test_nic_without_network_edge_is_rejected() {
        // the subnet is only reachable through SubnetRef -> VnetID
        let builder = DeploymentTemplateBuilder::new();
        let mut resources = builder.resources();
        let nic = resources
            .iter_mut()
            .find(|r| r.resource_type == NETWORK_INTERFACES)
            .unwrap();
        nic.depends_on.retain(|dep| !dep.contains(VIRTUAL_NETWORKS));

        let err = DeploymentTemplate::assemble(resources, builder.variables(&spec())).unwrap_err();
        assert!(matches!(err, TemplateError::MissingDependsOn { .. }));
    }

    #[test]
    fn test_vm_properties_wire_shape() {
        let value = serde_json::to_value(DeploymentTemplateBuilder::new().virtual_machine()).unwrap();
        let props = &value["properties"];
        assert_eq!(props["hardwareProfile"]["vmSize"], "[variables('VmSize')]");
        assert_eq!(props["storageProfile"]["imageReference"]["version"], "latest");
        assert_eq!(
            props["storageProfile"]["dataDisks"][0]["diskSizeGB"],
            "[variables('DataDiskSize')]"
        );
        assert_eq!(
            props["storageProfile"]["osDisk"]["vhd"]["uri"],
            "[concat('http://',variables('StorageAccountName'),'.blob.core.windows.net/',variables('VmStorageAccountContainerName'),'/',variables('OsDiskName'),'.vhd')]"
        );
        assert_eq!(
            props["networkProfile"]["networkInterfaces"][0]["id"],
            "[resourceId('Microsoft.Network/networkInterfaces',variables('NetworkInterfaceCardName'))]"
        );
        assert_eq!(props["diagnosticsProfile"]["bootDiagnostics"]["enabled"], "true");
    }

    #[test]
    fn test_nic_properties_wire_shape() {
        let value = serde_json::to_value(DeploymentTemplateBuilder::new().network_interface()).unwrap();
        let ip = &value["properties"]["ipConfigurations"][0];
        assert_eq!(ip["name"], "IpConfig1");
        assert_eq!(ip["properties"]["privateIPAllocationMethod"], "Dynamic");
        assert_eq!(
            ip["properties"]["publicIPAddress"]["id"],
            "[resourceId('Microsoft.Network/publicIPAddresses',variables('PublicIPAddressName'))]"
        );
        assert_eq!(ip["properties"]["subnet"]["id"], "[variables('SubnetRef')]");
    }

    #[test]
    fn test_variables_cover_node_spec() {
        let vars = DeploymentTemplateBuilder::new().variables(&spec());
        assert_eq!(vars[vars::STORAGE_ACCOUNT_NAME], "web01asa");
        assert_eq!(vars[vars::DNS_LABEL_PREFIX], "web01a");
        assert_eq!(vars[vars::VIRTUAL_MACHINE_NAME], "web-01aVirtualMachine");
        assert_eq!(vars[vars::VM_SIZE], "Standard_A0");
        assert_eq!(vars[vars::DATA_DISK_SIZE], "100");
        assert_eq!(
            vars[vars::SUBNET_REF],
            "[concat(variables('VnetID'),'/subnets/',variables('SubnetName'))]"
        );
    }

    #[test]
    fn test_storage_account_name_is_bounded() {
        let names = ResourceNames::for_node("A-Very_Long.Node-Name-That-Exceeds-Limits");
        assert!(names.storage_account.len() <= STORAGE_ACCOUNT_NAME_MAX);
        assert!(names.storage_account.ends_with("sa"));
        assert!(
            names
                .storage_account
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        );
    }

    #[test]
    fn test_body_is_incremental() {
        let body = DeploymentTemplateBuilder::new().build_body(&spec()).unwrap();
        assert_eq!(body.properties.mode, DeploymentMode::Incremental);
        assert_eq!(body.template().resources.len(), 5);
    }

    #[test]
    fn test_explicit_location() {
        let template = DeploymentTemplateBuilder::new()
            .with_location("westus")
            .build(&spec())
            .unwrap();
        assert!(template.resources.iter().all(|r| r.location == "westus"));
    }

    #[test]
    fn test_group_of() {
        assert_eq!(group_of("web-01a"), Some("web".to_string()));
        assert_eq!(group_of("my-web-01a"), Some("my-web".to_string()));
        assert_eq!(group_of("standalone"), None);
        assert_eq!(group_of("-x"), None);
    }
}
