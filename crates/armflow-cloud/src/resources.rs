//! Typed `properties` payloads for the resource kinds a node deployment uses
//!
//! Field names follow the ARM template schema exactly.

use serde::{Deserialize, Serialize};

pub const STORAGE_ACCOUNTS: &str = "Microsoft.Storage/storageAccounts";
pub const VIRTUAL_NETWORKS: &str = "Microsoft.Network/virtualNetworks";
pub const PUBLIC_IP_ADDRESSES: &str = "Microsoft.Network/publicIPAddresses";
pub const NETWORK_INTERFACES: &str = "Microsoft.Network/networkInterfaces";
pub const VIRTUAL_MACHINES: &str = "Microsoft.Compute/virtualMachines";

/// Properties payload, one variant per resource type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResourceProperties {
    StorageAccount(StorageAccountProperties),
    VirtualNetwork(VirtualNetworkProperties),
    PublicIpAddress(PublicIpAddressProperties),
    NetworkInterface(NetworkInterfaceProperties),
    VirtualMachine(Box<VirtualMachineProperties>),
}

impl ResourceProperties {
    /// Resource type this payload belongs to
    pub fn resource_type(&self) -> &'static str {
        match self {
            ResourceProperties::StorageAccount(_) => STORAGE_ACCOUNTS,
            ResourceProperties::VirtualNetwork(_) => VIRTUAL_NETWORKS,
            ResourceProperties::PublicIpAddress(_) => PUBLIC_IP_ADDRESSES,
            ResourceProperties::NetworkInterface(_) => NETWORK_INTERFACES,
            ResourceProperties::VirtualMachine(_) => VIRTUAL_MACHINES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageAccountProperties {
    pub account_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualNetworkProperties {
    pub address_space: AddressSpace,
    pub subnets: Vec<Subnet>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressSpace {
    pub address_prefixes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subnet {
    pub name: String,
    pub properties: SubnetProperties,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubnetProperties {
    pub address_prefix: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicIpAddressProperties {
    #[serde(rename = "publicIPAllocationMethod")]
    pub public_ip_allocation_method: String,

    #[serde(rename = "dnsSettings")]
    pub dns_settings: DnsSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DnsSettings {
    pub domain_name_label: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInterfaceProperties {
    pub ip_configurations: Vec<IpConfiguration>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpConfiguration {
    pub name: String,
    pub properties: IpConfigurationProperties,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IpConfigurationProperties {
    #[serde(rename = "privateIPAllocationMethod")]
    pub private_ip_allocation_method: String,

    #[serde(rename = "publicIPAddress")]
    pub public_ip_address: IdReference,

    pub subnet: IdReference,
}

/// `{ "id": "<expression>" }`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdReference {
    pub id: String,
}

impl IdReference {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMachineProperties {
    pub hardware_profile: HardwareProfile,
    pub os_profile: OsProfile,
    pub storage_profile: StorageProfile,
    pub network_profile: NetworkProfile,
    pub diagnostics_profile: DiagnosticsProfile,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HardwareProfile {
    pub vm_size: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OsProfile {
    pub computer_name: String,
    pub admin_username: String,
    pub admin_password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageProfile {
    pub image_reference: ImageReference,
    pub os_disk: OsDisk,
    pub data_disks: Vec<DataDisk>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageReference {
    pub publisher: String,
    pub offer: String,
    pub sku: String,
    pub version: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OsDisk {
    pub name: String,
    pub caching: String,
    pub create_option: String,
    pub vhd: Vhd,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataDisk {
    pub name: String,
    #[serde(rename = "diskSizeGB")]
    pub disk_size_gb: String,
    pub lun: String,
    pub create_option: String,
    pub vhd: Vhd,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vhd {
    pub uri: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkProfile {
    pub network_interfaces: Vec<IdReference>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagnosticsProfile {
    pub boot_diagnostics: BootDiagnostics,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BootDiagnostics {
    pub enabled: String,
    pub storage_uri: String,
}
