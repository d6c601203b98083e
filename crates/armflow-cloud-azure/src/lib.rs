//! ArmFlow Azure transport
//!
//! Bearer-token HTTP access to the Azure Resource Manager REST API.
//! Token acquisition is out of scope: the token is read from
//! `AZURE_ACCESS_TOKEN` and a 401 is reported as an authentication failure.

pub mod error;
pub mod transport;

pub use error::{AzureError, Result};
pub use transport::{AzureConfig, AzureTransport, RESOURCE_MANAGER_URL};
