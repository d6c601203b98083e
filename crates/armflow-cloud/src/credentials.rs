//! Login credentials keyed by `node#<deployment>`

use crate::deployment::LoginCredentials;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Read access to stored credentials
pub trait CredentialLookup {
    fn credentials(&self, key: &str) -> Option<LoginCredentials>;
}

impl CredentialLookup for HashMap<String, LoginCredentials> {
    fn credentials(&self, key: &str) -> Option<LoginCredentials> {
        self.get(key).cloned()
    }
}

/// Shared credential store
///
/// Clones share the same map, so one store can be handed to several
/// concurrently running provisioners.
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    entries: Arc<RwLock<HashMap<String, LoginCredentials>>>,
}

impl CredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store credentials, returning the ones previously held under `key`
    pub fn insert(
        &self,
        key: impl Into<String>,
        credentials: LoginCredentials,
    ) -> Option<LoginCredentials> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key.into(), credentials)
    }

    pub fn get(&self, key: &str) -> Option<LoginCredentials> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(key).cloned()
    }

    pub fn remove(&self, key: &str) -> Option<LoginCredentials> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        entries.remove(key)
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CredentialLookup for CredentialStore {
    fn credentials(&self, key: &str) -> Option<LoginCredentials> {
        self.get(key)
    }
}
