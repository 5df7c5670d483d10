//! Keychain persistence for the session secret.
//!
//! The secret returned at login is kept in the system keychain through the
//! `keyring` crate so later invocations reuse the session:
//! - macOS: Keychain
//! - Windows: Credential Manager
//! - Linux: Secret Service (via D-Bus)

use std::collections::HashMap;
use std::sync::Mutex;

use thiserror::Error;

/// The service name used for keychain entries.
const SERVICE_NAME: &str = "shelf";

/// Errors that can occur during keychain operations.
#[derive(Debug, Error)]
pub enum KeychainError {
    /// The requested entry was not found in the keychain.
    #[error("Entry not found in keychain: {0}")]
    NotFound(String),

    /// Access to the keychain was denied.
    #[error("Keychain access denied: {0}")]
    AccessDenied(String),

    /// The keychain service is unavailable.
    #[error("Keychain service unavailable: {0}")]
    ServiceUnavailable(String),

    /// A platform-specific keychain error occurred.
    #[error("Keychain error: {0}")]
    PlatformError(String),
}

/// Result type for keychain operations.
pub type KeychainResult<T> = Result<T, KeychainError>;

/// Trait for keychain backend implementations.
pub trait KeychainBackend: Send + Sync {
    /// Retrieve a secret from the keychain.
    fn get_secret(&self, service: &str, key: &str) -> KeychainResult<String>;

    /// Store a secret in the keychain.
    fn set_secret(&self, service: &str, key: &str, value: &str) -> KeychainResult<()>;

    /// Delete a secret from the keychain.
    fn delete_secret(&self, service: &str, key: &str) -> KeychainResult<()>;
}

/// Keychain backend using the system keychain.
pub struct SystemKeychain;

fn map_keyring_error(key: &str, err: keyring::Error) -> KeychainError {
    match err {
        keyring::Error::NoEntry => KeychainError::NotFound(key.to_string()),
        keyring::Error::NoStorageAccess(_) => {
            KeychainError::AccessDenied("No storage access".to_string())
        }
        keyring::Error::PlatformFailure(_) => {
            KeychainError::ServiceUnavailable("Platform failure".to_string())
        }
        _ => KeychainError::PlatformError(err.to_string()),
    }
}

impl KeychainBackend for SystemKeychain {
    fn get_secret(&self, service: &str, key: &str) -> KeychainResult<String> {
        let entry = keyring::Entry::new(service, key)
            .map_err(|e| KeychainError::PlatformError(e.to_string()))?;
        entry.get_password().map_err(|e| map_keyring_error(key, e))
    }

    fn set_secret(&self, service: &str, key: &str, value: &str) -> KeychainResult<()> {
        let entry = keyring::Entry::new(service, key)
            .map_err(|e| KeychainError::PlatformError(e.to_string()))?;
        entry.set_password(value).map_err(|e| map_keyring_error(key, e))
    }

    fn delete_secret(&self, service: &str, key: &str) -> KeychainResult<()> {
        let entry = keyring::Entry::new(service, key)
            .map_err(|e| KeychainError::PlatformError(e.to_string()))?;
        entry.delete_credential().map_err(|e| map_keyring_error(key, e))
    }
}

/// Process-local keychain backend.
#[derive(Debug, Default)]
pub struct MemoryKeychain {
    storage: Mutex<HashMap<String, String>>,
}

impl MemoryKeychain {
    /// Create an empty keychain.
    pub fn new() -> Self {
        Self::default()
    }

    fn make_key(service: &str, key: &str) -> String {
        format!("{}:{}", service, key)
    }

    fn storage(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        match self.storage.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl KeychainBackend for MemoryKeychain {
    fn get_secret(&self, service: &str, key: &str) -> KeychainResult<String> {
        self.storage()
            .get(&Self::make_key(service, key))
            .cloned()
            .ok_or_else(|| KeychainError::NotFound(key.to_string()))
    }

    fn set_secret(&self, service: &str, key: &str, value: &str) -> KeychainResult<()> {
        self.storage()
            .insert(Self::make_key(service, key), value.to_string());
        Ok(())
    }

    fn delete_secret(&self, service: &str, key: &str) -> KeychainResult<()> {
        match self.storage().remove(&Self::make_key(service, key)) {
            Some(_) => Ok(()),
            None => Err(KeychainError::NotFound(key.to_string())),
        }
    }
}

/// Session secret storage for one project.
pub struct SessionStore<B: KeychainBackend> {
    backend: B,
    service: String,
    key_name: String,
}

impl<B: KeychainBackend> SessionStore<B> {
    /// Create a store for the sessions of `project_id`.
    pub fn new(backend: B, project_id: &str) -> Self {
        Self {
            backend,
            service: SERVICE_NAME.to_string(),
            key_name: format!("session:{}", project_id),
        }
    }

    /// Load the saved secret, if any.
    ///
    /// A keychain that cannot be read is treated as holding no session.
    pub fn load(&self) -> Option<String> {
        match self.backend.get_secret(&self.service, &self.key_name) {
            Ok(secret) => Some(secret),
            Err(KeychainError::NotFound(_)) => None,
            Err(e) => {
                tracing::warn!("Could not read saved session: {}", e);
                None
            }
        }
    }

    /// Save a secret, replacing any previous one.
    pub fn save(&self, secret: &str) -> KeychainResult<()> {
        self.backend.set_secret(&self.service, &self.key_name, secret)
    }

    /// Remove the saved secret. Removing a missing secret is not an error.
    pub fn clear(&self) -> KeychainResult<()> {
        match self.backend.delete_secret(&self.service, &self.key_name) {
            Ok(()) | Err(KeychainError::NotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

impl SessionStore<SystemKeychain> {
    /// Create a store backed by the system keychain.
    pub fn system(project_id: &str) -> Self {
        Self::new(SystemKeychain, project_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_store() -> SessionStore<MemoryKeychain> {
        SessionStore::new(MemoryKeychain::new(), "proj")
    }

    #[test]
    fn test_save_and_load() {
        let store = create_test_store();
        assert_eq!(store.load(), None);

        store.save("secret-1").unwrap();
        assert_eq!(store.load(), Some("secret-1".to_string()));
    }

    #[test]
    fn test_overwrite() {
        let store = create_test_store();
        store.save("first").unwrap();
        store.save("second").unwrap();
        assert_eq!(store.load(), Some("second".to_string()));
    }

    #[test]
    fn test_clear() {
        let store = create_test_store();
        store.save("secret").unwrap();
        store.clear().unwrap();
        assert_eq!(store.load(), None);
    }

    #[test]
    fn test_clear_missing_is_ok() {
        let store = create_test_store();
        assert!(store.clear().is_ok());
    }

    #[test]
    fn test_projects_are_separate() {
        let backend = MemoryKeychain::new();
        backend.set_secret(SERVICE_NAME, "session:other", "x").unwrap();

        let store = SessionStore::new(backend, "proj");
        assert_eq!(store.load(), None);
    }

    #[test]
    fn test_memory_keychain_delete_missing() {
        let keychain = MemoryKeychain::new();
        assert!(matches!(
            keychain.delete_secret("s", "k"),
            Err(KeychainError::NotFound(_))
        ));
    }
}
