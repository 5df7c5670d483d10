//! In-memory platform.
//!
//! Keeps accounts, one current session and the objects of every bucket in
//! process memory. Individual operations can be made to fail so callers can
//! exercise their error paths, and every call is recorded in order.

use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use bytes::Bytes;
use chrono::Utc;
use namespace::StoredObject;
use url::Url;

use super::{Identity, Platform, PlatformError, PlatformResult, Session, CURRENT_SESSION};

/// A platform operation, used for failure injection and the call log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    GetIdentity,
    CreateIdentity,
    CreateSession,
    DeleteSession,
    ListObjects,
    CreateObject,
    DownloadObject,
    DeleteObject,
}

#[derive(Debug, Clone)]
struct Account {
    identity: Identity,
    password: String,
}

#[derive(Debug, Clone)]
struct StoredData {
    object: StoredObject,
    data: Bytes,
}

#[derive(Debug, Default)]
struct State {
    accounts: HashMap<String, Account>,
    /// Secret -> account email.
    sessions: HashMap<String, String>,
    current_secret: Option<String>,
    buckets: HashMap<String, Vec<StoredData>>,
    failing: HashSet<Operation>,
    failing_keys: HashSet<String>,
    calls: Vec<Operation>,
    next_id: u64,
}

impl State {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{}{}", prefix, self.next_id)
    }

    fn enter(&mut self, op: Operation) -> PlatformResult<()> {
        self.calls.push(op);
        if self.failing.contains(&op) {
            return Err(PlatformError::Api {
                code: 500,
                kind: "general_server_error".to_string(),
                message: format!("injected failure: {:?}", op),
            });
        }
        Ok(())
    }

    fn current_account(&self) -> Option<&Account> {
        let secret = self.current_secret.as_ref()?;
        let email = self.sessions.get(secret)?;
        self.accounts.get(email)
    }

    fn require_session(&self) -> PlatformResult<()> {
        self.current_account()
            .map(|_| ())
            .ok_or(PlatformError::Unauthenticated)
    }
}

/// In-memory implementation of [`Platform`].
#[derive(Debug, Default)]
pub struct MemoryPlatform {
    state: Mutex<State>,
}

impl MemoryPlatform {
    /// Create an empty platform.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Register an account directly.
    pub fn add_account(&self, email: &str, password: &str, name: &str) -> Identity {
        let mut state = self.lock();
        let identity = Identity {
            id: state.next_id("user"),
            name: name.to_string(),
            email: email.to_string(),
        };
        state.accounts.insert(
            email.to_string(),
            Account {
                identity: identity.clone(),
                password: password.to_string(),
            },
        );
        identity
    }

    /// Store an object directly, bypassing session checks.
    pub fn insert_object(&self, bucket_id: &str, key: &str, data: &[u8]) -> StoredObject {
        let mut state = self.lock();
        let id = state.next_id("obj");
        let object = StoredObject::new(id, key, data.len() as u64, Utc::now());
        state
            .buckets
            .entry(bucket_id.to_string())
            .or_default()
            .push(StoredData {
                object: object.clone(),
                data: Bytes::copy_from_slice(data),
            });
        object
    }

    /// Make every call of `op` fail until [`recover`](Self::recover).
    pub fn fail(&self, op: Operation) {
        self.lock().failing.insert(op);
    }

    /// Stop failing `op`.
    pub fn recover(&self, op: Operation) {
        self.lock().failing.remove(&op);
    }

    /// Make uploads of `key` fail.
    pub fn fail_upload_of(&self, key: &str) {
        self.lock().failing_keys.insert(key.to_string());
    }

    /// Operations called so far, in order.
    pub fn calls(&self) -> Vec<Operation> {
        self.lock().calls.clone()
    }

    /// Forget the call log.
    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Keys stored in a bucket, in listing order.
    pub fn keys(&self, bucket_id: &str) -> Vec<String> {
        self.lock()
            .buckets
            .get(bucket_id)
            .map(|objects| objects.iter().map(|s| s.object.key.clone()).collect())
            .unwrap_or_default()
    }

    /// Returns the secret of the current session, if any.
    pub fn current_secret(&self) -> Option<String> {
        self.lock().current_secret.clone()
    }
}

impl Platform for MemoryPlatform {
    fn set_session_secret(&self, secret: Option<String>) {
        self.lock().current_secret = secret;
    }

    async fn get_current_identity(&self) -> PlatformResult<Identity> {
        let mut state = self.lock();
        state.enter(Operation::GetIdentity)?;
        state
            .current_account()
            .map(|account| account.identity.clone())
            .ok_or(PlatformError::Unauthenticated)
    }

    async fn create_identity(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> PlatformResult<Identity> {
        {
            let mut state = self.lock();
            state.enter(Operation::CreateIdentity)?;
            if state.accounts.contains_key(email) {
                return Err(PlatformError::Api {
                    code: 409,
                    kind: "user_already_exists".to_string(),
                    message: "A user with the same id, email, or phone already exists in this project."
                        .to_string(),
                });
            }
        }
        Ok(self.add_account(email, password, name))
    }

    async fn create_session(&self, email: &str, password: &str) -> PlatformResult<Session> {
        let mut state = self.lock();
        state.enter(Operation::CreateSession)?;

        let user_id = match state.accounts.get(email) {
            Some(account) if account.password == password => account.identity.id.clone(),
            _ => {
                return Err(PlatformError::Api {
                    code: 401,
                    kind: "user_invalid_credentials".to_string(),
                    message: "Invalid credentials. Please check the email and password."
                        .to_string(),
                })
            }
        };

        let secret = state.next_id("secret");
        state.sessions.insert(secret.clone(), email.to_string());
        state.current_secret = Some(secret.clone());

        Ok(Session {
            id: state.next_id("session"),
            user_id,
            provider: "email".to_string(),
            expire: String::new(),
            secret: Some(secret),
        })
    }

    fn oauth_redirect_url(
        &self,
        provider: &str,
        success_url: &str,
        failure_url: &str,
    ) -> PlatformResult<Url> {
        let mut url = Url::parse("memory://platform/account/sessions/oauth2/")?.join(provider)?;
        url.query_pairs_mut()
            .append_pair("success", success_url)
            .append_pair("failure", failure_url);
        Ok(url)
    }

    async fn delete_session(&self, session_ref: &str) -> PlatformResult<()> {
        let mut state = self.lock();
        state.enter(Operation::DeleteSession)?;
        state.require_session()?;

        if session_ref == CURRENT_SESSION {
            if let Some(secret) = state.current_secret.take() {
                state.sessions.remove(&secret);
            }
        }
        Ok(())
    }

    async fn list_objects(&self, bucket_id: &str) -> PlatformResult<Vec<StoredObject>> {
        let mut state = self.lock();
        state.enter(Operation::ListObjects)?;
        state.require_session()?;

        Ok(state
            .buckets
            .get(bucket_id)
            .map(|objects| objects.iter().map(|s| s.object.clone()).collect())
            .unwrap_or_default())
    }

    async fn create_object(
        &self,
        bucket_id: &str,
        object_id: &str,
        key: &str,
        data: Bytes,
    ) -> PlatformResult<StoredObject> {
        let mut state = self.lock();
        state.enter(Operation::CreateObject)?;
        state.require_session()?;

        if state.failing_keys.contains(key) {
            return Err(PlatformError::Api {
                code: 500,
                kind: "storage_device_not_found".to_string(),
                message: format!("injected failure uploading {}", key),
            });
        }

        let objects = state.buckets.entry(bucket_id.to_string()).or_default();
        if objects.iter().any(|s| s.object.id == object_id) {
            return Err(PlatformError::Api {
                code: 409,
                kind: "storage_file_already_exists".to_string(),
                message: "A storage file with the requested ID already exists.".to_string(),
            });
        }

        let object = StoredObject::new(object_id, key, data.len() as u64, Utc::now());
        objects.push(StoredData {
            object: object.clone(),
            data,
        });
        Ok(object)
    }

    fn download_url(&self, bucket_id: &str, object_id: &str) -> PlatformResult<Url> {
        let url = Url::parse("memory://platform/storage/buckets/")?
            .join(&format!("{}/files/{}/download", bucket_id, object_id))?;
        Ok(url)
    }

    async fn download_to(
        &self,
        bucket_id: &str,
        object_id: &str,
        dest: &Path,
    ) -> PlatformResult<u64> {
        let data = {
            let mut state = self.lock();
            state.enter(Operation::DownloadObject)?;
            state.require_session()?;
            state
                .buckets
                .get(bucket_id)
                .and_then(|objects| objects.iter().find(|s| s.object.id == object_id))
                .map(|s| s.data.clone())
                .ok_or_else(|| not_found(object_id))?
        };

        tokio::fs::write(dest, &data).await?;
        Ok(data.len() as u64)
    }

    async fn delete_object(&self, bucket_id: &str, object_id: &str) -> PlatformResult<()> {
        let mut state = self.lock();
        state.enter(Operation::DeleteObject)?;
        state.require_session()?;

        let objects = state.buckets.entry(bucket_id.to_string()).or_default();
        let before = objects.len();
        objects.retain(|s| s.object.id != object_id);
        if objects.len() == before {
            return Err(not_found(object_id));
        }
        Ok(())
    }
}

fn not_found(object_id: &str) -> PlatformError {
    PlatformError::Api {
        code: 404,
        kind: "storage_file_not_found".to_string(),
        message: format!("The requested file could not be found: {}", object_id),
    }
}
