//! Storage platform contract.
//!
//! Identity, sessions and object storage are owned by an external
//! backend-as-a-service. This module defines the request/response operations
//! the client consumes from it:
//!
//! - [`Platform`]: the operation contract
//! - [`appwrite`]: REST implementation against an Appwrite-compatible API
//! - [`memory`]: in-memory implementation with failure injection
//!
//! No operation retries; every failure is reported once as a
//! [`PlatformError`].

pub mod appwrite;
pub mod memory;

use std::path::Path;

use bytes::Bytes;
use namespace::StoredObject;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

pub use appwrite::AppwriteClient;
pub use memory::{MemoryPlatform, Operation};

/// Session reference addressing the session used by the current request.
pub const CURRENT_SESSION: &str = "current";

/// Errors reported by platform operations.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// No valid session accompanies the request.
    #[error("not authenticated")]
    Unauthenticated,

    /// The platform rejected the request.
    #[error("{message}")]
    Api {
        /// HTTP status code.
        code: u16,
        /// Platform error type (e.g. `user_invalid_credentials`).
        kind: String,
        /// Human readable message from the platform.
        message: String,
    },

    /// The request could not be sent or its response not received.
    #[error("request failed: {0}")]
    Transport(String),

    /// The response body could not be decoded.
    #[error("unexpected response: {0}")]
    Decode(String),

    /// A URL could not be built from the configured endpoint.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// Local IO error while reading or writing object data.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for platform operations.
pub type PlatformResult<T> = std::result::Result<T, PlatformError>;

impl From<reqwest::Error> for PlatformError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            PlatformError::Decode(err.to_string())
        } else {
            PlatformError::Transport(err.to_string())
        }
    }
}

impl From<url::ParseError> for PlatformError {
    fn from(err: url::ParseError) -> Self {
        PlatformError::InvalidUrl(err.to_string())
    }
}

/// An authenticated account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// Account identifier.
    #[serde(rename = "$id")]
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Email address.
    #[serde(default)]
    pub email: String,
}

/// A login session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Session identifier.
    #[serde(rename = "$id")]
    pub id: String,
    /// Account the session belongs to.
    #[serde(rename = "userId")]
    pub user_id: String,
    /// Login provider (`email`, `google`, ...).
    #[serde(default)]
    pub provider: String,
    /// Expiry timestamp as reported by the platform.
    #[serde(default)]
    pub expire: String,
    /// Opaque secret that authenticates later requests.
    #[serde(skip)]
    pub secret: Option<String>,
}

/// Operations consumed from the storage platform.
///
/// Implementations keep the secret of the session they are acting under;
/// a successful [`create_session`](Platform::create_session) replaces it and
/// a successful [`delete_session`](Platform::delete_session) of the current
/// session clears it.
#[allow(async_fn_in_trait)]
pub trait Platform: Send + Sync {
    /// Replace the session secret attached to subsequent requests.
    fn set_session_secret(&self, secret: Option<String>);

    /// Returns the account of the current session.
    ///
    /// Fails with [`PlatformError::Unauthenticated`] without a valid session.
    async fn get_current_identity(&self) -> PlatformResult<Identity>;

    /// Registers a new account.
    async fn create_identity(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> PlatformResult<Identity>;

    /// Logs in with email and password.
    async fn create_session(&self, email: &str, password: &str) -> PlatformResult<Session>;

    /// Builds the URL that starts an OAuth login with `provider`.
    ///
    /// The platform redirects the browser to `success_url` or `failure_url`
    /// when the flow ends.
    fn oauth_redirect_url(
        &self,
        provider: &str,
        success_url: &str,
        failure_url: &str,
    ) -> PlatformResult<Url>;

    /// Ends a session. `session_ref` is a session id or [`CURRENT_SESSION`].
    async fn delete_session(&self, session_ref: &str) -> PlatformResult<()>;

    /// Lists every object in the bucket, in platform listing order.
    async fn list_objects(&self, bucket_id: &str) -> PlatformResult<Vec<StoredObject>>;

    /// Stores `data` as a new object with the given id and key.
    async fn create_object(
        &self,
        bucket_id: &str,
        object_id: &str,
        key: &str,
        data: Bytes,
    ) -> PlatformResult<StoredObject>;

    /// Returns the URL an object can be downloaded from.
    fn download_url(&self, bucket_id: &str, object_id: &str) -> PlatformResult<Url>;

    /// Downloads an object into `dest`, returning the number of bytes written.
    async fn download_to(&self, bucket_id: &str, object_id: &str, dest: &Path)
        -> PlatformResult<u64>;

    /// Deletes an object.
    async fn delete_object(&self, bucket_id: &str, object_id: &str) -> PlatformResult<()>;
}
