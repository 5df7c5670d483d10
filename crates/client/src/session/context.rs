//! Session context and gate.
//!
//! Holds the single authentication state of the process. The state starts as
//! [`AuthState::Loading`], is resolved once at boot, moves to
//! [`AuthState::Authenticated`] on login and back to
//! [`AuthState::Unauthenticated`] on logout. Front ends observe changes
//! through a `tokio::sync::watch` receiver.

use std::sync::Arc;

use tokio::sync::watch;
use url::Url;

use super::store::{KeychainBackend, SessionStore};
use crate::error::ActionError;
use crate::platform::{Identity, Platform, PlatformError, Session, CURRENT_SESSION};

/// Banner shown when the gate is closed.
pub const NOT_LOGGED_IN: &str = "Not logged in";

/// Authentication state of the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    /// The boot-time identity check has not finished.
    Loading,
    /// A valid session exists for this identity.
    Authenticated(Identity),
    /// No valid session.
    Unauthenticated,
}

impl AuthState {
    /// Returns the identity when authenticated.
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            AuthState::Authenticated(identity) => Some(identity),
            _ => None,
        }
    }

    /// Returns true while the boot-time check is pending.
    pub fn is_loading(&self) -> bool {
        matches!(self, AuthState::Loading)
    }
}

/// Owner of the authentication state.
pub struct SessionContext<P: Platform, B: KeychainBackend> {
    platform: Arc<P>,
    store: SessionStore<B>,
    state: watch::Sender<AuthState>,
}

impl<P: Platform, B: KeychainBackend> SessionContext<P, B> {
    /// Create a context in the [`AuthState::Loading`] state.
    pub fn new(platform: Arc<P>, store: SessionStore<B>) -> Self {
        let (state, _) = watch::channel(AuthState::Loading);
        Self {
            platform,
            store,
            state,
        }
    }

    /// The platform this context authenticates against.
    pub fn platform(&self) -> &Arc<P> {
        &self.platform
    }

    /// Current state.
    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    /// Subscribe to state changes.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    /// Identity of the current session, if authenticated.
    pub fn identity(&self) -> Option<Identity> {
        self.state.borrow().identity().cloned()
    }

    fn set_state(&self, state: AuthState) {
        self.state.send_replace(state);
    }

    /// Run the boot-time identity check.
    ///
    /// A saved session secret is handed to the platform first. Any failure
    /// of the check leaves the context unauthenticated.
    pub async fn resolve(&self) -> AuthState {
        self.set_state(AuthState::Loading);

        if let Some(secret) = self.store.load() {
            tracing::debug!("Restoring saved session");
            self.platform.set_session_secret(Some(secret));
        }

        let state = match self.platform.get_current_identity().await {
            Ok(identity) => {
                tracing::info!("Authenticated as {}", identity.email);
                AuthState::Authenticated(identity)
            }
            Err(PlatformError::Unauthenticated) => {
                tracing::debug!("No valid session");
                AuthState::Unauthenticated
            }
            Err(e) => {
                tracing::warn!("Identity check failed: {}", e);
                AuthState::Unauthenticated
            }
        };

        self.set_state(state.clone());
        state
    }

    /// Delete whatever session the platform currently holds.
    ///
    /// A saved secret is attached first, so a session saved by an earlier
    /// process is revoked as well.
    async fn clear_existing_session(&self) {
        if let Some(secret) = self.store.load() {
            self.platform.set_session_secret(Some(secret));
        }
        if let Err(e) = self.platform.delete_session(CURRENT_SESSION).await {
            tracing::debug!("No existing session to clear: {}", e);
        }
    }

    fn persist(&self, session: &Session) {
        match &session.secret {
            Some(secret) => {
                if let Err(e) = self.store.save(secret) {
                    tracing::warn!("Could not save session to keychain: {}", e);
                }
            }
            None => tracing::debug!("Session {} carries no secret to save", session.id),
        }
    }

    async fn open_session(&self, email: &str, password: &str) -> Result<Identity, ActionError> {
        let session = self
            .platform
            .create_session(email, password)
            .await
            .map_err(|e| {
                tracing::warn!("Login failed for {}: {}", email, e);
                ActionError::auth(&e)
            })?;
        self.persist(&session);

        let identity = self
            .platform
            .get_current_identity()
            .await
            .map_err(|e| ActionError::auth(&e))?;

        tracing::info!("Logged in as {}", identity.email);
        self.set_state(AuthState::Authenticated(identity.clone()));
        Ok(identity)
    }

    /// Log in with email and password.
    pub async fn login(&self, email: &str, password: &str) -> Result<Identity, ActionError> {
        self.clear_existing_session().await;
        self.open_session(email, password).await
    }

    /// Register a new account and log in with it.
    pub async fn signup(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<Identity, ActionError> {
        self.clear_existing_session().await;

        self.platform
            .create_identity(email, password, name)
            .await
            .map_err(|e| {
                tracing::warn!("Signup failed for {}: {}", email, e);
                ActionError::auth(&e)
            })?;

        self.open_session(email, password).await
    }

    /// Build the URL that starts an OAuth login with `provider`.
    pub async fn oauth_url(
        &self,
        provider: &str,
        success_url: &str,
        failure_url: &str,
    ) -> Result<Url, ActionError> {
        self.clear_existing_session().await;

        self.platform
            .oauth_redirect_url(provider, success_url, failure_url)
            .map_err(|e| {
                tracing::warn!("OAuth URL for {} failed: {}", provider, e);
                ActionError::Auth(format!("{} login failed", provider))
            })
    }

    /// End the current session.
    ///
    /// On failure the state is left unchanged.
    pub async fn logout(&self) -> Result<(), ActionError> {
        self.platform
            .delete_session(CURRENT_SESSION)
            .await
            .map_err(|e| ActionError::Logout(e.to_string()))?;

        self.platform.set_session_secret(None);
        if let Err(e) = self.store.clear() {
            tracing::warn!("Could not remove saved session: {}", e);
        }
        self.set_state(AuthState::Unauthenticated);
        tracing::info!("Logged out");
        Ok(())
    }

    /// Gate for the browsing surface.
    ///
    /// Resolves the state first if the boot-time check has not run.
    pub async fn require_identity(&self) -> Result<Identity, ActionError> {
        if self.state.borrow().is_loading() {
            self.resolve().await;
        }
        self.identity()
            .ok_or_else(|| ActionError::Auth(NOT_LOGGED_IN.to_string()))
    }
}
