//! Authentication state and session persistence.
//!
//! - [`context`]: the session context and gate
//! - [`store`]: keychain storage of the session secret

pub mod context;
pub mod store;

pub use context::{AuthState, SessionContext, NOT_LOGGED_IN};
pub use store::{
    KeychainBackend, KeychainError, KeychainResult, MemoryKeychain, SessionStore, SystemKeychain,
};
