//! # Shelf Client Library
//!
//! A terminal file manager for a bucket of a hosted storage platform. The
//! bucket is flat: objects carry `/`-separated keys and folders only exist as
//! key prefixes. This crate provides:
//!
//! - **Platform contract**: identity, sessions and object storage behind the
//!   [`Platform`] trait, with an Appwrite REST implementation and an
//!   in-memory one
//! - **Session context**: the `Loading → Authenticated | Unauthenticated`
//!   gate, with the session secret kept in the system keychain
//! - **File browser**: cursor navigation, listing projection, uploads,
//!   downloads and deletes with user-facing error banners
//! - **Front ends**: the `shelf` command line and a ratatui TUI
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use client::{AppwriteClient, Config, FileBrowser, SessionContext, SessionStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load_default()?;
//!     let platform = Arc::new(AppwriteClient::new(&config.platform)?);
//!
//!     let session = SessionContext::new(
//!         Arc::clone(&platform),
//!         SessionStore::system(&config.platform.project_id),
//!     );
//!     session.require_identity().await?;
//!
//!     let mut browser = FileBrowser::new(platform, &config.platform.bucket_id, config.upload.max_size);
//!     browser.refresh().await?;
//!     for entry in browser.listing().entries() {
//!         println!("{}", entry.name());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`config`]: Configuration loading and defaults
//! - [`error`]: User-facing action failures
//! - [`platform`]: Platform contract and implementations
//! - [`session`]: Session context and keychain persistence
//! - [`files`]: The file browser controller and local upload sources
//! - [`logging`]: Tracing setup
//! - [`ui`]: Terminal user interface

pub mod config;
pub mod error;
pub mod files;
pub mod logging;
pub mod platform;
pub mod session;
pub mod ui;

// Re-export namespace for convenience
pub use namespace;

// Re-export config types for convenience
pub use config::Config;

// Re-export error types for convenience
pub use error::{ActionError, AUTH_FAILED};

// Re-export platform types for convenience
pub use platform::{
    AppwriteClient, Identity, MemoryPlatform, Operation, Platform, PlatformError, PlatformResult,
    Session,
};

// Re-export session types for convenience
pub use session::{AuthState, KeychainBackend, MemoryKeychain, SessionContext, SessionStore};

// Re-export file types for convenience
pub use files::{FileBrowser, LocalError};

// Re-export UI types for convenience
pub use ui::{BrowserView, TuiApp, TuiState};
