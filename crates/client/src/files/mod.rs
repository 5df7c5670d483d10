//! Bucket browsing and transfers.
//!
//! - [`browser`]: the file browser controller
//! - [`local`]: reading local files and folders for upload

pub mod browser;
pub mod local;

pub use browser::{new_object_id, FileBrowser};
pub use local::{LocalError, LocalFile};
