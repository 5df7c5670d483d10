//! # Shelf Namespace Library
//!
//! This crate derives a virtual folder hierarchy from the flat object keys
//! of a storage bucket.
//!
//! ## Overview
//!
//! The storage platform only knows objects with keys such as
//! `photos/2024/rome.jpg`. Folders are never stored; they appear wherever an
//! object key continues below a prefix. This crate provides:
//!
//! - **Stored objects**: The snapshot records returned by the platform
//! - **Path cursor**: The currently displayed folder and its navigation
//! - **Projection**: Immediate child folders and files at a cursor
//! - **Index**: A segment trie answering the same question for large buckets
//!
//! Everything here is pure: no I/O and no shared state.
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::Utc;
//! use namespace::{children_at, PathCursor, StoredObject};
//!
//! let objects = vec![
//!     StoredObject::new("1", "docs/a.txt", 10, Utc::now()),
//!     StoredObject::new("2", "docs/b.txt", 20, Utc::now()),
//!     StoredObject::new("3", "notes.md", 30, Utc::now()),
//! ];
//!
//! let mut cursor = PathCursor::root();
//! let listing = children_at(&objects, &cursor);
//! assert_eq!(listing.folders.len(), 1);
//! assert_eq!(listing.files[0].key, "notes.md");
//!
//! cursor.open("docs").unwrap();
//! assert_eq!(children_at(&objects, &cursor).files.len(), 2);
//! ```
//!
//! ## Modules
//!
//! - [`object`]: Stored object records
//! - [`cursor`]: Path cursor and breadcrumbs
//! - [`projector`]: Folder/file projection
//! - [`index`]: Trie index over a snapshot
//! - [`format`]: Size and date formatting
//! - [`error`]: Error types

pub mod cursor;
pub mod error;
pub mod format;
pub mod index;
pub mod object;
pub mod projector;

pub use cursor::{Breadcrumb, PathCursor};
pub use error::{NamespaceError, Result};
pub use format::{format_date, format_file_size};
pub use index::NamespaceIndex;
pub use object::{display_name, StoredObject, SEPARATOR};
pub use projector::{children_at, relative_key, Entry, Listing};
