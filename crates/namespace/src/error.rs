//! Error types for the namespace crate.

use thiserror::Error;

/// Namespace error type covering the ways a path or key can be rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NamespaceError {
    /// A breadcrumb index does not exist on the current cursor.
    #[error("breadcrumb index {index} out of range for path with {depth} segments")]
    BreadcrumbOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of segments in the cursor.
        depth: usize,
    },

    /// A folder name to open contained a separator.
    #[error("folder name must be a single segment: {0:?}")]
    NotASegment(String),

    /// An empty folder name was opened at the root.
    #[error("an empty folder name cannot be opened at the root")]
    EmptyRootSegment,

    /// An upload name was empty after normalization.
    #[error("object name is empty")]
    EmptyName,

    /// No object exists under the given key.
    #[error("no object with key: {0}")]
    KeyNotFound(String),
}

/// Result type alias for namespace operations.
pub type Result<T> = std::result::Result<T, NamespaceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_breadcrumb_out_of_range_display() {
        let err = NamespaceError::BreadcrumbOutOfRange { index: 4, depth: 2 };
        assert_eq!(
            err.to_string(),
            "breadcrumb index 4 out of range for path with 2 segments"
        );
    }

    #[test]
    fn test_not_a_segment_display() {
        let err = NamespaceError::NotASegment("a/b".to_string());
        assert_eq!(err.to_string(), "folder name must be a single segment: \"a/b\"");
    }

    #[test]
    fn test_key_not_found_display() {
        let err = NamespaceError::KeyNotFound("docs/a.txt".to_string());
        assert_eq!(err.to_string(), "no object with key: docs/a.txt");
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<NamespaceError>();
    }
}
