//! User-facing action failures.
//!
//! Every failed platform call is caught where the action started and turned
//! into one of these. The [`Display`](std::fmt::Display) text is exactly what
//! the error banner shows; the underlying platform error is only logged.

use thiserror::Error;

use crate::platform::PlatformError;

/// A failed user action.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ActionError {
    /// Login, signup, OAuth or the session gate failed.
    #[error("{0}")]
    Auth(String),

    /// The bucket listing could not be fetched.
    #[error("Failed to fetch files")]
    List,

    /// A single-file upload failed.
    #[error("Upload failed: {0}")]
    Upload(String),

    /// A folder upload stopped at the first failing file.
    #[error("Folder upload failed: {0}")]
    FolderUpload(String),

    /// A download could not be started or completed.
    #[error("Download failed: {0}")]
    Download(String),

    /// An object could not be deleted.
    #[error("Delete failed: {0}")]
    Delete(String),

    /// The session could not be ended.
    #[error("Logout failed: {0}")]
    Logout(String),
}

/// Fallback banner when an auth failure carries no message.
pub const AUTH_FAILED: &str = "Authentication failed";

impl ActionError {
    /// Auth failure from a platform error, keeping the platform's message.
    pub fn auth(err: &PlatformError) -> Self {
        let message = err.to_string();
        if message.is_empty() {
            ActionError::Auth(AUTH_FAILED.to_string())
        } else {
            ActionError::Auth(message)
        }
    }

    /// Returns true for failures of the login surface or session gate.
    pub fn is_auth(&self) -> bool {
        matches!(self, ActionError::Auth(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_banner_text() {
        assert_eq!(ActionError::List.to_string(), "Failed to fetch files");
        assert_eq!(
            ActionError::Upload("too big".to_string()).to_string(),
            "Upload failed: too big"
        );
        assert_eq!(
            ActionError::FolderUpload("x".to_string()).to_string(),
            "Folder upload failed: x"
        );
        assert_eq!(
            ActionError::Download("gone".to_string()).to_string(),
            "Download failed: gone"
        );
        assert_eq!(
            ActionError::Delete("denied".to_string()).to_string(),
            "Delete failed: denied"
        );
        assert_eq!(
            ActionError::Logout("offline".to_string()).to_string(),
            "Logout failed: offline"
        );
    }

    #[test]
    fn test_auth_keeps_platform_message() {
        let err = PlatformError::Api {
            code: 401,
            kind: "user_invalid_credentials".to_string(),
            message: "Invalid credentials".to_string(),
        };
        assert_eq!(ActionError::auth(&err), ActionError::Auth("Invalid credentials".to_string()));
    }

    #[test]
    fn test_auth_fallback_message() {
        let err = PlatformError::Api {
            code: 500,
            kind: String::new(),
            message: String::new(),
        };
        assert_eq!(ActionError::auth(&err).to_string(), AUTH_FAILED);
        assert!(ActionError::auth(&err).is_auth());
    }
}
