//! Configuration management for the Shelf client.
//!
//! This module provides TOML-based configuration file loading and saving.
//! The default configuration path is `~/.config/shelf/config.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default platform endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://cloud.appwrite.io/v1";

/// Default OAuth provider offered by `shelf oauth`.
pub const DEFAULT_OAUTH_PROVIDER: &str = "google";

/// Platform limit for a single upload request; larger files are chunked.
pub const DEFAULT_CHUNK_SIZE: u64 = 5 * 1024 * 1024;

/// Configuration validation errors.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("endpoint must start with http:// or https://, got {0}")]
    InvalidEndpoint(String),

    #[error("project_id must be set")]
    MissingProjectId,

    #[error("bucket_id must be set")]
    MissingBucketId,

    #[error("max_size must be greater than 0, got {0}")]
    InvalidMaxSize(u64),

    #[error("chunk_size must be between 1 and {max} bytes, got {got}")]
    InvalidChunkSize { got: u64, max: u64 },

    #[error("log_level must be one of: trace, debug, info, warn, error; got {0}")]
    InvalidLogLevel(String),
}

/// Valid log level values for tracing configuration.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Main configuration structure for the Shelf client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    /// General client configuration.
    pub client: ClientConfig,

    /// Storage platform coordinates.
    pub platform: PlatformConfig,

    /// Login settings.
    pub auth: AuthConfig,

    /// Upload limits.
    pub upload: UploadConfig,
}

/// General client configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    /// Directory for client data (logs).
    pub data_dir: PathBuf,

    /// Logging level (trace, debug, info, warn, error).
    pub log_level: String,
}

/// Storage platform coordinates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlatformConfig {
    /// Base URL of the platform REST API, including the version path.
    pub endpoint: String,

    /// Project the bucket belongs to.
    pub project_id: String,

    /// The single bucket this client manages.
    pub bucket_id: String,
}

/// Login settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AuthConfig {
    /// OAuth provider name.
    pub oauth_provider: String,

    /// Where the platform redirects after a successful OAuth login.
    pub oauth_success_url: String,

    /// Where the platform redirects after a failed OAuth login.
    pub oauth_failure_url: String,
}

/// Upload limits.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UploadConfig {
    /// Maximum size of a single file in bytes (default: 100MB).
    pub max_size: u64,

    /// Size of each chunk for large uploads in bytes.
    pub chunk_size: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: "info".to_string(),
        }
    }
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            project_id: String::new(),
            bucket_id: String::new(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            oauth_provider: DEFAULT_OAUTH_PROVIDER.to_string(),
            oauth_success_url: "http://localhost:3000".to_string(),
            oauth_failure_url: "http://localhost:3000/login".to_string(),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_size: 100 * 1024 * 1024, // 100MB
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Returns the default configuration file path.
pub fn default_config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("shelf")
        .join("config.toml")
}

/// Returns the default data directory path.
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("shelf")
}

impl Config {
    /// Apply environment variable overrides to the configuration.
    ///
    /// Environment variables take precedence over config file values.
    /// Supported variables:
    /// - SHELF_ENDPOINT: Override platform endpoint
    /// - SHELF_PROJECT_ID: Override project ID
    /// - SHELF_BUCKET_ID: Override bucket ID
    /// - SHELF_LOG_LEVEL: Override log level (trace, debug, info, warn, error)
    pub fn apply_env_overrides(&mut self) {
        let overrides: [(&str, &mut String); 4] = [
            ("SHELF_ENDPOINT", &mut self.platform.endpoint),
            ("SHELF_PROJECT_ID", &mut self.platform.project_id),
            ("SHELF_BUCKET_ID", &mut self.platform.bucket_id),
            ("SHELF_LOG_LEVEL", &mut self.client.log_level),
        ];

        for (var, field) in overrides {
            if let Ok(value) = std::env::var(var) {
                if !value.is_empty() {
                    tracing::info!("Overriding {} from environment: {}", var, value);
                    *field = value;
                }
            }
        }
    }

    /// Validate the configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let endpoint = &self.platform.endpoint;
        if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
            return Err(ConfigError::InvalidEndpoint(endpoint.clone()));
        }

        if self.platform.project_id.trim().is_empty() {
            return Err(ConfigError::MissingProjectId);
        }

        if self.platform.bucket_id.trim().is_empty() {
            return Err(ConfigError::MissingBucketId);
        }

        if self.upload.max_size == 0 {
            return Err(ConfigError::InvalidMaxSize(self.upload.max_size));
        }

        if self.upload.chunk_size == 0 || self.upload.chunk_size > DEFAULT_CHUNK_SIZE {
            return Err(ConfigError::InvalidChunkSize {
                got: self.upload.chunk_size,
                max: DEFAULT_CHUNK_SIZE,
            });
        }

        let level = self.client.log_level.to_lowercase();
        if !VALID_LOG_LEVELS.contains(&level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(self.client.log_level.clone()));
        }

        Ok(())
    }

    /// Load configuration from a file.
    ///
    /// If the file does not exist, returns the default configuration.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::debug!("Config file not found at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        Self::from_toml(&contents)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Load configuration from the default path.
    pub fn load_default() -> Result<Self> {
        Self::load(default_config_path())
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str)
            .map_err(|e| anyhow::anyhow!("Invalid TOML configuration: {}", format_toml_error(&e)))
    }

    /// Save configuration to a file.
    ///
    /// Creates parent directories if they don't exist.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        let contents = self.to_toml()?;
        fs::write(path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::debug!("Configuration saved to {:?}", path);
        Ok(())
    }

    /// Serialize configuration to a TOML string.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration to TOML")
    }

    /// Directory for rolling log files.
    pub fn log_dir(&self) -> PathBuf {
        self.client.data_dir.join("logs")
    }
}

/// Format a TOML deserialization error for user-friendly display.
fn format_toml_error(error: &toml::de::Error) -> String {
    let mut msg = error.message().to_string();

    if let Some(span) = error.span() {
        msg.push_str(&format!(" (at position {}..{})", span.start, span.end));
    }

    msg
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    fn valid_config() -> Config {
        let mut config = Config::default();
        config.platform.project_id = "proj".to_string();
        config.platform.bucket_id = "bucket".to_string();
        config
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.client.log_level, "info");
        assert_eq!(config.platform.endpoint, DEFAULT_ENDPOINT);
        assert!(config.platform.project_id.is_empty());
        assert_eq!(config.auth.oauth_provider, "google");
        assert_eq!(config.upload.max_size, 100 * 1024 * 1024);
        assert_eq!(config.upload.chunk_size, DEFAULT_CHUNK_SIZE);
    }

    #[test]
    fn test_default_data_dir() {
        let config = ClientConfig::default();
        assert!(config.data_dir.to_string_lossy().contains("shelf"));
    }

    #[test]
    fn test_from_toml_empty() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_from_toml_partial() {
        let toml = r#"
[platform]
project_id = "68c1346300150f2e3683"
bucket_id = "68c134880025ebc4944a"
"#;
        let config = Config::from_toml(toml).unwrap();

        assert_eq!(config.platform.project_id, "68c1346300150f2e3683");
        assert_eq!(config.platform.bucket_id, "68c134880025ebc4944a");
        assert_eq!(config.platform.endpoint, DEFAULT_ENDPOINT);
        assert_eq!(config.client.log_level, "info");
    }

    #[test]
    fn test_from_toml_full() {
        let toml = r#"
[client]
data_dir = "/custom/data"
log_level = "trace"

[platform]
endpoint = "https://fra.cloud.appwrite.io/v1"
project_id = "p"
bucket_id = "b"

[auth]
oauth_provider = "github"
oauth_success_url = "https://files.example.com"
oauth_failure_url = "https://files.example.com/login"

[upload]
max_size = 52428800
chunk_size = 1048576
"#;
        let config = Config::from_toml(toml).unwrap();

        assert_eq!(config.client.data_dir, PathBuf::from("/custom/data"));
        assert_eq!(config.client.log_level, "trace");
        assert_eq!(config.platform.endpoint, "https://fra.cloud.appwrite.io/v1");
        assert_eq!(config.auth.oauth_provider, "github");
        assert_eq!(config.auth.oauth_failure_url, "https://files.example.com/login");
        assert_eq!(config.upload.max_size, 52428800);
        assert_eq!(config.upload.chunk_size, 1048576);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml_invalid_syntax() {
        let result = Config::from_toml("[client\nlog_level = \"debug\"");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Invalid TOML"));
    }

    #[test]
    fn test_from_toml_wrong_type() {
        let toml = r#"
[upload]
max_size = "big"
"#;
        assert!(Config::from_toml(toml).is_err());
    }

    #[test]
    fn test_roundtrip_custom() {
        let mut original = valid_config();
        original.client.log_level = "warn".to_string();
        original.auth.oauth_provider = "github".to_string();

        let toml = original.to_toml().unwrap();
        assert!(toml.contains("[platform]"));
        assert_eq!(Config::from_toml(&toml).unwrap(), original);
    }

    #[test]
    fn test_load_missing_file() {
        let config = Config::load("/nonexistent/path/config.toml").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.toml");

        let original = valid_config();
        original.save(&config_path).unwrap();
        let loaded = Config::load(&config_path).unwrap();

        assert_eq!(original, loaded);
    }

    #[test]
    fn test_load_invalid_file() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        fs::write(&config_path, "invalid [ toml").unwrap();

        let err = Config::load(&config_path).unwrap_err().to_string();
        assert!(err.contains("Failed to parse config file"));
    }

    #[test]
    fn test_default_config_path() {
        let path = default_config_path();
        assert!(path.to_string_lossy().contains("shelf"));
        assert!(path.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn test_validate_ok() {
        assert!(valid_config().validate().is_ok());
    }

    #[test]
    fn test_validate_missing_ids() {
        let config = Config::default();
        assert_eq!(config.validate(), Err(ConfigError::MissingProjectId));

        let mut config = Config::default();
        config.platform.project_id = "p".to_string();
        assert_eq!(config.validate(), Err(ConfigError::MissingBucketId));
    }

    #[test]
    fn test_validate_endpoint() {
        let mut config = valid_config();
        config.platform.endpoint = "ftp://example.com".to_string();
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidEndpoint("ftp://example.com".to_string()))
        );
    }

    #[test]
    fn test_validate_sizes() {
        let mut config = valid_config();
        config.upload.max_size = 0;
        assert_eq!(config.validate(), Err(ConfigError::InvalidMaxSize(0)));

        let mut config = valid_config();
        config.upload.chunk_size = DEFAULT_CHUNK_SIZE + 1;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidChunkSize { .. })
        ));
    }

    #[test]
    fn test_validate_log_level() {
        let mut config = valid_config();
        config.client.log_level = "DEBUG".to_string();
        assert!(config.validate().is_ok());

        config.client.log_level = "verbose".to_string();
        assert_eq!(
            config.validate(),
            Err(ConfigError::InvalidLogLevel("verbose".to_string()))
        );
    }

    #[test]
    #[serial]
    fn test_env_overrides() {
        std::env::set_var("SHELF_BUCKET_ID", "from-env");
        std::env::set_var("SHELF_LOG_LEVEL", "debug");

        let mut config = valid_config();
        config.apply_env_overrides();

        std::env::remove_var("SHELF_BUCKET_ID");
        std::env::remove_var("SHELF_LOG_LEVEL");

        assert_eq!(config.platform.bucket_id, "from-env");
        assert_eq!(config.client.log_level, "debug");
        assert_eq!(config.platform.project_id, "proj");
    }

    #[test]
    #[serial]
    fn test_empty_env_override_ignored() {
        std::env::set_var("SHELF_PROJECT_ID", "");

        let mut config = valid_config();
        config.apply_env_overrides();

        std::env::remove_var("SHELF_PROJECT_ID");

        assert_eq!(config.platform.project_id, "proj");
    }

    #[test]
    fn test_log_dir() {
        let mut config = Config::default();
        config.client.data_dir = PathBuf::from("/data/shelf");
        assert_eq!(config.log_dir(), PathBuf::from("/data/shelf/logs"));
    }
}
