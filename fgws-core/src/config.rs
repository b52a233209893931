//! Connection targets and application configuration.
//!
//! `ConnectionConfig` is the immutable value handed to a single `start`
//! call. `AppConfig` is the persisted TOML file the CLI reads defaults from.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::constants::{DEFAULT_PRESENTATION_DESCRIPTION, DEFAULT_PRESENTATION_TITLE};
use crate::error::{FwsError, FwsResult};
use crate::platform;

/// Display metadata shown by the keep-alive presenter.
///
/// Has no effect on connection behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Presentation {
    pub title: String,
    pub description: String,
}

impl Default for Presentation {
    fn default() -> Self {
        Self {
            title: DEFAULT_PRESENTATION_TITLE.to_string(),
            description: DEFAULT_PRESENTATION_DESCRIPTION.to_string(),
        }
    }
}

/// Target of a single session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Host name or IP address, without scheme.
    pub host: String,
    /// TCP port, valid range 1..=65535.
    pub port: u32,
    /// Use `wss` instead of `ws`.
    pub secure: bool,
    #[serde(default)]
    pub presentation: Presentation,
}

impl ConnectionConfig {
    /// Create a config with default presentation metadata.
    ///
    /// Surrounding whitespace is stripped from `host`.
    pub fn new(host: impl Into<String>, port: u32, secure: bool) -> Self {
        let host: String = host.into();
        Self {
            host: host.trim().to_string(),
            port,
            secure,
            presentation: Presentation::default(),
        }
    }

    /// Replace the presentation metadata.
    pub fn with_presentation(
        mut self,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        self.presentation = Presentation {
            title: title.into(),
            description: description.into(),
        };
        self
    }

    /// Check the fields `start` depends on.
    pub fn validate(&self) -> FwsResult<()> {
        if self.host.trim().is_empty() {
            return Err(FwsError::InvalidArgument("host is required".into()));
        }
        if self.port == 0 || self.port > u32::from(u16::MAX) {
            return Err(FwsError::InvalidArgument(format!(
                "port {} out of range 1-65535",
                self.port
            )));
        }
        Ok(())
    }

    /// URI scheme for this target.
    pub fn scheme(&self) -> &'static str {
        if self.secure {
            "wss"
        } else {
            "ws"
        }
    }

    /// Bare authority URI: no path, no query.
    pub fn url(&self) -> String {
        format!("{}://{}:{}", self.scheme(), self.host.trim(), self.port)
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Default connection target.
    #[serde(default)]
    pub connection: ConnectionSettings,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Keep-alive presentation settings.
    #[serde(default)]
    pub presentation: PresentationConfig,
}

/// Persisted default connection target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionSettings {
    #[serde(default)]
    pub host: String,

    #[serde(default)]
    pub port: u32,

    /// Use `wss` instead of `ws`.
    #[serde(default)]
    pub secure: bool,

    #[serde(default = "default_title")]
    pub title: String,

    #[serde(default = "default_description")]
    pub description: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for log files. If empty, uses default location.
    #[serde(default)]
    pub directory: String,

    /// Enable JSON structured logging output.
    #[serde(default)]
    pub json_output: bool,
}

/// Keep-alive presentation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresentationConfig {
    /// Show a desktop notification while a session is running.
    #[serde(default = "default_true")]
    pub desktop_notifications: bool,

    /// Raise a notification for every incoming message.
    #[serde(default)]
    pub wake_on_message: bool,
}

fn default_title() -> String {
    DEFAULT_PRESENTATION_TITLE.to_string()
}

fn default_description() -> String {
    DEFAULT_PRESENTATION_DESCRIPTION.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: 0,
            secure: false,
            title: default_title(),
            description: default_description(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            directory: String::new(),
            json_output: false,
        }
    }
}

impl Default for PresentationConfig {
    fn default() -> Self {
        Self {
            desktop_notifications: true,
            wake_on_message: false,
        }
    }
}

impl ConnectionSettings {
    /// Whether a host and port have been configured.
    pub fn is_configured(&self) -> bool {
        !self.host.trim().is_empty() && self.port != 0
    }

    /// Build the value passed to `SessionManager::start`.
    pub fn to_connection_config(&self) -> ConnectionConfig {
        ConnectionConfig::new(self.host.trim(), self.port, self.secure)
            .with_presentation(self.title.clone(), self.description.clone())
    }
}

impl AppConfig {
    /// Load configuration from the default config file path.
    pub fn load_default() -> FwsResult<Self> {
        let path = Self::default_config_path()?;
        if path.exists() {
            Self::load_from_file(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from_file(path: &Path) -> FwsResult<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Save configuration to the default config file path.
    pub fn save_default(&self) -> FwsResult<()> {
        let path = Self::default_config_path()?;
        self.save_to_file(&path)
    }

    /// Save configuration to a specific file path.
    pub fn save_to_file(&self, path: &Path) -> FwsResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = toml::to_string_pretty(self)
            .map_err(|e| FwsError::Config(format!("failed to serialize config: {e}")))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> FwsResult<PathBuf> {
        Ok(platform::config_dir()?.join("config.toml"))
    }

    /// Get the effective log directory, using the configured path or the default.
    pub fn effective_log_dir(&self) -> FwsResult<PathBuf> {
        if self.logging.directory.is_empty() {
            Ok(platform::data_dir()?.join("logs"))
        } else {
            Ok(PathBuf::from(&self.logging.directory))
        }
    }
}

/// Thread-safe configuration holder for shared access.
#[derive(Clone)]
pub struct ConfigHandle {
    inner: Arc<RwLock<AppConfig>>,
}

impl ConfigHandle {
    /// Create a new configuration handle.
    pub fn new(config: AppConfig) -> Self {
        Self {
            inner: Arc::new(RwLock::new(config)),
        }
    }

    /// Read the configuration.
    pub async fn read(&self) -> tokio::sync::RwLockReadGuard<'_, AppConfig> {
        self.inner.read().await
    }

    /// Write/update the configuration.
    pub async fn write(&self) -> tokio::sync::RwLockWriteGuard<'_, AppConfig> {
        self.inner.write().await
    }

    /// Save the current configuration to disk.
    pub async fn save(&self) -> FwsResult<()> {
        let config = self.inner.read().await;
        config.save_default()
    }
}
