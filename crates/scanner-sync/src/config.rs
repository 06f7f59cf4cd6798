//! # Scanner Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     SCANNER_SERVER_URL=http://192.168.1.20:5000                        │
//! │     SCANNER_DEVICE_ID=dock-scanner-2                                   │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/scanner-sync/scanner.toml (Linux)                        │
//! │     ~/Library/Application Support/com.scanner.scanner-sync/... (macOS) │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     5 s poll, 5 s reconnect interval, 3 reconnect attempts             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [device]
//! id = "dock-scanner-2"
//! name = "Dock 2"
//!
//! [server]
//! url = "http://192.168.1.20:5000"
//! connect_timeout_secs = 10
//! request_timeout_secs = 30
//!
//! [sync]
//! poll_interval_secs = 5
//! reconnect_interval_secs = 5
//! max_reconnect_attempts = 3
//! recent_limit = 20
//!
//! [storage]
//! database_path = "/var/lib/scanner/scanner.db"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use scanner_core::validation::validate_server_url;
use scanner_core::DEFAULT_RECENT_LIMIT;

use crate::error::{SyncError, SyncResult};

// =============================================================================
// Device Configuration
// =============================================================================

/// Identity sent with every scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Device identifier. Generated on first run if not provided.
    #[serde(default = "generate_device_id")]
    pub id: String,

    /// Human-readable device name.
    #[serde(default = "default_device_name")]
    pub name: String,
}

fn generate_device_id() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("scanner-{}", &id[..8])
}

fn default_device_name() -> String {
    "Handheld Scanner".to_string()
}

impl Default for DeviceConfig {
    fn default() -> Self {
        DeviceConfig {
            id: generate_device_id(),
            name: default_device_name(),
        }
    }
}

// =============================================================================
// Server Settings
// =============================================================================

/// Inventory server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Server to connect to when nothing has been saved yet.
    #[serde(default)]
    pub url: Option<String>,

    /// TCP connect timeout (seconds).
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Whole-request timeout (seconds).
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_connect_timeout() -> u64 {
    10
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            url: None,
            connect_timeout_secs: default_connect_timeout(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

// =============================================================================
// Sync Settings
// =============================================================================

/// Connectivity and polling behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Interval between progress polls (seconds).
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    /// Fixed wait before each reconnect attempt (seconds).
    #[serde(default = "default_reconnect_interval")]
    pub reconnect_interval_secs: u64,

    /// Reconnect attempts before giving up until the next trigger.
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,

    /// Records shown in the "recent" list.
    #[serde(default = "default_recent_limit")]
    pub recent_limit: u32,
}

fn default_poll_interval() -> u64 {
    5
}
fn default_reconnect_interval() -> u64 {
    5
}
fn default_max_reconnect_attempts() -> u32 {
    3
}
fn default_recent_limit() -> u32 {
    DEFAULT_RECENT_LIMIT
}

impl Default for SyncSettings {
    fn default() -> Self {
        SyncSettings {
            poll_interval_secs: default_poll_interval(),
            reconnect_interval_secs: default_reconnect_interval(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            recent_limit: default_recent_limit(),
        }
    }
}

// =============================================================================
// Storage Settings
// =============================================================================

/// Where the local record store lives.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageSettings {
    /// SQLite file. Defaults to the platform data directory.
    #[serde(default)]
    pub database_path: Option<PathBuf>,
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete scanner configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScannerConfig {
    #[serde(default)]
    pub device: DeviceConfig,

    #[serde(default)]
    pub server: ServerSettings,

    #[serde(default)]
    pub sync: SyncSettings,

    #[serde(default)]
    pub storage: StorageSettings,
}

impl ScannerConfig {
    /// Creates a new config with defaults and a generated device ID.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (scanner.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> SyncResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading scanner config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load scanner config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> SyncResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| SyncError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| SyncError::ConfigSaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| SyncError::ConfigSaveFailed(e.to_string()))?;

        info!(?path, "Scanner config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> SyncResult<()> {
        if self.device.id.trim().is_empty() {
            return Err(SyncError::MissingDeviceId);
        }

        if let Some(ref url) = self.server.url {
            validate_server_url(url)
                .map_err(|e| SyncError::InvalidConfig(format!("server.url: {e}")))?;
        }

        let non_zero = [
            ("server.connect_timeout_secs", self.server.connect_timeout_secs),
            ("server.request_timeout_secs", self.server.request_timeout_secs),
            ("sync.poll_interval_secs", self.sync.poll_interval_secs),
            ("sync.reconnect_interval_secs", self.sync.reconnect_interval_secs),
            ("sync.max_reconnect_attempts", u64::from(self.sync.max_reconnect_attempts)),
            ("sync.recent_limit", u64::from(self.sync.recent_limit)),
        ];
        for (field, value) in non_zero {
            if value == 0 {
                return Err(SyncError::InvalidConfig(format!(
                    "{field} must be greater than 0"
                )));
            }
        }

        Ok(())
    }

    /// Applies `SCANNER_*` environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("SCANNER_SERVER_URL") {
            debug!(url = %url, "Overriding server URL from environment");
            self.server.url = Some(url);
        }

        if let Some(id) = lookup("SCANNER_DEVICE_ID") {
            debug!(device_id = %id, "Overriding device ID from environment");
            self.device.id = id;
        }

        if let Some(path) = lookup("SCANNER_DB_PATH") {
            self.storage.database_path = Some(PathBuf::from(path));
        }

        parse_override(&lookup, "SCANNER_POLL_INTERVAL_SECS", &mut self.sync.poll_interval_secs);
        parse_override(
            &lookup,
            "SCANNER_RECONNECT_INTERVAL_SECS",
            &mut self.sync.reconnect_interval_secs,
        );
        parse_override(
            &lookup,
            "SCANNER_MAX_RECONNECT_ATTEMPTS",
            &mut self.sync.max_reconnect_attempts,
        );
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "scanner", "scanner-sync")
            .map(|dirs| dirs.config_dir().join("scanner.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Resolved database file: configured path, platform data dir, or `./scanner.db`.
    pub fn database_path(&self) -> PathBuf {
        if let Some(ref path) = self.storage.database_path {
            return path.clone();
        }
        directories::ProjectDirs::from("com", "scanner", "scanner-sync")
            .map(|dirs| dirs.data_dir().join("scanner.db"))
            .unwrap_or_else(|| PathBuf::from("scanner.db"))
    }

    pub fn device_id(&self) -> &str {
        &self.device.id
    }

    pub fn server_url(&self) -> Option<&str> {
        self.server.url.as_deref()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.sync.poll_interval_secs)
    }

    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_secs(self.sync.reconnect_interval_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.server.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.server.request_timeout_secs)
    }
}

fn parse_override<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
    target: &mut T,
) {
    if let Some(raw) = lookup(key) {
        match raw.parse::<T>() {
            Ok(value) => {
                debug!(key, value = %raw, "Overriding setting from environment");
                *target = value;
            }
            Err(_) => warn!(key, value = %raw, "Ignoring unparseable environment override"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = ScannerConfig::default();
        assert!(config.device.id.starts_with("scanner-"));
        assert_eq!(config.sync.poll_interval_secs, 5);
        assert_eq!(config.sync.reconnect_interval_secs, 5);
        assert_eq!(config.sync.max_reconnect_attempts, 3);
        assert_eq!(config.sync.recent_limit, 20);
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = ScannerConfig::default();

        config.device.id = "  ".to_string();
        assert!(matches!(config.validate(), Err(SyncError::MissingDeviceId)));

        config.device.id = "dock-1".to_string();
        config.sync.poll_interval_secs = 0;
        assert!(config.validate().is_err());

        config.sync.poll_interval_secs = 5;
        config.sync.max_reconnect_attempts = 0;
        assert!(config.validate().is_err());

        config.sync.max_reconnect_attempts = 3;
        config.server.url = Some("   ".to_string());
        assert!(config.validate().is_err());

        config.server.url = Some("192.168.1.20:5000".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("SCANNER_SERVER_URL", "http://10.0.0.2:5000"),
            ("SCANNER_DEVICE_ID", "dock-7"),
            ("SCANNER_POLL_INTERVAL_SECS", "2"),
            ("SCANNER_MAX_RECONNECT_ATTEMPTS", "not-a-number"),
            ("SCANNER_DB_PATH", "/tmp/scan.db"),
        ]
        .into_iter()
        .collect();

        let mut config = ScannerConfig::default();
        config.apply_overrides(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.server_url(), Some("http://10.0.0.2:5000"));
        assert_eq!(config.device_id(), "dock-7");
        assert_eq!(config.poll_interval(), Duration::from_secs(2));
        assert_eq!(config.sync.max_reconnect_attempts, 3);
        assert_eq!(config.database_path(), PathBuf::from("/tmp/scan.db"));
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: ScannerConfig = toml::from_str(
            r#"
            [device]
            id = "dock-3"

            [sync]
            poll_interval_secs = 10
            "#,
        )
        .unwrap();

        assert_eq!(config.device.id, "dock-3");
        assert_eq!(config.device.name, "Handheld Scanner");
        assert_eq!(config.sync.poll_interval_secs, 10);
        assert_eq!(config.sync.reconnect_interval_secs, 5);
        assert!(config.server.url.is_none());
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf").join("scanner.toml");

        let mut config = ScannerConfig::default();
        config.device.id = "dock-9".into();
        config.server.url = Some("http://inv.local".into());
        config.save(Some(path.clone())).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("[device]"));
        assert!(contents.contains("[sync]"));

        let loaded: ScannerConfig = toml::from_str(&contents).unwrap();
        assert_eq!(loaded.device.id, "dock-9");
        assert_eq!(loaded.server_url(), Some("http://inv.local"));
    }
}
