//! Bridge configuration.
//!
//! The listen endpoint, target system, vehicle uuid, API root, auth token,
//! and polling cycle are all TOML fields here. Each section implements `Default` so a missing file or a
//! partial file behaves predictably.
//!
//! ## Loading order
//!
//! 1. `FLEETLINK_CONFIG` environment variable (path to TOML file)
//! 2. `./fleetlink.toml` in the current working directory
//! 3. Built-in defaults

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Root configuration for one bridge deployment.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Inbound telemetry transport
    #[serde(default)]
    pub telemetry: TelemetryConfig,

    /// Fleet API endpoint and credentials
    #[serde(default)]
    pub api: ApiConfig,

    /// Flush policy tuning
    #[serde(default)]
    pub sync: SyncConfig,

    /// Device registry lifecycle
    #[serde(default)]
    pub fleet: FleetConfig,
}

/// Inbound transport settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// UDP listen endpoint for the telemetry stream
    #[serde(default = "defaults::listen")]
    pub listen: String,

    /// Protocol system id this bridge tracks; other systems are ignored
    #[serde(default = "defaults::target_system")]
    pub target_system: u8,

    /// Vehicle uuid reported to the fleet API for the tracked system
    #[serde(default = "defaults::vehicle_uuid")]
    pub vehicle_uuid: String,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            listen: defaults::listen(),
            target_system: defaults::target_system(),
            vehicle_uuid: defaults::vehicle_uuid(),
        }
    }
}

/// Fleet API settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API root, e.g. `https://fleet.example.com`
    #[serde(default = "defaults::api_root")]
    pub root: String,

    /// Bearer token, fixed per deployment
    #[serde(default = "defaults::auth_token")]
    pub auth_token: String,

    /// Origin header value sent on every request
    #[serde(default = "defaults::origin")]
    pub origin: String,

    /// Actor id recorded as `set_by` on every field update
    #[serde(default = "defaults::set_by")]
    pub set_by: u32,

    /// Request timeout; a hung remote must not stall ingestion forever
    #[serde(default = "defaults::timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            root: defaults::api_root(),
            auth_token: defaults::auth_token(),
            origin: defaults::origin(),
            set_by: defaults::set_by(),
            timeout_secs: defaults::timeout_secs(),
        }
    }
}

/// Flush policy settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Maximum seconds a non-priority dirty field may wait before reporting
    #[serde(default = "defaults::polling_cycle_secs")]
    pub polling_cycle_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            polling_cycle_secs: defaults::polling_cycle_secs(),
        }
    }
}

/// Registry lifecycle settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FleetConfig {
    /// Evict devices not seen for this many seconds. Unset = never evict.
    #[serde(default)]
    pub idle_eviction_secs: Option<u64>,
}

mod defaults {
    pub fn listen() -> String {
        "0.0.0.0:14550".to_string()
    }
    pub fn target_system() -> u8 {
        1
    }
    pub fn vehicle_uuid() -> String {
        "12345".to_string()
    }
    pub fn api_root() -> String {
        "http://localhost:8000".to_string()
    }
    pub fn auth_token() -> String {
        "12345".to_string()
    }
    pub fn origin() -> String {
        "http://localhost".to_string()
    }
    pub fn set_by() -> u32 {
        1234
    }
    pub fn timeout_secs() -> u64 {
        30
    }
    pub fn polling_cycle_secs() -> u64 {
        10
    }
}

impl BridgeConfig {
    /// Load configuration using the standard search order:
    /// 1. `FLEETLINK_CONFIG` environment variable
    /// 2. `./fleetlink.toml`
    /// 3. Built-in defaults
    pub fn load() -> Self {
        if let Ok(path) = std::env::var("FLEETLINK_CONFIG") {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded config from FLEETLINK_CONFIG");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from FLEETLINK_CONFIG, falling back");
                    }
                }
            } else {
                warn!(path = %path, "FLEETLINK_CONFIG points to non-existent file, falling back");
            }
        }

        let local = PathBuf::from("fleetlink.toml");
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded config from ./fleetlink.toml");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./fleetlink.toml, using defaults");
                }
            }
        }

        Self::default()
    }

    /// Load and parse a specific TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }
}

/// Configuration loading errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Read(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}
