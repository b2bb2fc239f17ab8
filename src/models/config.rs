//! Application configuration structures.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Rule deciding which lookup results are accepted into the report
    #[serde(default)]
    pub acceptance: AcceptancePolicy,

    /// HTTP and scraping behavior settings
    #[serde(default)]
    pub tracker: TrackerConfig,

    /// Retry queue settings
    #[serde(default)]
    pub retry: RetryConfig,

    /// State and report file locations, relative to the storage directory
    #[serde(default)]
    pub paths: PathsConfig,

    /// Monitored ports
    #[serde(default)]
    pub ports: Vec<PortInfo>,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.tracker.base_url.trim().is_empty() {
            return Err(AppError::validation("tracker.base_url is empty"));
        }
        url::Url::parse(&self.tracker.base_url)?;
        if self.tracker.user_agent.trim().is_empty() {
            return Err(AppError::validation("tracker.user_agent is empty"));
        }
        if self.tracker.timeout_secs == 0 {
            return Err(AppError::validation("tracker.timeout_secs must be > 0"));
        }
        if self.retry.ceiling == 0 {
            return Err(AppError::validation("retry.ceiling must be > 0"));
        }

        let mut seen = HashSet::new();
        for port in &self.ports {
            if port.name.trim().is_empty() {
                return Err(AppError::validation(format!(
                    "port {} has an empty name",
                    port.id
                )));
            }
            if !seen.insert(port.id) {
                return Err(AppError::validation(format!(
                    "port id {} is listed more than once",
                    port.id
                )));
            }
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            acceptance: AcceptancePolicy::default(),
            tracker: TrackerConfig::default(),
            retry: RetryConfig::default(),
            paths: PathsConfig::default(),
            ports: Vec::new(),
        }
    }
}

/// Which lookup results count as a usable departure record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcceptancePolicy {
    /// Accept any record with at least one populated field
    #[default]
    AnyField,
    /// Additionally require the scraped departure port to match the
    /// reference port (case-insensitive containment)
    MatchReferencePort,
}

/// HTTP client and scraping behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Root URL of the ship-tracking site
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Per-lookup timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Pause after each vessel page request, in milliseconds
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,

    /// Pause after each port page, in milliseconds
    #[serde(default = "defaults::port_delay")]
    pub port_delay_ms: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::base_url(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            request_delay_ms: defaults::request_delay(),
            port_delay_ms: defaults::port_delay(),
        }
    }
}

/// Retry queue settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Attempts after which a vessel is no longer considered for departure
    #[serde(default = "defaults::retry_ceiling")]
    pub ceiling: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            ceiling: defaults::retry_ceiling(),
        }
    }
}

/// File locations, relative to the storage directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "defaults::current_snapshot")]
    pub current_snapshot: String,

    #[serde(default = "defaults::previous_snapshot")]
    pub previous_snapshot: String,

    /// Directory receiving one archived snapshot per rotation
    #[serde(default = "defaults::history_dir")]
    pub history_dir: String,

    #[serde(default = "defaults::master_report")]
    pub master_report: String,

    #[serde(default = "defaults::lock_file")]
    pub lock_file: String,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            current_snapshot: defaults::current_snapshot(),
            previous_snapshot: defaults::previous_snapshot(),
            history_dir: defaults::history_dir(),
            master_report: defaults::master_report(),
            lock_file: defaults::lock_file(),
        }
    }
}

/// A monitored port.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PortInfo {
    /// Display name, recorded as the vessel's reference port
    pub name: String,

    /// Port id on the tracking site
    pub id: u64,
}

mod defaults {
    // Tracker defaults
    pub fn base_url() -> String {
        "https://www.myshiptracking.com".into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; vessel-tracker/0.1)".into()
    }
    pub fn timeout() -> u64 {
        15
    }
    pub fn request_delay() -> u64 {
        1000
    }
    pub fn port_delay() -> u64 {
        200
    }

    // Retry defaults
    pub fn retry_ceiling() -> u32 {
        6
    }

    // Path defaults
    pub fn current_snapshot() -> String {
        "state/current.json".into()
    }
    pub fn previous_snapshot() -> String {
        "state/previous.json".into()
    }
    pub fn history_dir() -> String {
        "state/history".into()
    }
    pub fn master_report() -> String {
        "reports/master.json".into()
    }
    pub fn lock_file() -> String {
        "tracker.lock".into()
    }
}
