//! Configuration file parser for the daemon.
//!
//! The config file is optional — a missing file yields `Config::default()`.
//! Unknown keys are silently ignored by serde, though we log a warning when
//! the file contains potential typos.
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

use crate::model::SchedulingPolicy;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Configuration Struct
// ============================================================================

/// Daemon configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
/// Missing keys fall back to `Default::default()`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite database path.
    pub database_path: String,

    /// Minutes between scheduler ticks.
    pub polling_frequency_minutes: u64,

    /// Maximum number of due feeds pulled per tick.
    pub batch_size: i64,

    /// Number of refresh workers.
    pub worker_pool_size: usize,

    /// Next-check policy: "fixed" or "entry_frequency".
    pub polling_scheduler: String,

    /// Interval for the fixed policy, in minutes.
    pub polling_interval_minutes: i64,

    /// Bounds for the entry-frequency policy, in minutes.
    pub scheduler_min_interval_minutes: i64,
    pub scheduler_max_interval_minutes: i64,

    /// HTTP fetch timeout in seconds.
    pub http_client_timeout_secs: u64,

    /// Proxy used by feeds with the fetch-via-proxy flag.
    pub proxy_url: Option<String>,

    /// Hours between housekeeping runs.
    pub cleanup_frequency_hours: u64,

    /// Read entries older than this many days get archived.
    pub archive_read_days: i64,

    /// Unread entries older than this many days get archived.
    pub archive_unread_days: i64,

    /// Maximum entries archived per housekeeping run and status.
    pub archive_batch_size: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: "weir.db".to_string(),
            polling_frequency_minutes: 60,
            batch_size: 100,
            worker_pool_size: 5,
            polling_scheduler: "fixed".to_string(),
            polling_interval_minutes: 60,
            scheduler_min_interval_minutes: 5,
            scheduler_max_interval_minutes: 24 * 60,
            http_client_timeout_secs: 30,
            proxy_url: None,
            cleanup_frequency_hours: 24,
            archive_read_days: 60,
            archive_unread_days: 180,
            archive_batch_size: 10_000,
        }
    }
}

impl Config {
    /// Maximum config file size (1 MB); a config bigger than this is a
    /// corrupted or hostile file, not a configuration.
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: &'static [&'static str] = &[
        "database_path",
        "polling_frequency_minutes",
        "batch_size",
        "worker_pool_size",
        "polling_scheduler",
        "polling_interval_minutes",
        "scheduler_min_interval_minutes",
        "scheduler_max_interval_minutes",
        "http_client_timeout_secs",
        "proxy_url",
        "cleanup_frequency_hours",
        "archive_read_days",
        "archive_unread_days",
        "archive_batch_size",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → silently accepted, logged as warning
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// The scheduling policy the refresh path evaluates per feed.
    pub fn scheduling_policy(&self) -> SchedulingPolicy {
        match self.polling_scheduler.as_str() {
            "entry_frequency" => SchedulingPolicy::EntryFrequency {
                min_interval_minutes: self.scheduler_min_interval_minutes,
                max_interval_minutes: self.scheduler_max_interval_minutes,
            },
            _ => SchedulingPolicy::Fixed {
                interval_minutes: self.polling_interval_minutes,
            },
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
