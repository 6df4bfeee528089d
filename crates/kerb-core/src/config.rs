//! Configuration management for Kerb.
//!
//! Provides TOML-based configuration with XDG-compliant paths and
//! environment variable overrides.

use crate::error::{ConfigError, ConfigResult};
use crate::scan::ScanConfig;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Main application configuration.
///
/// This is loaded from `~/.config/kerb/config.toml` (or platform equivalent).
/// If the file doesn't exist, default values are used.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Default per-scan settings, used when a site supplies none
    pub scan: ScanConfig,
    /// Job queue and worker pool settings
    pub queue: QueueConfig,
    /// Browser automation settings
    pub browser: BrowserConfig,
    /// Compliance scoring weights
    pub score: ScoreConfig,
}

impl AppConfig {
    /// Load configuration from disk, falling back to defaults if not found.
    ///
    /// # Errors
    /// Returns error if:
    /// - Config directory cannot be determined
    /// - File exists but cannot be read
    /// - File contents are not valid TOML
    pub fn load() -> ConfigResult<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            tracing::debug!("Loading config from {}", config_path.display());
            let contents = fs::read_to_string(&config_path)?;
            let config = toml::from_str(&contents)?;
            Ok(config)
        } else {
            tracing::debug!("Config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration with environment variable overrides.
    ///
    /// Supports the following environment variables:
    /// - `KERB_MAX_PAGES`: Override the default page budget per scan
    /// - `KERB_MAX_DEPTH`: Override the default crawl depth
    /// - `KERB_WORKERS`: Override the default worker count
    /// - `KERB_HEADLESS`: Override browser headless mode (true/false)
    pub fn load_with_env() -> ConfigResult<Self> {
        let mut config = Self::load()?;

        // Override from environment
        if let Ok(val) = std::env::var("KERB_MAX_PAGES") {
            if let Ok(pages) = val.parse() {
                config.scan.max_pages = pages;
                tracing::debug!("Override scan.max_pages from env: {}", pages);
            }
        }

        if let Ok(val) = std::env::var("KERB_MAX_DEPTH") {
            if let Ok(depth) = val.parse() {
                config.scan.max_depth = depth;
                tracing::debug!("Override scan.max_depth from env: {}", depth);
            }
        }

        if let Ok(val) = std::env::var("KERB_WORKERS") {
            if let Ok(workers) = val.parse() {
                config.scan.concurrent_workers = workers;
                tracing::debug!("Override scan.concurrent_workers from env: {}", workers);
            }
        }

        if let Ok(val) = std::env::var("KERB_HEADLESS") {
            if let Ok(headless) = val.parse() {
                config.browser.headless = headless;
                tracing::debug!("Override browser.headless from env: {}", headless);
            }
        }

        Ok(config)
    }

    /// Save configuration to disk.
    ///
    /// Creates the config directory if it doesn't exist.
    pub fn save(&self) -> ConfigResult<()> {
        let config_path = Self::config_path()?;
        let config_dir = config_path
            .parent()
            .ok_or_else(|| ConfigError::InvalidValue {
                field: "config_path".to_string(),
                reason: "no parent directory".to_string(),
            })?;

        fs::create_dir_all(config_dir)?;
        tracing::debug!("Saving config to {}", config_path.display());

        let contents = toml::to_string_pretty(self)?;
        fs::write(config_path, contents)?;
        Ok(())
    }

    /// Get the path to the configuration file.
    ///
    /// Uses XDG base directories: `~/.config/kerb/config.toml`
    pub fn config_path() -> ConfigResult<PathBuf> {
        let dirs = ProjectDirs::from("org", "kerb-audit", "kerb").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Get the data directory path.
    ///
    /// Uses XDG base directories: `~/.local/share/kerb`
    pub fn data_dir() -> ConfigResult<PathBuf> {
        let dirs = ProjectDirs::from("org", "kerb-audit", "kerb").ok_or(ConfigError::NoConfigDir)?;
        Ok(dirs.data_dir().to_path_buf())
    }
}

/// Job queue and worker pool settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Maximum number of pending jobs before enqueue is rejected
    pub max_size: usize,
    /// Base retry backoff in seconds (delay = base * 2^attempt)
    pub backoff_base_secs: u64,
    /// Upper bound on the retry backoff in seconds
    pub backoff_cap_secs: u64,
    /// How long terminal jobs are retained before purging, in seconds
    pub retention_secs: u64,
    /// Interval between retention purges, in seconds
    pub purge_interval_secs: u64,
    /// Worker poll interval when the queue is empty, in milliseconds
    pub poll_interval_ms: u64,
    /// Timeout for a site-orchestration job (spans a whole scan), in seconds
    pub site_job_timeout_secs: u64,
    /// Grace period for in-flight jobs during pool shutdown, in seconds
    pub shutdown_grace_secs: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_size: 100,
            backoff_base_secs: 2,
            backoff_cap_secs: 60,
            retention_secs: 3600,
            purge_interval_secs: 300,
            poll_interval_ms: 100,
            site_job_timeout_secs: 3600,
            shutdown_grace_secs: 30,
        }
    }
}

/// Browser automation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Run browser in headless mode
    pub headless: bool,
    /// Browser window width
    pub window_width: u32,
    /// Browser window height
    pub window_height: u32,
    /// Navigation timeout in seconds
    pub navigation_timeout_secs: u64,
    /// User agent string sent with every request
    pub user_agent: String,
    /// Pick a randomized desktop user agent and viewport per engine launch
    pub randomize_fingerprint: bool,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: true,
            window_width: 1920,
            window_height: 1080,
            navigation_timeout_secs: 30,
            user_agent: "Kerb/0.1.0 (+https://github.com/kerb-audit/kerb)".to_string(),
            randomize_fingerprint: false,
        }
    }
}

/// Compliance scoring weights.
///
/// The defaults are the published constants; deployments that weigh rules
/// differently override them here. Relative ordering is what matters, not
/// the absolute numbers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoreConfig {
    /// Penalty weight for critical findings
    pub critical_weight: f64,
    /// Penalty weight for serious findings
    pub serious_weight: f64,
    /// Penalty weight for moderate findings
    pub moderate_weight: f64,
    /// Penalty weight for minor findings
    pub minor_weight: f64,
    /// Multiplier for level A rules
    pub level_a_weight: f64,
    /// Multiplier for level AA rules
    pub level_aa_weight: f64,
    /// Multiplier for level AAA rules
    pub level_aaa_weight: f64,
    /// Penalty budget granted per scanned page before the score hits 0
    pub baseline_per_page: f64,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            critical_weight: 10.0,
            serious_weight: 5.0,
            moderate_weight: 2.0,
            minor_weight: 1.0,
            level_a_weight: 3.0,
            level_aa_weight: 2.0,
            level_aaa_weight: 1.0,
            baseline_per_page: 100.0,
        }
    }
}
