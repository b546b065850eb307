//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every field has a default, so an empty file (or no file at all) yields the
//! stock setup: poll the sample Racemap event every 90 seconds and write into
//! `./logs`.

use chrono::FixedOffset;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{RacemapLoggerError, Result};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub extract: ExtractConfig,
}

/// Tracker API configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_event_id")]
    pub event_id: String,

    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default)]
    pub interpolation: bool,

    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

/// Poll cadence and retry budget
#[derive(Debug, Deserialize, Clone)]
pub struct ScheduleConfig {
    #[serde(default = "default_period_s")]
    pub period_s: u64,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_retry_delay_s")]
    pub retry_delay_s: u64,
}

/// Where the per-starter logs go
#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    #[serde(default = "default_log_dir")]
    pub log_dir: String,
}

/// Record extraction settings
#[derive(Debug, Deserialize, Clone)]
pub struct ExtractConfig {
    /// Offset substituted for a trailing `Z` in tracker timestamps
    #[serde(default = "default_zulu_offset")]
    pub zulu_offset: String,
}

// Default value functions
fn default_base_url() -> String { "https://racemap.com/api/data/v1".to_string() }
fn default_event_id() -> String { "66bf4318d1c783279d183dd3".to_string() }
fn default_endpoint() -> String { "current".to_string() }
fn default_connect_timeout_ms() -> u64 { 5000 }
fn default_request_timeout_ms() -> u64 { 10000 }

fn default_period_s() -> u64 { 90 }
fn default_max_attempts() -> u32 { 10 }
fn default_retry_delay_s() -> u64 { 5 }

fn default_log_dir() -> String { "./logs".to_string() }

fn default_zulu_offset() -> String { "+01:00".to_string() }

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            event_id: default_event_id(),
            endpoint: default_endpoint(),
            interpolation: false,
            connect_timeout_ms: default_connect_timeout_ms(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            period_s: default_period_s(),
            max_attempts: default_max_attempts(),
            retry_delay_s: default_retry_delay_s(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { log_dir: default_log_dir() }
    }
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self { zulu_offset: default_zulu_offset() }
    }
}

impl ApiConfig {
    /// Full URL of the "current positions" endpoint
    ///
    /// # Examples
    ///
    /// ```
    /// use racemap_logger::config::ApiConfig;
    ///
    /// let api = ApiConfig::default();
    /// assert_eq!(
    ///     api.url(),
    ///     "https://racemap.com/api/data/v1/66bf4318d1c783279d183dd3/current?interpolation=false"
    /// );
    /// ```
    pub fn url(&self) -> String {
        format!(
            "{}/{}/{}?interpolation={}",
            self.base_url.trim_end_matches('/'),
            self.event_id,
            self.endpoint,
            self.interpolation
        )
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl ScheduleConfig {
    pub fn period(&self) -> Duration {
        Duration::from_secs(self.period_s)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_s)
    }
}

impl ExtractConfig {
    /// Parsed form of `zulu_offset`
    ///
    /// Only meaningful after [`Config::validate`] has accepted the value.
    pub fn offset(&self) -> Result<FixedOffset> {
        self.zulu_offset.parse::<FixedOffset>().map_err(|_| {
            RacemapLoggerError::Config(format!(
                "zulu_offset must look like +HH:MM or -HH:MM, got {:?}",
                self.zulu_offset
            ))
        })
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use racemap_logger::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the file if it exists, otherwise fall back to built-in defaults
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            let config = Self::default();
            config.validate()?;
            Ok(config)
        }
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("base_url", &self.api.base_url),
            ("event_id", &self.api.event_id),
            ("endpoint", &self.api.endpoint),
        ] {
            if value.is_empty() {
                return Err(RacemapLoggerError::Config(format!("{} cannot be empty", name)));
            }
        }

        for (name, value) in [
            ("connect_timeout_ms", self.api.connect_timeout_ms),
            ("request_timeout_ms", self.api.request_timeout_ms),
        ] {
            if value == 0 || value > 60000 {
                return Err(RacemapLoggerError::Config(format!(
                    "{} must be between 1 and 60000",
                    name
                )));
            }
        }

        if self.schedule.period_s == 0 || self.schedule.period_s > 86400 {
            return Err(RacemapLoggerError::Config(
                "period_s must be between 1 and 86400".to_string(),
            ));
        }

        if self.schedule.max_attempts == 0 || self.schedule.max_attempts > 100 {
            return Err(RacemapLoggerError::Config(
                "max_attempts must be between 1 and 100".to_string(),
            ));
        }

        if self.schedule.retry_delay_s > self.schedule.period_s {
            return Err(RacemapLoggerError::Config(
                "retry_delay_s cannot exceed period_s".to_string(),
            ));
        }

        if self.output.log_dir.is_empty() {
            return Err(RacemapLoggerError::Config("log_dir cannot be empty".to_string()));
        }

        self.extract.offset()?;

        Ok(())
    }
}
