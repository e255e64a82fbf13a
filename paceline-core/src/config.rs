//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/paceline/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/paceline/` (~/.config/paceline/)
//! - State/Logs: `$XDG_STATE_HOME/paceline/` (~/.local/state/paceline/)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Analytics window defaults
    #[serde(default)]
    pub analytics: AnalyticsConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Default analysis windows for callers that do not supply one
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct AnalyticsConfig {
    /// Default window for task analytics, in days
    #[serde(default = "default_task_window_days")]
    pub task_window_days: i64,

    /// Default window for velocity and trend analysis, in days
    #[serde(default = "default_trend_window_days")]
    pub trend_window_days: i64,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            task_window_days: default_task_window_days(),
            trend_window_days: default_trend_window_days(),
        }
    }
}

fn default_task_window_days() -> i64 {
    7
}

fn default_trend_window_days() -> i64 {
    30
}

impl AnalyticsConfig {
    /// Validate configuration, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if self.task_window_days <= 0 {
            return Err(Error::Config(
                "analytics.task_window_days must be positive".to_string(),
            ));
        }
        if self.trend_window_days <= 0 {
            return Err(Error::Config(
                "analytics.trend_window_days must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Maximum number of log files to keep
    #[serde(default = "default_max_log_files")]
    pub max_files: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            max_files: default_max_log_files(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_log_files() -> usize {
    5
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.analytics.validate()?;

        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/paceline/config.toml` (~/.config/paceline/config.toml)
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("paceline").join("config.toml")
    }

    /// Returns the state directory path (for logs)
    ///
    /// `$XDG_STATE_HOME/paceline/` (~/.local/state/paceline/)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("paceline")
    }

    /// Returns the log file path
    ///
    /// `$XDG_STATE_HOME/paceline/paceline.log` (~/.local/state/paceline/paceline.log)
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("paceline.log")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.analytics.task_window_days, 7);
        assert_eq!(config.analytics.trend_window_days, 30);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[analytics]
task_window_days = 14
trend_window_days = 90

[logging]
level = "debug"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.analytics.task_window_days, 14);
        assert_eq!(config.analytics.trend_window_days, 90);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[analytics]\ntask_window_days = 3").unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.analytics.task_window_days, 3);
        // Unspecified fields fall back to defaults.
        assert_eq!(config.analytics.trend_window_days, 30);
    }

    #[test]
    fn test_invalid_window_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[analytics]\ntask_window_days = 0\n").unwrap();

        assert!(matches!(Config::load_from(&path), Err(Error::Config(_))));
    }
}
