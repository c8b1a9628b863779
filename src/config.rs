//! Configuration management for the chart engine
//!
//! Configuration is read from TOML, every field has a default, and a small set
//! of environment variables can override the file.

use crate::error::{Error, Result, ValidationError};
use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ChartConfig {
    /// Engine behaviour (sampling, fallback window, guards)
    #[serde(default)]
    pub engine: EngineConfig,

    /// Output defaults applied when a request carries no options
    #[serde(default)]
    pub output: OutputConfig,

    /// Logging
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Engine configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineConfig {
    /// Number of rows scanned (across all series) when inferring the range
    #[serde(default = "default_sample_limit")]
    pub sample_limit: usize,

    /// Length of the trailing fallback window in days
    #[serde(default = "default_window_days")]
    pub default_window_days: u32,

    /// Upper bound on generated buckets per request
    #[serde(default = "default_max_buckets")]
    pub max_buckets: usize,

    /// Time fields tried in order when a request names none
    #[serde(default = "default_time_field_candidates")]
    pub time_field_candidates: Vec<String>,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    /// Report empty buckets as `fill_value` instead of null
    #[serde(default = "default_true")]
    pub zero_fill: bool,

    /// Value used for empty buckets when zero-filling
    #[serde(default)]
    pub fill_value: f64,

    /// Pretty-print JSON output in the CLI
    #[serde(default)]
    pub pretty: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// Default value functions
fn default_sample_limit() -> usize { 1000 }
fn default_window_days() -> u32 { 30 }
fn default_max_buckets() -> usize { 50_000 }
fn default_time_field_candidates() -> Vec<String> {
    vec!["createdAt".to_string(), "date".to_string()]
}
fn default_log_level() -> String { "info".to_string() }
fn default_true() -> bool { true }

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_limit: default_sample_limit(),
            default_window_days: default_window_days(),
            max_buckets: default_max_buckets(),
            time_field_candidates: default_time_field_candidates(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            zero_fill: true,
            fill_value: 0.0,
            pretty: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

impl ChartConfig {
    /// Load configuration from TOML file
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("Failed to read config file {}: {}", path, e))
        })?;

        toml::from_str(&contents).map_err(|e| {
            Error::Configuration(format!("Failed to parse config file {}: {}", path, e))
        })
    }

    /// Load configuration with environment variable overrides
    pub fn from_file_with_env(path: &str) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from environment variables only
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env_overrides();
        config
    }

    /// Apply environment variable overrides
    ///
    /// Unparseable values are ignored and the existing setting is kept.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("CHART_SAMPLE_LIMIT") {
            if let Ok(n) = v.parse() {
                self.engine.sample_limit = n;
            }
        }
        if let Ok(v) = std::env::var("CHART_DEFAULT_WINDOW_DAYS") {
            if let Ok(n) = v.parse() {
                self.engine.default_window_days = n;
            }
        }
        if let Ok(v) = std::env::var("CHART_MAX_BUCKETS") {
            if let Ok(n) = v.parse() {
                self.engine.max_buckets = n;
            }
        }
        if let Ok(v) = std::env::var("CHART_ZERO_FILL") {
            if let Ok(b) = v.parse() {
                self.output.zero_fill = b;
            }
        }
        if let Ok(level) = std::env::var("RUST_LOG") {
            self.logging.log_level = level;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.engine.sample_limit == 0 {
            return Err(
                out_of_range("engine.sample_limit", self.engine.sample_limit, 1, usize::MAX).into(),
            );
        }

        if self.engine.default_window_days == 0 || self.engine.default_window_days > 3660 {
            let days = self.engine.default_window_days;
            return Err(out_of_range("engine.default_window_days", days, 1, 3660).into());
        }

        if self.engine.max_buckets == 0 {
            return Err(
                out_of_range("engine.max_buckets", self.engine.max_buckets, 1, usize::MAX).into(),
            );
        }

        if self.engine.time_field_candidates.is_empty() {
            return Err(
                ValidationError::MissingField("engine.time_field_candidates".to_string()).into(),
            );
        }
        if self.engine.time_field_candidates.iter().any(|f| f.trim().is_empty()) {
            return Err(ValidationError::InvalidFormat {
                field: "engine.time_field_candidates".to_string(),
                message: "field names cannot be empty".to_string(),
            }
            .into());
        }

        if !self.output.fill_value.is_finite() {
            return Err(ValidationError::InvalidFormat {
                field: "output.fill_value".to_string(),
                message: "must be a finite number".to_string(),
            }
            .into());
        }

        Ok(())
    }

    /// Save configuration to TOML file
    pub fn save_to_file(&self, path: &str) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Serialization(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, contents).map_err(|e| {
            Error::Configuration(format!("Failed to write config file {}: {}", path, e))
        })
    }
}

fn out_of_range<T: ToString>(field: &str, value: T, min: T, max: T) -> ValidationError {
    ValidationError::OutOfRange {
        field: field.to_string(),
        value: value.to_string(),
        min: min.to_string(),
        max: max.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ChartConfig::default();
        assert_eq!(config.engine.sample_limit, 1000);
        assert_eq!(config.engine.default_window_days, 30);
        assert_eq!(config.engine.time_field_candidates, vec!["createdAt", "date"]);
        assert!(config.output.zero_fill);
        assert_eq!(config.output.fill_value, 0.0);
    }

    #[test]
    fn test_config_validation() {
        let config = ChartConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_sample_limit() {
        let mut config = ChartConfig::default();
        config.engine.sample_limit = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_empty_time_field_rejected() {
        let mut config = ChartConfig::default();
        config.engine.time_field_candidates = vec!["createdAt".to_string(), " ".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: ChartConfig = toml::from_str(
            r#"
            [engine]
            sample_limit = 50

            [output]
            zero_fill = false
            "#,
        )
        .unwrap();
        assert_eq!(config.engine.sample_limit, 50);
        assert_eq!(config.engine.max_buckets, 50_000);
        assert!(!config.output.zero_fill);
        assert_eq!(config.logging.log_level, "info");
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chart.toml");
        let path = path.to_str().unwrap();

        let mut config = ChartConfig::default();
        config.engine.default_window_days = 7;
        config.save_to_file(path).unwrap();

        let loaded = ChartConfig::from_file(path).unwrap();
        assert_eq!(loaded.engine.default_window_days, 7);
    }

    #[test]
    fn test_missing_file_is_configuration_error() {
        let err = ChartConfig::from_file("/nonexistent/chart.toml").unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_env_override() {
        std::env::set_var("CHART_MAX_BUCKETS", "1234");
        let config = ChartConfig::from_env();
        assert_eq!(config.engine.max_buckets, 1234);
        std::env::remove_var("CHART_MAX_BUCKETS");
    }
}
