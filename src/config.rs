//! Configuration for the aggregation engine
//!
//! Provides the aggregator tunables with TOML file support and sensible
//! defaults.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Aggregator configuration
///
/// # Example
///
/// ```rust
/// use loadwatch::config::AggregatorConfig;
///
/// let config = AggregatorConfig {
///     num_windows: 20,
///     window_ms: 1000,
///     min_samples_per_window: 4,
///     ..AggregatorConfig::default()
/// };
/// assert!(config.validate().is_ok());
/// assert_eq!(config.min_samples_for_extrapolation(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatorConfig {
    /// Number of windows reported by an aggregation
    #[serde(default = "default_num_windows")]
    pub num_windows: usize,

    /// Window width in milliseconds
    #[serde(default = "default_window_ms")]
    pub window_ms: i64,

    /// Samples required for a window value to count as fully observed
    #[serde(default = "default_min_samples_per_window")]
    pub min_samples_per_window: u64,

    /// Spare windows retained beyond the reportable ones, kept as donors for
    /// previous-period extrapolation
    #[serde(default)]
    pub max_extra_windows: usize,

    /// Bound on the number of cached completeness results
    #[serde(default = "default_completeness_cache_size")]
    pub completeness_cache_size: usize,
}

fn default_num_windows() -> usize {
    20
}
fn default_window_ms() -> i64 {
    60_000
}
fn default_min_samples_per_window() -> u64 {
    4
}
fn default_completeness_cache_size() -> usize {
    5
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            num_windows: default_num_windows(),
            window_ms: default_window_ms(),
            min_samples_per_window: default_min_samples_per_window(),
            max_extra_windows: 0,
            completeness_cache_size: default_completeness_cache_size(),
        }
    }
}

impl AggregatorConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::Configuration(format!("Failed to read config file {}: {}", path, e))
        })?;

        let config: Self = toml::from_str(&contents).map_err(|e| {
            Error::Configuration(format!("Failed to parse config file {}: {}", path, e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.num_windows == 0 {
            return Err(Error::Configuration(
                "num_windows must be > 0".to_string(),
            ));
        }
        if self.window_ms <= 0 {
            return Err(Error::Configuration("window_ms must be > 0".to_string()));
        }
        if self.min_samples_per_window == 0 {
            return Err(Error::Configuration(
                "min_samples_per_window must be > 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Samples required before a partially observed window may stand in for a
    /// fully observed one
    pub fn min_samples_for_extrapolation(&self) -> u64 {
        self.min_samples_per_window / 2
    }

    /// Maximum number of windows retained in the store: the reportable
    /// windows, the spare donor windows, and the active window
    pub fn num_windows_to_keep(&self) -> usize {
        self.num_windows + self.max_extra_windows + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AggregatorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.num_windows, 20);
        assert_eq!(config.completeness_cache_size, 5);
    }

    #[test]
    fn test_derived_values() {
        let config = AggregatorConfig {
            num_windows: 20,
            window_ms: 1000,
            min_samples_per_window: 5,
            max_extra_windows: 3,
            ..AggregatorConfig::default()
        };
        assert_eq!(config.min_samples_for_extrapolation(), 2);
        assert_eq!(config.num_windows_to_keep(), 24);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = AggregatorConfig::default();
        config.num_windows = 0;
        assert!(config.validate().is_err());

        let mut config = AggregatorConfig::default();
        config.window_ms = 0;
        assert!(config.validate().is_err());

        let mut config = AggregatorConfig::default();
        config.min_samples_per_window = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_from_toml() {
        let parsed: AggregatorConfig = toml::from_str(
            "num_windows = 10\nwindow_ms = 500\nmin_samples_per_window = 2\n",
        )
        .unwrap();
        assert_eq!(parsed.num_windows, 10);
        assert_eq!(parsed.window_ms, 500);
        // Unset fields fall back to defaults
        assert_eq!(parsed.max_extra_windows, 0);
        assert_eq!(parsed.completeness_cache_size, 5);
    }
}
