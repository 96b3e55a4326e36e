//! Search limits, loaded from TOML with environment overrides.
//!
//! Defaults live in `config/proximity.toml`, baked in at compile time via
//! [`include_str!`].

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default config embedded at compile time.
const DEFAULT_TOML: &str = include_str!("../config/proximity.toml");

/// Overrides [`SearchConfig::max_radius_km`].
pub const MAX_RADIUS_ENV: &str = "PROXIMITY_MAX_RADIUS_KM";

/// Overrides [`SearchConfig::max_results`].
pub const MAX_RESULTS_ENV: &str = "PROXIMITY_MAX_RESULTS";

/// Overrides [`SearchConfig::query_timeout_ms`].
pub const QUERY_TIMEOUT_ENV: &str = "PROXIMITY_QUERY_TIMEOUT_MS";

/// Errors loading or validating a [`SearchConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read.
    #[error("Failed to read config {path}: {source}")]
    Io {
        /// File that failed.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },

    /// Config file is not valid TOML for [`SearchConfig`].
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// An environment override could not be parsed.
    #[error("Invalid value for {var}: '{value}'")]
    Env {
        /// Variable name.
        var: &'static str,
        /// Raw value.
        value: String,
    },

    /// A setting is out of range.
    #[error("Invalid {key}: {message}")]
    Invalid {
        /// Setting name.
        key: &'static str,
        /// Description of what went wrong.
        message: String,
    },
}

/// Limits applied by the search engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SearchConfig {
    /// Requested radii above this are clamped, in kilometers.
    pub max_radius_km: f64,
    /// Maximum number of results per search.
    pub max_results: usize,
    /// Timeout for each range query, in milliseconds.
    pub query_timeout_ms: u64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_radius_km: 50.0,
            max_results: 100,
            query_timeout_ms: 10_000,
        }
    }
}

impl SearchConfig {
    /// Parses the embedded defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the embedded TOML is invalid.
    pub fn embedded() -> Result<Self, ConfigError> {
        Self::from_toml(DEFAULT_TOML)
    }

    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the TOML is malformed or a value is out
    /// of range.
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::de::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads from `path` if given, otherwise the embedded defaults, then
    /// applies environment overrides.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed, or an
    /// override is invalid.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => {
                let contents =
                    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
                        path: path.display().to_string(),
                        source,
                    })?;
                log::debug!("Loading search config from {}", path.display());
                Self::from_toml(&contents)?
            }
            None => Self::embedded()?,
        };

        config.with_overrides(|var| std::env::var(var).ok())
    }

    /// Applies overrides looked up by variable name, then re-validates.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if an override does not parse or leaves a
    /// value out of range.
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(value) = lookup(MAX_RADIUS_ENV) {
            self.max_radius_km = parse_env(MAX_RADIUS_ENV, &value)?;
        }
        if let Some(value) = lookup(MAX_RESULTS_ENV) {
            self.max_results = parse_env(MAX_RESULTS_ENV, &value)?;
        }
        if let Some(value) = lookup(QUERY_TIMEOUT_ENV) {
            self.query_timeout_ms = parse_env(QUERY_TIMEOUT_ENV, &value)?;
        }
        self.validate()?;
        Ok(self)
    }

    /// Checks every limit is usable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.max_radius_km.is_finite() || self.max_radius_km <= 0.0 {
            return Err(ConfigError::Invalid {
                key: "max_radius_km",
                message: format!("must be a positive number, got {}", self.max_radius_km),
            });
        }
        if self.max_results == 0 {
            return Err(ConfigError::Invalid {
                key: "max_results",
                message: "must be at least 1".to_string(),
            });
        }
        if self.query_timeout_ms == 0 {
            return Err(ConfigError::Invalid {
                key: "query_timeout_ms",
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Per-query timeout.
    #[must_use]
    pub const fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }
}

fn parse_env<T: std::str::FromStr>(var: &'static str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::Env {
        var,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_matches_defaults() {
        assert_eq!(SearchConfig::embedded().unwrap(), SearchConfig::default());
    }

    #[test]
    fn overrides_replace_values() {
        let config = SearchConfig::default()
            .with_overrides(|var| match var {
                MAX_RADIUS_ENV => Some("25".to_string()),
                QUERY_TIMEOUT_ENV => Some(" 500 ".to_string()),
                _ => None,
            })
            .unwrap();
        assert!((config.max_radius_km - 25.0).abs() < f64::EPSILON);
        assert_eq!(config.max_results, 100);
        assert_eq!(config.query_timeout(), Duration::from_millis(500));
    }

    #[test]
    fn unparseable_override_is_rejected() {
        let err = SearchConfig::default()
            .with_overrides(|var| (var == MAX_RESULTS_ENV).then(|| "lots".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Env { var: MAX_RESULTS_ENV, .. }));
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let err = SearchConfig::from_toml(
            "max_radius_km = -1.0\nmax_results = 10\nquery_timeout_ms = 100\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "max_radius_km", .. }));

        let err = SearchConfig::default()
            .with_overrides(|var| (var == MAX_RESULTS_ENV).then(|| "0".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "max_results", .. }));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = SearchConfig::from_toml(
            "max_radius_km = 5.0\nmax_results = 10\nquery_timeout_ms = 100\nradius = 3\n",
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = SearchConfig::load(Some(Path::new("/nonexistent/proximity.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
