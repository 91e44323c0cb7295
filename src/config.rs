//! Engine configuration as operator-tunable TOML.
//!
//! Load with `EngineConfig::load()` which searches:
//! 1. `$VOYAGE_TRACEKIT_CONFIG`
//! 2. `./voyage_config.toml`
//! 3. Built-in defaults
//!
//! Every section is `#[serde(default)]`, so a partial file only overrides
//! the keys it names.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::consumption::{ReconcileOptions, ReconcileStrategy, RepairPolicy};
use crate::legs::CollapseRules;

pub const CONFIG_ENV_VAR: &str = "VOYAGE_TRACEKIT_CONFIG";
pub const LOCAL_CONFIG_FILE: &str = "voyage_config.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config I/O error ({}): {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config serialization error: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Config validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub reconciliation: ReconciliationConfig,

    #[serde(default)]
    pub jurisdiction: JurisdictionConfig,

    #[serde(default)]
    pub collapse: CollapseConfig,

    #[serde(default)]
    pub source: SourceConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconciliationConfig {
    pub strategy: ReconcileStrategy,
    pub repair: RepairPolicy,
    pub extreme_negative_threshold: f64,
}

impl Default for ReconciliationConfig {
    fn default() -> Self {
        let options = ReconcileOptions::default();
        Self {
            strategy: options.strategy,
            repair: options.repair,
            extreme_negative_threshold: options.extreme_negative_threshold,
        }
    }
}

impl ReconciliationConfig {
    pub fn options(&self) -> ReconcileOptions {
        ReconcileOptions {
            strategy: self.strategy,
            repair: self.repair,
            extreme_negative_threshold: self.extreme_negative_threshold,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JurisdictionConfig {
    /// When off, outermost regions are treated as mainland EU.
    pub include_omr: bool,
}

impl Default for JurisdictionConfig {
    fn default() -> Self {
        Self { include_omr: true }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CollapseConfig {
    pub container_keyword: String,
    pub container_excluded_ports: Vec<String>,
}

impl Default for CollapseConfig {
    fn default() -> Self {
        let rules = CollapseRules::default();
        Self {
            container_keyword: rules.container_keyword,
            container_excluded_ports: rules.container_excluded_ports,
        }
    }
}

impl CollapseConfig {
    pub fn rules(&self) -> CollapseRules {
        CollapseRules {
            container_keyword: self.container_keyword.clone(),
            container_excluded_ports: self.container_excluded_ports.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// chrono formats tried in order for `Phase End Date`. A date-only
    /// format parses to midnight.
    pub timestamp_formats: Vec<String>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            timestamp_formats: [
                "%Y-%m-%d %H:%M:%S",
                "%Y-%m-%d %H:%M:%S%.f",
                "%Y-%m-%dT%H:%M:%S",
                "%Y-%m-%dT%H:%M:%S%.f",
                "%Y-%m-%d %H:%M",
                "%Y-%m-%d",
            ]
            .iter()
            .map(|f| f.to_string())
            .collect(),
        }
    }
}

impl EngineConfig {
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded engine config from {CONFIG_ENV_VAR}");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load engine config, falling back");
                    }
                }
            } else {
                warn!(path = %path, "{CONFIG_ENV_VAR} points to a missing file, falling back");
            }
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded engine config from ./{LOCAL_CONFIG_FILE}");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{LOCAL_CONFIG_FILE}, using defaults");
                }
            }
        }

        info!("No engine config found, using built-in defaults");
        Self::default()
    }

    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();
        let threshold = self.reconciliation.extreme_negative_threshold;
        if !threshold.is_finite() || threshold > 0.0 {
            errors.push(format!(
                "reconciliation.extreme_negative_threshold must be a finite value <= 0, got {threshold}"
            ));
        }
        if self.source.timestamp_formats.is_empty() {
            errors.push("source.timestamp_formats must not be empty".to_string());
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_all_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.reconciliation.strategy, ReconcileStrategy::WindowSum);
        assert_eq!(config.reconciliation.repair, RepairPolicy::Disabled);
        assert!(config.jurisdiction.include_omr);
        assert_eq!(config.collapse.container_excluded_ports, vec!["MAPTM", "EGPSE"]);
    }

    #[test]
    fn partial_sections_override_named_keys_only() {
        let config = EngineConfig::from_toml_str(
            r#"
            [reconciliation]
            strategy = "shift"
            repair = "backward"

            [jurisdiction]
            include_omr = false
            "#,
        )
        .unwrap();
        let options = config.reconciliation.options();
        assert_eq!(options.strategy, ReconcileStrategy::Shift);
        assert_eq!(options.repair, RepairPolicy::Backward);
        assert_eq!(options.extreme_negative_threshold, -1000.0);
        assert!(!config.jurisdiction.include_omr);
        assert_eq!(config.collapse.rules().container_keyword, "container");
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            EngineConfig::from_toml_str("[reconciliation]\nstrategy = \"guess\""),
            Err(ConfigError::Parse(_))
        ));
        assert!(matches!(
            EngineConfig::from_toml_str("[reconciliation]\nextreme_negative_threshold = 5.0"),
            Err(ConfigError::Validation(_))
        ));
        assert!(matches!(
            EngineConfig::from_toml_str("[source]\ntimestamp_formats = []"),
            Err(ConfigError::Validation(_))
        ));
    }

    #[test]
    fn toml_round_trip_preserves_config() {
        let mut config = EngineConfig::default();
        config.collapse.container_excluded_ports.push("ESALG".into());
        let text = config.to_toml().unwrap();
        assert_eq!(EngineConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn load_from_missing_file_is_io_error() {
        let err = EngineConfig::load_from_file(Path::new("/nonexistent/voyage.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(..)));
    }
}
