//! Transform settings loaded from TOML.
//!
//! ```toml
//! name_separator = "_"
//! reserved_aux_names = ["MV Bus 4_1"]
//! tolerance = 1e-6
//!
//! [geodata]
//! mode = "offset"
//! dx = 0.5
//! dy = 0.0
//! ```
//!
//! Every key is optional.

use std::path::Path;

use anyhow::{Context, Result};
use auxbus_core::{ExpandOptions, GeodataPolicy, DEFAULT_TOLERANCE};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    pub reserved_aux_names: Vec<String>,
    pub name_separator: String,
    /// Absolute tolerance for float columns when comparing networks
    pub tolerance: f64,
    pub geodata: GeodataPolicy,
}

impl Default for TransformConfig {
    fn default() -> Self {
        let options = ExpandOptions::default();
        Self {
            reserved_aux_names: options.reserved_names,
            name_separator: options.name_separator,
            tolerance: DEFAULT_TOLERANCE,
            geodata: options.geodata,
        }
    }
}

impl TransformConfig {
    /// Load from `path`, or fall back to defaults when no path is given.
    pub fn resolve(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading config '{}'", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("parsing config '{}'", path.display()))?;
        Ok(config)
    }

    pub fn to_expand_options(&self) -> ExpandOptions {
        ExpandOptions {
            geodata: self.geodata,
            reserved_names: self.reserved_aux_names.clone(),
            name_separator: self.name_separator.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: TransformConfig = toml::from_str("").unwrap();
        assert_eq!(config, TransformConfig::default());
        assert_eq!(config.name_separator, "_");
        assert_eq!(config.geodata, GeodataPolicy::Duplicate);
    }

    #[test]
    fn test_partial_config() {
        let config: TransformConfig = toml::from_str(
            r#"
            reserved_aux_names = ["Bus 0_1"]

            [geodata]
            mode = "offset"
            dx = 0.5
            dy = -1.0
            "#,
        )
        .unwrap();
        let options = config.to_expand_options();
        assert_eq!(options.reserved_names, vec!["Bus 0_1"]);
        assert_eq!(options.geodata, GeodataPolicy::Offset { dx: 0.5, dy: -1.0 });
        assert_eq!(options.name_separator, "_");
        assert_eq!(config.tolerance, DEFAULT_TOLERANCE);
    }

    #[test]
    fn test_config_round_trips_through_toml() {
        let config = TransformConfig {
            name_separator: "#".to_string(),
            tolerance: 1e-6,
            ..TransformConfig::default()
        };
        let text = toml::to_string_pretty(&config).unwrap();
        let back: TransformConfig = toml::from_str(&text).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_missing_file_names_path() {
        let err = TransformConfig::load_from(Path::new("/nonexistent/auxbus.toml")).unwrap_err();
        assert!(err.to_string().contains("auxbus.toml"));
    }
}
