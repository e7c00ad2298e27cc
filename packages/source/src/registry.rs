//! Dataset configuration registry.
//!
//! The default portal configuration is baked into the binary via
//! [`include_str!`]. A different TOML file can be supplied by path or via
//! the `BUILDING_MAP_CONFIG` environment variable, and the request timeout
//! can be overridden with `BUILDING_MAP_TIMEOUT_SECS`.

use std::path::Path;

use building_map_source_models::SourceConfig;

use crate::SourceError;

/// Environment variable naming a TOML file that replaces the default config.
pub const CONFIG_ENV: &str = "BUILDING_MAP_CONFIG";

/// Environment variable overriding [`SourceConfig::timeout_secs`].
pub const TIMEOUT_ENV: &str = "BUILDING_MAP_TIMEOUT_SECS";

/// The embedded default configuration.
const DEFAULT_CONFIG: &str = include_str!("../config/calgary.toml");

/// Parses a configuration document.
///
/// # Errors
///
/// Returns [`SourceError::Config`] if the TOML is invalid, describes an
/// invalid default window, or sets a zero timeout.
pub fn parse_config(toml_str: &str) -> Result<SourceConfig, SourceError> {
    let config: SourceConfig = toml::de::from_str(toml_str).map_err(|e| SourceError::Config {
        message: e.to_string(),
    })?;

    if config.timeout_secs == 0 {
        return Err(SourceError::Config {
            message: "timeout_secs must be a positive number of seconds".to_string(),
        });
    }

    Ok(config)
}

/// Returns the embedded default configuration.
///
/// # Errors
///
/// Returns [`SourceError::Config`] if the embedded TOML fails to parse,
/// which indicates a development error caught by this module's tests.
pub fn default_config() -> Result<SourceConfig, SourceError> {
    parse_config(DEFAULT_CONFIG)
}

/// Loads the configuration from `path`, else from [`CONFIG_ENV`], else the
/// embedded default, then applies [`TIMEOUT_ENV`].
///
/// # Errors
///
/// Returns [`SourceError`] if the file cannot be read or parsed, or the
/// timeout override is not a positive integer.
pub fn load_config(path: Option<&Path>) -> Result<SourceConfig, SourceError> {
    let env_path = std::env::var_os(CONFIG_ENV);
    let path = path.or_else(|| env_path.as_deref().map(Path::new));

    let mut config = match path {
        Some(path) => {
            log::info!("Loading dataset configuration from {}", path.display());
            parse_config(&std::fs::read_to_string(path)?)?
        }
        None => default_config()?,
    };

    if let Ok(raw) = std::env::var(TIMEOUT_ENV) {
        config.timeout_secs = parse_timeout(&raw)?;
    }

    Ok(config)
}

fn parse_timeout(raw: &str) -> Result<u64, SourceError> {
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(secs),
        _ => Err(SourceError::Config {
            message: format!("{TIMEOUT_ENV} must be a positive number of seconds, got {raw:?}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_parses() {
        let config = default_config().unwrap();
        assert_eq!(config.domain, "https://data.calgary.ca");
        assert_eq!(config.buildings.id, "cchr-krqg");
        assert_eq!(config.buildings.limit, 150);
        assert!(config.zoning.dataset.limit > config.buildings.limit);
        assert!(config.assessment.dataset.limit > config.buildings.limit);
        assert!(!config.zoning.attribute.is_empty());
        assert!(!config.assessment.attribute.is_empty());
        assert!(config.default_window.north > config.default_window.south);
    }

    #[test]
    fn dataset_ids_are_distinct() {
        let config = default_config().unwrap();
        assert_ne!(config.buildings.id, config.zoning.dataset.id);
        assert_ne!(config.buildings.id, config.assessment.dataset.id);
        assert_ne!(config.zoning.dataset.id, config.assessment.dataset.id);
    }

    #[test]
    fn rejects_inverted_default_window() {
        let toml_str = DEFAULT_CONFIG.replace("north = 51.049", "north = 51.0");
        let err = parse_config(&toml_str).unwrap_err();
        assert!(matches!(err, SourceError::Config { .. }));
    }

    #[test]
    fn rejects_zero_timeout_in_file() {
        let toml_str = DEFAULT_CONFIG.replace("timeout_secs = 30", "timeout_secs = 0");
        let err = parse_config(&toml_str).unwrap_err();
        assert!(matches!(err, SourceError::Config { .. }));

        let toml_str = DEFAULT_CONFIG.replace("timeout_secs = 30", "timeout_secs = 5");
        assert_eq!(parse_config(&toml_str).unwrap().timeout_secs, 5);
    }

    #[test]
    fn timeout_override_must_be_positive() {
        assert_eq!(parse_timeout(" 5 ").unwrap(), 5);
        assert!(parse_timeout("0").is_err());
        assert!(parse_timeout("soon").is_err());
    }
}
