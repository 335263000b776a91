//! Service configuration, loaded from the environment at startup.
//!
//! All settings have working defaults; a `.env` file is honored when
//! present. Bad values fail startup rather than being silently replaced,
//! and the transformation catalog is loaded and validated here so a broken
//! deployment never accepts a request.

use std::env;
use std::fs;
use std::time::Duration;

use crate::error::{ConfigError, ConfigResult};
use crate::mapper::{MapperOptions, TransformCatalog};

/// Environment variable names.
pub const ENV_PORT: &str = "RESTRUCT_PORT";
pub const ENV_SCRATCH_DIR: &str = "RESTRUCT_SCRATCH_DIR";
pub const ENV_FILE_TTL_SECS: &str = "RESTRUCT_FILE_TTL_SECS";
pub const ENV_TIMEOUT_SECS: &str = "RESTRUCT_TIMEOUT_SECS";
pub const ENV_THRESHOLD: &str = "RESTRUCT_MATCH_THRESHOLD";
pub const ENV_SAMPLE_ROWS: &str = "RESTRUCT_SAMPLE_ROWS";
pub const ENV_CATALOG: &str = "RESTRUCT_CATALOG";

/// Resolved service configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// HTTP listen port.
    pub port: u16,
    /// Directory for generated output files.
    pub scratch_dir: String,
    /// How long generated files stay downloadable. Zero disables expiry.
    pub file_ttl: Duration,
    /// Per-request processing deadline.
    pub timeout: Duration,
    /// Mapper tuning (match threshold, sample depth).
    pub mapper: MapperOptions,
    /// Declared transformation catalog.
    pub catalog: TransformCatalog,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8000,
            scratch_dir: "generated".to_string(),
            file_ttl: Duration::from_secs(3600),
            timeout: Duration::from_secs(60),
            mapper: MapperOptions::default(),
            catalog: TransformCatalog::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the environment, honoring `.env`.
    pub fn from_env() -> ConfigResult<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        let mut mapper = MapperOptions::default();
        if let Some(threshold) = parse_var::<f64>(ENV_THRESHOLD)? {
            if !(0.0..=1.0).contains(&threshold) {
                return Err(ConfigError::InvalidValue {
                    name: ENV_THRESHOLD.to_string(),
                    message: format!("{threshold} is outside 0.0..=1.0"),
                });
            }
            mapper.threshold = threshold;
        }
        if let Some(rows) = parse_var::<usize>(ENV_SAMPLE_ROWS)? {
            mapper.sample_rows = rows;
        }

        let catalog = match env::var(ENV_CATALOG) {
            Ok(path) => load_catalog(&path)?,
            Err(_) => TransformCatalog::default(),
        };

        Ok(Self {
            port: parse_var(ENV_PORT)?.unwrap_or(defaults.port),
            scratch_dir: env::var(ENV_SCRATCH_DIR).unwrap_or(defaults.scratch_dir),
            file_ttl: parse_var(ENV_FILE_TTL_SECS)?
                .map(Duration::from_secs)
                .unwrap_or(defaults.file_ttl),
            timeout: parse_var(ENV_TIMEOUT_SECS)?
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
            mapper,
            catalog,
        })
    }
}

/// Read and validate a catalog file. Any problem is fatal at startup.
pub fn load_catalog(path: &str) -> ConfigResult<TransformCatalog> {
    let json = fs::read_to_string(path).map_err(|e| ConfigError::CatalogUnreadable {
        path: path.to_string(),
        message: e.to_string(),
    })?;
    let catalog = TransformCatalog::from_json(&json)?;
    if let Err(problems) = catalog.validate() {
        return Err(ConfigError::CatalogUnreadable {
            path: path.to_string(),
            message: problems.join("; "),
        });
    }
    Ok(catalog)
}

fn parse_var<T>(name: &str) -> ConfigResult<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue {
                name: name.to_string(),
                message: e.to_string(),
            }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::example_catalog;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.port, 8000);
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert!(config.catalog.scales.is_empty());
    }

    #[test]
    fn test_load_catalog_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(example_catalog().to_json().unwrap().as_bytes())
            .unwrap();

        let catalog = load_catalog(file.path().to_str().unwrap()).unwrap();
        assert_eq!(catalog.scales.len(), 1);
    }

    #[test]
    fn test_load_catalog_rejects_invalid_rules() {
        let mut bad = example_catalog();
        bad.scales[0].factor = 0.0;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(bad.to_json().unwrap().as_bytes()).unwrap();

        let err = load_catalog(file.path().to_str().unwrap()).unwrap_err();
        assert!(err.to_string().contains("Annual_Salary"));
    }

    #[test]
    fn test_missing_catalog_file_is_fatal() {
        assert!(load_catalog("/no/such/catalog.json").is_err());
    }
}
