//! Configuration loader and validator for the robot live-data service.
use crate::db::StoreSettings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(&'static str),
}

/// Root configuration struct mirroring the YAML schema exactly.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    pub server: Server,
    pub database: Database,
    #[serde(default)]
    pub shift: Shift,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Server {
    pub bind_addr: String,
}

/// Live-data database settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Database {
    pub url: String,
    pub pool_size: u32,
    pub statement_timeout_ms: u64,
    /// Zero disables schema caching.
    #[serde(default)]
    pub schema_cache_ttl_ms: u64,
}

/// Production shift database. Endpoints are tried in order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Shift {
    #[serde(default)]
    pub endpoints: Vec<String>,
    #[serde(default = "default_shift_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_statement_timeout_ms")]
    pub statement_timeout_ms: u64,
}

impl Default for Shift {
    fn default() -> Self {
        Self {
            endpoints: Vec::new(),
            pool_size: default_shift_pool_size(),
            statement_timeout_ms: default_statement_timeout_ms(),
        }
    }
}

fn default_shift_pool_size() -> u32 {
    2
}

fn default_statement_timeout_ms() -> u64 {
    5000
}

impl Database {
    pub fn store_settings(&self) -> StoreSettings {
        StoreSettings {
            url: self.url.clone(),
            pool_size: self.pool_size,
            statement_timeout: Duration::from_millis(self.statement_timeout_ms),
        }
    }

    pub fn schema_cache_ttl(&self) -> Duration {
        Duration::from_millis(self.schema_cache_ttl_ms)
    }
}

impl Shift {
    pub fn statement_timeout(&self) -> Duration {
        Duration::from_millis(self.statement_timeout_ms)
    }
}

/// Load configuration from a YAML file and validate it.
/// - If `path` is None, uses `config.yaml` in the current working directory.
pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.unwrap_or_else(|| Path::new("config.yaml"));
    let content = fs::read_to_string(path)?;
    let cfg: Config = serde_yaml::from_str(&content)?;
    validate(&cfg)?;
    Ok(cfg)
}

/// Validate a configuration instance.
pub fn validate(cfg: &Config) -> Result<(), ConfigError> {
    if cfg.server.bind_addr.trim().is_empty() {
        return Err(ConfigError::Invalid("server.bind_addr must be non-empty"));
    }

    if cfg.database.url.trim().is_empty() {
        return Err(ConfigError::Invalid("database.url must be non-empty"));
    }
    if cfg.database.pool_size == 0 {
        return Err(ConfigError::Invalid("database.pool_size must be > 0"));
    }
    if cfg.database.statement_timeout_ms == 0 {
        return Err(ConfigError::Invalid("database.statement_timeout_ms must be > 0"));
    }

    if cfg.shift.endpoints.iter().any(|e| e.trim().is_empty()) {
        return Err(ConfigError::Invalid("shift.endpoints entries must be non-empty"));
    }
    if cfg.shift.pool_size == 0 {
        return Err(ConfigError::Invalid("shift.pool_size must be > 0"));
    }
    if cfg.shift.statement_timeout_ms == 0 {
        return Err(ConfigError::Invalid("shift.statement_timeout_ms must be > 0"));
    }

    Ok(())
}

/// Returns an example configuration file.
pub fn example() -> &'static str {
    r#"server:
  bind_addr: "0.0.0.0:5000"

database:
  url: "sqlite://./data/robots.db"
  pool_size: 8
  statement_timeout_ms: 5000
  schema_cache_ttl_ms: 0

shift:
  endpoints:
    - "sqlite://./data/fps_prod2.db"
    - "sqlite://./data/fps_prod1.db"
  pool_size: 2
  statement_timeout_ms: 5000
"#
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn parse_example_ok() {
        let cfg: Config = serde_yaml::from_str(example()).unwrap();
        validate(&cfg).unwrap();
        assert_eq!(cfg.shift.endpoints.len(), 2);
        assert_eq!(
            cfg.database.store_settings().statement_timeout,
            Duration::from_secs(5)
        );
    }

    #[test]
    fn shift_section_is_optional() {
        let yaml = r#"
server:
  bind_addr: "127.0.0.1:8080"
database:
  url: "sqlite::memory:"
  pool_size: 1
  statement_timeout_ms: 100
"#;
        let cfg: Config = serde_yaml::from_str(yaml).unwrap();
        validate(&cfg).unwrap();
        assert!(cfg.shift.endpoints.is_empty());
        assert_eq!(cfg.database.schema_cache_ttl(), Duration::ZERO);
    }

    #[test]
    fn invalid_database_settings() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.database.url = " ".into();
        let err = validate(&cfg).unwrap_err();
        match err {
            ConfigError::Invalid(msg) => assert!(msg.contains("database.url")),
            _ => panic!("wrong error"),
        }

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.database.pool_size = 0;
        let err = validate(&cfg).unwrap_err();
        match err {
            ConfigError::Invalid(msg) => assert!(msg.contains("pool_size")),
            _ => panic!("wrong error"),
        }

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.database.statement_timeout_ms = 0;
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn invalid_server_and_shift_settings() {
        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.server.bind_addr = "".into();
        assert!(matches!(validate(&cfg), Err(ConfigError::Invalid(_))));

        let mut cfg: Config = serde_yaml::from_str(example()).unwrap();
        cfg.shift.endpoints.push("".into());
        let err = validate(&cfg).unwrap_err();
        match err {
            ConfigError::Invalid(msg) => assert!(msg.contains("shift.endpoints")),
            _ => panic!("wrong error"),
        }
    }

    #[test]
    fn load_from_file_ok() {
        let td = tempdir().unwrap();
        let p = td.path().join("config.yaml");
        fs::write(&p, example()).unwrap();
        let cfg = load(Some(&p)).unwrap();
        assert_eq!(cfg.server.bind_addr, "0.0.0.0:5000");
    }

    #[test]
    fn load_missing_file_is_io_error() {
        let td = tempdir().unwrap();
        let err = load(Some(&td.path().join("absent.yaml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
