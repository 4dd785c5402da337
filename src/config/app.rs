//! Application configuration loading from `roster.toml` and the environment.
//!
//! The file picks the backend (REST API or database table) and the sync
//! strategy. Environment variables, usually coming from `.env`, override it.

use crate::{
    config::database,
    core::roster::SyncStrategy,
    errors::{Error, Result},
};
use serde::Deserialize;
use std::{path::Path, time::Duration};
use tracing::{debug, info};

/// Config file read when `ROSTER_CONFIG` is not set.
pub const DEFAULT_CONFIG_PATH: &str = "roster.toml";

/// Configuration structure representing the entire roster.toml file
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AppConfig {
    /// Where student records live
    #[serde(default)]
    pub backend: BackendConfig,
    /// How the roster keeps itself in sync
    #[serde(default)]
    pub sync: SyncConfig,
}

/// Remote store selection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BackendConfig {
    /// REST API exposing `/students`
    Rest {
        /// API root, e.g. `https://api.example.com`
        base_url: String,
        /// Per-request timeout; none by default
        #[serde(default)]
        timeout_secs: Option<u64>,
    },
    /// Database table with change notifications
    Table {
        /// SeaORM connection string
        #[serde(default = "default_database_url")]
        database_url: String,
    },
}

fn default_database_url() -> String {
    database::DEFAULT_DATABASE_URL.to_string()
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self::Table {
            database_url: default_database_url(),
        }
    }
}

impl BackendConfig {
    /// Request timeout for the REST backend.
    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        match self {
            Self::Rest { timeout_secs, .. } => timeout_secs.map(Duration::from_secs),
            Self::Table { .. } => None,
        }
    }
}

/// Synchronization settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SyncConfig {
    /// Merge returned rows or refetch after each mutation
    #[serde(default)]
    pub strategy: SyncStrategy,
    /// Subscribe to change notifications when the backend supports them
    #[serde(default = "default_watch_changes")]
    pub watch_changes: bool,
}

const fn default_watch_changes() -> bool {
    true
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            strategy: SyncStrategy::default(),
            watch_changes: true,
        }
    }
}

impl AppConfig {
    /// Applies overrides looked up through `lookup`.
    ///
    /// Recognized keys: `ROSTER_BACKEND` (`rest` / `table`), `ROSTER_API_URL`,
    /// `DATABASE_URL`, `ROSTER_SYNC_STRATEGY` (`merge` / `refetch`).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_url = lookup("ROSTER_API_URL");
        let database_url = lookup("DATABASE_URL");

        match lookup("ROSTER_BACKEND").as_deref().map(str::trim) {
            Some("rest") => {
                let (current, timeout_secs) = match &self.backend {
                    BackendConfig::Rest {
                        base_url,
                        timeout_secs,
                    } => (Some(base_url.clone()), *timeout_secs),
                    BackendConfig::Table { .. } => (None, None),
                };
                let base_url = api_url.or(current).ok_or_else(|| Error::Config {
                    message: "ROSTER_BACKEND=rest requires ROSTER_API_URL".to_string(),
                })?;
                self.backend = BackendConfig::Rest {
                    base_url,
                    timeout_secs,
                };
            }
            Some("table") => {
                let current = match &self.backend {
                    BackendConfig::Table { database_url } => Some(database_url.clone()),
                    BackendConfig::Rest { .. } => None,
                };
                self.backend = BackendConfig::Table {
                    database_url: database_url
                        .or(current)
                        .unwrap_or_else(default_database_url),
                };
            }
            Some(other) => {
                return Err(Error::Config {
                    message: format!("Unknown ROSTER_BACKEND '{other}' (expected rest or table)"),
                });
            }
            None => match &mut self.backend {
                BackendConfig::Rest { base_url, .. } => {
                    if let Some(url) = api_url {
                        *base_url = url;
                    }
                }
                BackendConfig::Table { database_url: current } => {
                    if let Some(url) = database_url {
                        *current = url;
                    }
                }
            },
        }

        if let Some(strategy) = lookup("ROSTER_SYNC_STRATEGY") {
            self.sync.strategy = strategy.parse().map_err(|message| Error::Config { message })?;
        }
        Ok(())
    }
}

/// Loads configuration from a TOML file
///
/// # Errors
/// Returns an error if the file cannot be read or the TOML is invalid.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<AppConfig> {
    let path_ref = path.as_ref();
    debug!("Attempting to load configuration from: {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {path_ref:?}: {e}"),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse TOML from config file {path_ref:?}: {e}"),
    })
}

/// Loads the file named by `ROSTER_CONFIG` (default `roster.toml`) and applies
/// environment overrides. A missing file means defaults.
pub fn load_app_configuration() -> Result<AppConfig> {
    let path = std::env::var("ROSTER_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let mut config = if Path::new(&path).exists() {
        load_config(&path)?
    } else {
        info!("No config file at {}, using defaults", path);
        AppConfig::default()
    };
    config.apply_overrides(|key| std::env::var(key).ok())?;
    info!(
        "Configuration loaded: backend={}, strategy={:?}",
        match &config.backend {
            BackendConfig::Rest { .. } => "rest",
            BackendConfig::Table { .. } => "table",
        },
        config.sync.strategy
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_parse_rest_config() {
        let toml_str = r#"
            [backend]
            kind = "rest"
            base_url = "https://api.example.com"
            timeout_secs = 10

            [sync]
            strategy = "refetch"
        "#;

        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(
            config.backend,
            BackendConfig::Rest {
                base_url: "https://api.example.com".to_string(),
                timeout_secs: Some(10),
            }
        );
        assert_eq!(config.backend.timeout(), Some(Duration::from_secs(10)));
        assert_eq!(config.sync.strategy, SyncStrategy::Refetch);
        assert!(config.sync.watch_changes);
    }

    #[test]
    fn test_empty_file_uses_table_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert!(matches!(config.backend, BackendConfig::Table { .. }));
        assert_eq!(config.sync.strategy, SyncStrategy::Merge);
    }

    #[test]
    fn test_table_without_url_parses_to_default() {
        let config: AppConfig = toml::from_str("[backend]\nkind = \"table\"\n").unwrap();
        assert_eq!(
            config.backend,
            BackendConfig::Table {
                database_url: database::DEFAULT_DATABASE_URL.to_string(),
            }
        );
    }

    #[test]
    fn test_env_switches_backend_to_rest() {
        let mut config = AppConfig::default();
        config
            .apply_overrides(env(&[
                ("ROSTER_BACKEND", "rest"),
                ("ROSTER_API_URL", "http://localhost:3000"),
                ("ROSTER_SYNC_STRATEGY", "refetch"),
            ]))
            .unwrap();

        assert_eq!(
            config.backend,
            BackendConfig::Rest {
                base_url: "http://localhost:3000".to_string(),
                timeout_secs: None,
            }
        );
        assert_eq!(config.sync.strategy, SyncStrategy::Refetch);
    }

    #[test]
    fn test_rest_backend_without_url_is_rejected() {
        let mut config = AppConfig::default();
        let result = config.apply_overrides(env(&[("ROSTER_BACKEND", "rest")]));
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_database_url_overrides_table_backend() {
        let mut config = AppConfig::default();
        config
            .apply_overrides(env(&[("DATABASE_URL", "sqlite::memory:")]))
            .unwrap();
        assert_eq!(
            config.backend,
            BackendConfig::Table {
                database_url: "sqlite::memory:".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_strategy_is_rejected() {
        let mut config = AppConfig::default();
        let result = config.apply_overrides(env(&[("ROSTER_SYNC_STRATEGY", "sometimes")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let result = load_config("definitely/not/here.toml");
        assert!(matches!(result, Err(Error::Config { .. })));
    }
}
