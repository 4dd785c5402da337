/// Application configuration loaded from TOML and the environment
pub mod app;

/// Database configuration and connection management
pub mod database;

pub use app::{AppConfig, BackendConfig, SyncConfig, load_app_configuration, load_config};
