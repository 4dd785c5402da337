//! Unified error types for the roster.
//!
//! The first three variants are the taxonomy surfaced to the user: transport
//! failures, remote-reported validation failures and missing targets. The rest
//! are ambient failures (configuration, local database, decoding).

use thiserror::Error;

/// All errors produced by the crate.
#[derive(Debug, Error)]
pub enum Error {
    /// Network failure or a non-success response from the remote store.
    #[error("{message}")]
    Transport {
        /// Message shown to the user, usually the remote body verbatim
        message: String,
    },

    /// A field was rejected, either by the form or by the remote store.
    #[error("{message}")]
    Validation {
        /// Internal (camelCase) name of the offending field, when known
        field: Option<String>,
        /// Human-readable reason
        message: String,
    },

    /// The record targeted by a mutation does not exist.
    #[error("Aluno não encontrado: {id}")]
    NotFound {
        /// Identifier that was looked up
        id: String,
    },

    /// A row coming back from the store could not be turned into a record.
    #[error("Invalid record from store: {message}")]
    Decode {
        /// What was wrong with the row
        message: String,
    },

    /// Invalid or unreadable configuration.
    #[error("Configuration error: {message}")]
    Config {
        /// What was wrong with the configuration
        message: String,
    },

    /// Local database failure (table store).
    #[error("Database error: {0}")]
    Database(String),

    /// I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Missing or malformed environment variable.
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),
}

impl Error {
    /// Builds a validation error attached to a field.
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        Self::Validation {
            field: Some(field.to_string()),
            message: message.into(),
        }
    }

    /// True for the `NotFound` variant.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<sea_orm::DbErr> for Error {
    fn from(value: sea_orm::DbErr) -> Self {
        Self::Database(value.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(value: reqwest::Error) -> Self {
        Self::Transport {
            message: value.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Self::Decode {
            message: value.to_string(),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
