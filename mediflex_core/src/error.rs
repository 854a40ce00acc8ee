//! Error types for the mediflex_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for mediflex_core operations
///
/// These are local failures (disk, database, transport). Outcomes the user is
/// meant to see, such as a rejected login or a `require_login` reply, are not
/// errors and travel as [`crate::Notice`] or [`crate::service::Reply`] values.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// SQLite error from the credential store
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Transport-level failure talking to the recommendation service
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The service answered with a body we could not interpret
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}
