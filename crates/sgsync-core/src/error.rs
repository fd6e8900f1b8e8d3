//! Error types for the synchronizer
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for synchronizer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the synchronizer
///
/// Every variant is fatal to the current invocation; nothing is retried.
/// Interactive callers print the error and exit non-zero, embedded callers
/// receive it as a typed failure.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors (bad or missing arguments)
    #[error("configuration error: {0}")]
    Config(String),

    /// A prerequisite of the external cloud CLI is missing
    #[error("missing prerequisite: {0}")]
    Prerequisite(String),

    /// IP lookup-related errors
    #[error("ip lookup error: {0}")]
    IpLookup(String),

    /// External command invocation errors
    ///
    /// `details` carries the raw stderr of the failed command, when captured.
    #[error("external command failed: {message}")]
    Command {
        /// What was being attempted
        message: String,
        /// Raw stderr from the command, if any
        details: Option<String>,
    },

    /// JSON parse errors from external command output
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// State storage errors
    #[error("state storage error: {0}")]
    Storage(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a missing-prerequisite error
    pub fn prerequisite(msg: impl Into<String>) -> Self {
        Self::Prerequisite(msg.into())
    }

    /// Create an IP lookup error
    pub fn ip_lookup(msg: impl Into<String>) -> Self {
        Self::IpLookup(msg.into())
    }

    /// Create an external-command error with optional stderr details
    pub fn command(message: impl Into<String>, details: Option<String>) -> Self {
        Self::Command {
            message: message.into(),
            details: details.filter(|d| !d.trim().is_empty()),
        }
    }

    /// Create a state storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Raw stderr of the last external command, when this is a command error
    pub fn details(&self) -> Option<&str> {
        match self {
            Self::Command { details, .. } => details.as_deref(),
            _ => None,
        }
    }
}
