//! Error types for DealScout.
//!
//! Every library crate returns [`DealScoutError`]. Module failures are the only
//! variant the enrichment chain swallows; the rest abort the job that hit them.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Failure of a discovery, enrichment, scoring, or storage operation.
#[derive(Debug, thiserror::Error)]
pub enum DealScoutError {
    /// Unreadable `dealscout.toml`, or a provider API key env var that is not set.
    #[error("config error: {message}")]
    Config { message: String },

    /// Places, Serper, or chat-completions request failed, or a company site
    /// answered with an error status.
    #[error("network error: {0}")]
    Network(String),

    /// Places, Serper, or AI response body was not the JSON we expect.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// libSQL failure, or a write against a database opened read-only.
    #[error("storage error: {0}")]
    Storage(String),

    /// One provider failed for one record. The chain logs it and moves on.
    #[error("module {module} failed: {message}")]
    Module { module: String, message: String },

    /// Creating the data directory or writing the config file failed.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Unknown status or field name, or an empty update committed as complete.
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, DealScoutError>;

impl DealScoutError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a module failure attributed to `module`.
    pub fn module(module: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Module {
            module: module.into(),
            message: msg.into(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Attach the path that was being created or written.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formatting() {
        let err = DealScoutError::config("missing API key");
        assert_eq!(err.to_string(), "config error: missing API key");

        let err = DealScoutError::module("about", "HTTP 503");
        assert_eq!(err.to_string(), "module about failed: HTTP 503");

        let err = DealScoutError::validation("not a uuid");
        assert!(err.to_string().contains("not a uuid"));
    }

    #[test]
    fn io_error_names_the_path() {
        let source = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err = DealScoutError::io("/var/lib/dealscout", source);
        let shown = err.to_string();
        assert!(shown.contains("/var/lib/dealscout"));
        assert!(shown.contains("denied"));
    }
}
