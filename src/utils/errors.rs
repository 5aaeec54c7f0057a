// src/utils/errors.rs
//! Error types for the interception engine
//!
//! Every failure surfaces as a rejected operation. Nothing here is retried,
//! and underlying causes stay reachable through `std::error::Error::source`.

use std::io;
use thiserror::Error;

/// Crate-wide result alias
pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Error, Debug)]
pub enum EngineError {
    /// Synthetic specifier could not be decoded or has the wrong shape
    #[error("Malformed synthetic specifier: {reason}")]
    MalformedSpecifier { reason: String },

    /// Base location is neither a `file:` URL nor an absolute path
    #[error("Invalid base location '{base}': {reason}")]
    InvalidBase { base: String, reason: String },

    /// Real source of a mocked module could not be read
    #[error("Failed to read source of module '{identifier}'")]
    SourceUnavailable {
        identifier: String,
        #[source]
        source: io::Error,
    },

    /// Registry lookup on a key that was never set or already removed
    #[error("No mock registered under key '{key}'")]
    RegistryMiss { key: String },

    /// Top-level statement of a rewritten module failed
    #[error("Evaluation of rewritten module failed: {reason}")]
    Evaluation {
        reason: String,
        #[source]
        source: Option<Box<EngineError>>,
    },

    /// Hook registration did not confirm readiness
    #[error("Loader hook registration failed: {0}")]
    Handshake(String),

    /// Message channel peer went away before replying
    #[error("Message channel closed: {0}")]
    ChannelClosed(String),

    /// A hook returned without calling the next stage or short-circuiting
    #[error("Loader hook '{hook}' neither called the next stage nor short-circuited for '{specifier}'")]
    ChainIncomplete { hook: String, specifier: String },

    /// Loader worker thread is gone
    #[error("Loader worker unavailable: {0}")]
    WorkerUnavailable(String),

    /// Terminal load stage cannot serve this specifier
    #[error("Unsupported module source '{0}'")]
    UnsupportedSource(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl EngineError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        EngineError::MalformedSpecifier {
            reason: reason.into(),
        }
    }

    /// Whether the error came from a broken synthetic specifier
    pub fn is_protocol(&self) -> bool {
        matches!(
            self,
            EngineError::MalformedSpecifier { .. } | EngineError::InvalidBase { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_source_unavailable_keeps_cause() {
        let err = EngineError::SourceUnavailable {
            identifier: "file:///missing.js".to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "no such file"),
        };

        assert!(err.to_string().contains("file:///missing.js"));
        let cause = err.source().unwrap();
        assert_eq!(cause.to_string(), "no such file");
    }

    #[test]
    fn test_registry_miss_names_key() {
        let err = EngineError::RegistryMiss {
            key: "tok_file:///dep.js".to_string(),
        };
        assert!(err.to_string().contains("tok_file:///dep.js"));
    }

    #[test]
    fn test_is_protocol() {
        assert!(EngineError::malformed("bad").is_protocol());
        assert!(!EngineError::Handshake("x".into()).is_protocol());
    }
}
