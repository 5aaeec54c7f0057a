// src/utils/mod.rs
//! Common utilities shared across the engine
//!
//! - **Errors**: `EngineError` taxonomy and the crate-wide `Result` alias
//! - **Config**: layered engine configuration (defaults, file, environment)

pub mod config;
pub mod errors;

pub use self::config::{EngineConfig, LoaderConfig, LoggingConfig};
pub use self::errors::{EngineError, Result};
