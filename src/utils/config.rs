// src/utils/config.rs
//! Engine configuration
//!
//! Layered the usual way: built-in defaults, then an optional file, then
//! `MODMOCK_` environment variables (`MODMOCK_LOADER__SPECIFIER_PREFIX=...`).

use crate::utils::errors::{EngineError, Result};
use serde::{Deserialize, Serialize};

/// Default tag that marks a load request as synthetic
pub const DEFAULT_SPECIFIER_PREFIX: &str = "modmock:";

/// Default specifier the rewritten module imports the registry from
pub const DEFAULT_REGISTRY_SPECIFIER: &str = "modmock-registry:registry";

/// Default local name of the registry inside rewritten modules
pub const DEFAULT_REGISTRY_BINDING: &str = "__modmock_registry";

/// Top-level engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub loader: LoaderConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Settings shared by the codec, the rewriter and the loader hook
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Reserved prefix of synthetic specifiers
    #[serde(default = "default_specifier_prefix")]
    pub specifier_prefix: String,

    /// Module specifier of the registry accessor injected as preamble
    #[serde(default = "default_registry_specifier")]
    pub registry_specifier: String,

    /// Local binding the preamble gives the registry
    #[serde(default = "default_registry_binding")]
    pub registry_binding: String,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            specifier_prefix: default_specifier_prefix(),
            registry_specifier: default_registry_specifier(),
            registry_binding: default_registry_binding(),
        }
    }
}

impl LoaderConfig {
    /// Reject settings that would make synthetic specifiers ambiguous or
    /// produce unparseable preambles
    pub fn validate(&self) -> Result<()> {
        if self.specifier_prefix.is_empty() {
            return Err(EngineError::InvalidConfig(
                "specifier_prefix must not be empty".into(),
            ));
        }

        if self.registry_specifier.starts_with(&self.specifier_prefix) {
            return Err(EngineError::InvalidConfig(format!(
                "registry_specifier '{}' must not start with the synthetic prefix '{}'",
                self.registry_specifier, self.specifier_prefix
            )));
        }

        if !is_js_identifier(&self.registry_binding) {
            return Err(EngineError::InvalidConfig(format!(
                "registry_binding '{}' is not a valid identifier",
                self.registry_binding
            )));
        }

        Ok(())
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_specifier_prefix() -> String {
    DEFAULT_SPECIFIER_PREFIX.to_string()
}

fn default_registry_specifier() -> String {
    DEFAULT_REGISTRY_SPECIFIER.to_string()
}

fn default_registry_binding() -> String {
    DEFAULT_REGISTRY_BINDING.to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn is_js_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

impl EngineConfig {
    /// Load configuration from defaults, an optional file, and the environment
    pub fn load_from(path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();

        builder = builder.add_source(config::Config::try_from(&EngineConfig::default())?);

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }

        builder = builder.add_source(
            config::Environment::with_prefix("MODMOCK")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: EngineConfig = builder.build()?.try_deserialize()?;
        config.loader.validate()?;
        Ok(config)
    }

    /// Load configuration without a file
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }
}
