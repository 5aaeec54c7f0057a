// src/observability/mod.rs
//! Tracing setup and metric names
//!
//! The engine only emits `tracing` events and `metrics` counters; installing
//! a subscriber or a metrics recorder is left to the embedding test harness.

use crate::utils::config::LoggingConfig;
use crate::utils::errors::{EngineError, Result};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Load requests seen by the mock hook, labelled `kind`
pub const LOADS_TOTAL: &str = "modmock_loads_total";

/// Modules rewritten by the source rewriter
pub const REWRITES_TOTAL: &str = "modmock_rewrites_total";

/// Registry lookups on absent keys
pub const REGISTRY_MISSES_TOTAL: &str = "modmock_registry_misses_total";

/// Install the global tracing subscriber
///
/// `RUST_LOG` wins over the configured level. Fails if a global subscriber
/// is already installed.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let installed = if config.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init()
    };

    installed.map_err(|e| EngineError::InvalidConfig(format!("tracing already initialized: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_twice_fails() {
        let config = LoggingConfig::default();
        // Another test may have installed a subscriber first
        let _ = init_tracing(&config);
        assert!(init_tracing(&config).is_err());
    }
}
