// src/runtime/registry.rs
//! Mock registry
//!
//! Keyed store from which rewritten modules read their substitute values.
//! Keys are `"{token}_{absoluteDependencyIdentifier}"`; every entry is
//! written once by the codec, read once by the rewritten module and removed
//! by the injected cleanup (or by the owning `MockSession`).

use crate::observability::REGISTRY_MISSES_TOTAL;
use crate::utils::errors::{EngineError, Result};
use dashmap::DashMap;
use once_cell::sync::Lazy;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

static GLOBAL_REGISTRY: Lazy<Arc<MockRegistry>> = Lazy::new(|| Arc::new(MockRegistry::new()));

/// Build the registry key for one mocked dependency of a session
pub fn registry_key(token: &str, dependency_identifier: &str) -> String {
    format!("{}_{}", token, dependency_identifier)
}

/// Realm-local substitute store
#[derive(Debug, Default)]
pub struct MockRegistry {
    entries: DashMap<String, Value>,
}

impl MockRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Process-wide registry of the execution realm
    pub fn global() -> Arc<MockRegistry> {
        Arc::clone(&GLOBAL_REGISTRY)
    }

    /// Store a substitute, overwriting any previous value
    pub fn set(&self, key: impl Into<String>, value: Value) {
        let key = key.into();
        debug!("Registering mock {}", key);
        self.entries.insert(key, value);
    }

    /// Fetch a substitute; a missing key is a wiring bug and fails loudly
    pub fn get(&self, key: &str) -> Result<Value> {
        match self.entries.get(key) {
            Some(entry) => Ok(entry.value().clone()),
            None => {
                warn!("Mock lookup for unknown key {}", key);
                metrics::counter!(REGISTRY_MISSES_TOTAL).increment(1);
                Err(EngineError::RegistryMiss {
                    key: key.to_string(),
                })
            }
        }
    }

    /// Delete a substitute; absent keys are ignored
    pub fn remove(&self, key: &str) {
        if self.entries.remove(key).is_some() {
            debug!("Removed mock {}", key);
        }
    }

    /// Delete every entry belonging to `token`, returning how many went away
    pub fn remove_token(&self, token: &str) -> usize {
        let prefix = format!("{}_", token);
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.starts_with(&prefix));
        before.saturating_sub(self.entries.len())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
