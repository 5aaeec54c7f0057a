// src/interception/metadata.rs
//! Metadata codec for synthetic specifiers
//!
//! A synthetic specifier smuggles `MockingInfos` from the caller realm to the
//! loader realm through the only thing both sides see: the specifier string.
//!
//! ```text
//! <prefix><base64(json({ token, moduleIdentifier, dependencyIdentifiers }))>
//! ```

use crate::interception::resolver::SpecifierResolver;
use crate::runtime::registry::{registry_key, MockRegistry};
use crate::utils::config::LoaderConfig;
use crate::utils::errors::{EngineError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;
use ulid::Ulid;

/// Per-call mocking metadata carried inside a synthetic specifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MockingInfos {
    /// Session token scoping registry keys
    pub token: String,

    /// Absolute identifier of the module to load and rewrite
    pub module_identifier: String,

    /// Absolute identifiers of the intercepted dependencies, in caller order
    pub dependency_identifiers: Vec<String>,
}

impl MockingInfos {
    /// Registry key of one dependency in this session
    pub fn key_for(&self, dependency_identifier: &str) -> String {
        registry_key(&self.token, dependency_identifier)
    }

    /// Registry keys of every intercepted dependency, in order
    pub fn registry_keys(&self) -> impl Iterator<Item = String> + '_ {
        self.dependency_identifiers
            .iter()
            .map(move |dep| self.key_for(dep))
    }

    pub fn is_mocked(&self, dependency_identifier: &str) -> bool {
        self.dependency_identifiers
            .iter()
            .any(|dep| dep == dependency_identifier)
    }
}

/// Encoder/decoder for synthetic specifiers
#[derive(Debug, Clone)]
pub struct MetadataCodec {
    prefix: String,
    resolver: SpecifierResolver,
}

impl MetadataCodec {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            resolver: SpecifierResolver::new(),
        }
    }

    pub fn from_config(config: &LoaderConfig) -> Self {
        Self::new(config.specifier_prefix.clone())
    }

    /// Reserved prefix of synthetic specifiers
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Whether this codec owns `specifier`
    pub fn is_synthetic(&self, specifier: &str) -> bool {
        specifier.starts_with(&self.prefix)
    }

    /// Register substitutes and build the synthetic specifier for one session
    pub fn encode<I, K>(
        &self,
        registry: &MockRegistry,
        module_identifier: &str,
        base_location: &str,
        substitutes: I,
    ) -> Result<String>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        let infos = self.register(registry, module_identifier, base_location, substitutes)?;
        self.encode_infos(&infos)
    }

    /// Resolve identifiers and store substitutes under a fresh token
    ///
    /// Each substitute is stored under `"{token}_{absoluteDependency}"` before
    /// any specifier exists. If resolution fails halfway, entries written so
    /// far are removed again.
    pub fn register<I, K>(
        &self,
        registry: &MockRegistry,
        module_identifier: &str,
        base_location: &str,
        substitutes: I,
    ) -> Result<MockingInfos>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        let token = Ulid::new().to_string();
        let module_identifier = self.resolver.resolve(module_identifier, base_location)?;

        let mut dependency_identifiers: Vec<String> = Vec::new();
        for (dependency, value) in substitutes {
            let resolved = match self.resolver.resolve(dependency.as_ref(), base_location) {
                Ok(resolved) => resolved,
                Err(e) => {
                    registry.remove_token(&token);
                    return Err(e);
                }
            };

            registry.set(registry_key(&token, &resolved), value);
            if !dependency_identifiers.contains(&resolved) {
                dependency_identifiers.push(resolved);
            }
        }

        debug!(
            "Registered mocking session {} for {} ({} dependencies)",
            token,
            module_identifier,
            dependency_identifiers.len()
        );

        Ok(MockingInfos {
            token,
            module_identifier,
            dependency_identifiers,
        })
    }

    /// Serialize already-resolved metadata into a synthetic specifier
    pub fn encode_infos(&self, infos: &MockingInfos) -> Result<String> {
        let json = serde_json::to_vec(infos)
            .map_err(|e| EngineError::malformed(format!("cannot serialize metadata: {}", e)))?;
        Ok(format!("{}{}", self.prefix, STANDARD.encode(json)))
    }

    /// Reconstruct and validate the metadata carried by `specifier`
    pub fn decode(&self, specifier: &str) -> Result<MockingInfos> {
        let payload = specifier.strip_prefix(self.prefix.as_str()).ok_or_else(|| {
            EngineError::malformed(format!(
                "specifier does not start with reserved prefix '{}'",
                self.prefix
            ))
        })?;

        let bytes = STANDARD
            .decode(payload)
            .map_err(|e| EngineError::malformed(format!("payload is not valid base64: {}", e)))?;

        let infos: MockingInfos = serde_json::from_slice(&bytes)
            .map_err(|e| EngineError::malformed(format!("payload has the wrong shape: {}", e)))?;

        if infos.token.is_empty() {
            return Err(EngineError::malformed("token is empty"));
        }
        if infos.module_identifier.is_empty() {
            return Err(EngineError::malformed("moduleIdentifier is empty"));
        }

        Ok(infos)
    }
}

impl Default for MetadataCodec {
    fn default() -> Self {
        Self::from_config(&LoaderConfig::default())
    }
}
