// src/runtime/engine.rs
//! Caller-facing mock engine
//!
//! Ties the pieces together for one process: the execution-realm registry,
//! the loader realm with the mock hook installed, and the handshake gating
//! every mocking call.

use crate::interception::loader_hook::MockLoaderHook;
use crate::interception::metadata::{MetadataCodec, MockingInfos};
use crate::interception::pipeline::{LoadContext, LoadResult, ModuleFormat};
use crate::interception::source_reader::{FsSourceReader, SourceReader};
use crate::runtime::evaluator::{self, ModuleBindings};
use crate::runtime::handshake::{HandshakeState, RegistrationHandshake};
use crate::runtime::realm::LoaderWorker;
use crate::runtime::registry::MockRegistry;
use crate::utils::config::{EngineConfig, LoaderConfig};
use crate::utils::errors::Result;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

/// Registry entries of one mocking call, released on drop
pub struct MockSession {
    registry: Arc<MockRegistry>,
    infos: MockingInfos,
}

impl MockSession {
    pub fn new(registry: Arc<MockRegistry>, infos: MockingInfos) -> Self {
        Self { registry, infos }
    }

    pub fn token(&self) -> &str {
        &self.infos.token
    }

    pub fn infos(&self) -> &MockingInfos {
        &self.infos
    }
}

impl Drop for MockSession {
    fn drop(&mut self) {
        let orphans = self.registry.remove_token(&self.infos.token);
        if orphans > 0 {
            debug!(
                "Released {} unconsumed mock(s) of session {}",
                orphans, self.infos.token
            );
        }
    }
}

/// A module loaded through a synthetic specifier
pub struct MockedModule {
    pub specifier: String,
    pub format: ModuleFormat,

    /// Rewritten source handed back by the loader realm
    pub source: String,

    registry_binding: String,
    session: MockSession,
}

impl MockedModule {
    pub fn session(&self) -> &MockSession {
        &self.session
    }

    /// Run the module's top level against the registry
    pub fn evaluate(&self) -> Result<ModuleBindings> {
        evaluator::evaluate(&self.source, &self.session.registry, &self.registry_binding)
    }
}

/// Process-wide entry point for mocking
pub struct MockEngine {
    config: LoaderConfig,
    codec: MetadataCodec,
    registry: Arc<MockRegistry>,
    worker: Arc<LoaderWorker>,
    handshake: RegistrationHandshake,
}

impl MockEngine {
    /// Engine on the global registry, reading sources from disk
    pub fn new(config: &EngineConfig) -> Result<Self> {
        Self::with_parts(
            config.loader.clone(),
            MockRegistry::global(),
            Arc::new(FsSourceReader),
        )
    }

    pub fn with_parts(
        config: LoaderConfig,
        registry: Arc<MockRegistry>,
        reader: Arc<dyn SourceReader>,
    ) -> Result<Self> {
        config.validate()?;

        let worker = Arc::new(LoaderWorker::spawn(Arc::clone(&reader))?);
        let hook = Arc::new(MockLoaderHook::new(&config, reader));
        let handshake = RegistrationHandshake::new(worker.clone(), hook);

        Ok(Self {
            codec: MetadataCodec::from_config(&config),
            config,
            registry,
            worker,
            handshake,
        })
    }

    /// Install the mock hook; idempotent
    pub async fn initialize(&self) -> Result<()> {
        self.handshake.initialize().await
    }

    pub fn state(&self) -> HandshakeState {
        self.handshake.state()
    }

    pub fn registry(&self) -> &Arc<MockRegistry> {
        &self.registry
    }

    pub fn worker(&self) -> &Arc<LoaderWorker> {
        &self.worker
    }

    /// Load `module_identifier` with the given dependencies replaced
    ///
    /// Keys of `substitutes` are dependency identifiers as the caller would
    /// write them, resolved against `base_location`.
    pub async fn mock_import<I, K>(
        &self,
        module_identifier: &str,
        base_location: &str,
        substitutes: I,
    ) -> Result<MockedModule>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: AsRef<str>,
    {
        self.initialize().await?;

        let infos = self
            .codec
            .register(&self.registry, module_identifier, base_location, substitutes)?;
        let session = MockSession::new(Arc::clone(&self.registry), infos);
        let specifier = self.codec.encode_infos(session.infos())?;

        let LoadResult { format, source, .. } =
            self.worker.load(&specifier, LoadContext::default()).await?;

        info!(
            "Mocked import of {} ready (session {})",
            session.infos().module_identifier,
            session.token()
        );

        Ok(MockedModule {
            specifier,
            format,
            source,
            registry_binding: self.config.registry_binding.clone(),
            session,
        })
    }

    /// Load a specifier through the hook chain without mocking anything
    pub async fn load(&self, specifier: &str, context: LoadContext) -> Result<LoadResult> {
        self.initialize().await?;
        self.worker.load(specifier, context).await
    }
}
