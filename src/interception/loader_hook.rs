// src/interception/loader_hook.rs
//! The mock loader hook
//!
//! Owns every specifier that starts with the reserved prefix and leaves all
//! others to the next stage of the chain:
//!
//! ```text
//! specifier ──┬─ not prefixed ──────────────────────────► next.load()
//!             └─ prefixed ─► decode ─► read ─► rewrite ─► short-circuit
//! ```

use crate::interception::metadata::MetadataCodec;
use crate::interception::pipeline::{
    HookInitData, LoadContext, LoadResult, LoaderHook, ModuleFormat, NextLoad,
};
use crate::interception::rewriter::SourceRewriter;
use crate::interception::source_reader::{FsSourceReader, SourceReader};
use crate::observability::LOADS_TOTAL;
use crate::runtime::channel::{HookMessage, MessagePort};
use crate::utils::config::LoaderConfig;
use crate::utils::errors::{EngineError, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::{debug, info, warn};
use ulid::Ulid;

/// Load hook that serves rewritten sources for synthetic specifiers
pub struct MockLoaderHook {
    codec: MetadataCodec,
    rewriter: SourceRewriter,
    reader: Arc<dyn SourceReader>,

    /// Port kept alive after the ready signal
    port: Mutex<Option<MessagePort>>,
}

impl MockLoaderHook {
    pub fn new(config: &LoaderConfig, reader: Arc<dyn SourceReader>) -> Self {
        Self {
            codec: MetadataCodec::from_config(config),
            rewriter: SourceRewriter::from_config(config),
            reader,
            port: Mutex::new(None),
        }
    }

    pub fn codec(&self) -> &MetadataCodec {
        &self.codec
    }

    fn load_synthetic(&self, specifier: &str) -> Result<LoadResult> {
        let infos = self.codec.decode(specifier)?;

        let source = self
            .reader
            .read_text(&infos.module_identifier)
            .map_err(|source| EngineError::SourceUnavailable {
                identifier: infos.module_identifier.clone(),
                source,
            })?;

        let rewritten = self.rewriter.rewrite(&source, &infos)?;

        info!(
            "Serving mocked {} (session {}, {} dependencies)",
            infos.module_identifier,
            infos.token,
            infos.dependency_identifiers.len()
        );

        Ok(LoadResult::new(ModuleFormat::Module, rewritten).short_circuited())
    }
}

impl Default for MockLoaderHook {
    fn default() -> Self {
        Self::new(&LoaderConfig::default(), Arc::new(FsSourceReader))
    }
}

impl LoaderHook for MockLoaderHook {
    fn name(&self) -> &str {
        "modmock"
    }

    fn initialize(&self, data: HookInitData) -> Result<()> {
        let correlation_id = Ulid::new().to_string();
        let mut port = self.port.lock();

        if port.is_some() {
            warn!(
                "Mock loader hook initialized twice (new correlation id {})",
                correlation_id
            );
        }

        data.port.post(HookMessage::Ready {
            correlation_id: correlation_id.clone(),
        })?;
        *port = Some(data.port);

        debug!("Mock loader hook ready ({})", correlation_id);
        Ok(())
    }

    fn load(
        &self,
        specifier: &str,
        context: &LoadContext,
        next: &dyn NextLoad,
    ) -> Result<LoadResult> {
        if !self.codec.is_synthetic(specifier) {
            metrics::counter!(LOADS_TOTAL, "kind" => "passthrough").increment(1);
            return next.load(specifier, context);
        }

        metrics::counter!(LOADS_TOTAL, "kind" => "synthetic").increment(1);
        self.load_synthetic(specifier)
    }
}
