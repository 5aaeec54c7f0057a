// src/runtime/realm.rs
//! Loader realm
//!
//! A dedicated thread that owns the hook chain. Nothing in it is shared with
//! the caller: hooks arrive through `register`, load requests through `load`,
//! and everything crosses over a command queue.
//!
//! ```text
//! caller realm                         loader realm (thread)
//!   register(hook, port) ──command──►  chain.push(hook); hook.initialize(port)
//!   load(specifier) ───────command──►  last hook → ... → first hook → default load
//!           ◄──────────── oneshot ───  LoadResult
//! ```

use crate::interception::pipeline::{
    HookInitData, LoadContext, LoadResult, LoaderHook, ModuleFormat, NextLoad,
};
use crate::interception::source_reader::SourceReader;
use crate::runtime::handshake::HookHost;
use crate::utils::errors::{EngineError, Result};
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use std::cell::Cell;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tokio::sync::oneshot;
use tracing::{debug, error, warn};
use url::Url;

enum WorkerCommand {
    Register {
        hook: Arc<dyn LoaderHook>,
        data: HookInitData,
    },
    Load {
        specifier: String,
        context: LoadContext,
        reply: oneshot::Sender<Result<LoadResult>>,
    },
    Shutdown,
}

/// Handle to the loader realm thread
pub struct LoaderWorker {
    commands: Sender<WorkerCommand>,
    thread: Mutex<Option<JoinHandle<()>>>,
}

impl LoaderWorker {
    /// Start the loader realm with the host's default load stage on top of `reader`
    pub fn spawn(reader: Arc<dyn SourceReader>) -> Result<Self> {
        let (commands, receiver) = unbounded();

        let thread = thread::Builder::new()
            .name("modmock-loader".into())
            .spawn(move || run(receiver, DefaultLoad { reader }))
            .map_err(|e| EngineError::WorkerUnavailable(format!("cannot spawn loader thread: {}", e)))?;

        debug!("Loader realm started");

        Ok(Self {
            commands,
            thread: Mutex::new(Some(thread)),
        })
    }

    /// Run `specifier` through the hook chain
    pub async fn load(&self, specifier: &str, context: LoadContext) -> Result<LoadResult> {
        let (reply, response) = oneshot::channel();

        self.commands
            .send(WorkerCommand::Load {
                specifier: specifier.to_string(),
                context,
                reply,
            })
            .map_err(|_| EngineError::WorkerUnavailable("loader realm has shut down".into()))?;

        response
            .await
            .map_err(|_| EngineError::WorkerUnavailable("loader realm dropped the request".into()))?
    }

    /// Stop the thread after queued commands are processed
    pub fn shutdown(&self) {
        if self.commands.send(WorkerCommand::Shutdown).is_err() {
            debug!("Loader realm already stopped; shutdown request dropped");
        }

        if let Some(handle) = self.thread.lock().take() {
            if handle.join().is_err() {
                error!("Loader realm thread panicked");
            }
        }
    }
}

impl HookHost for LoaderWorker {
    fn register(&self, hook: Arc<dyn LoaderHook>, data: HookInitData) -> Result<()> {
        self.commands
            .send(WorkerCommand::Register { hook, data })
            .map_err(|_| EngineError::WorkerUnavailable("loader realm has shut down".into()))
    }
}

impl Drop for LoaderWorker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run(receiver: Receiver<WorkerCommand>, terminal: DefaultLoad) {
    let mut hooks: Vec<Arc<dyn LoaderHook>> = Vec::new();

    for command in receiver.iter() {
        match command {
            WorkerCommand::Register { hook, data } => {
                debug!("Installing loader hook '{}'", hook.name());
                match hook.initialize(data) {
                    Ok(()) => hooks.push(hook),
                    Err(e) => error!("Loader hook '{}' failed to initialize: {}", hook.name(), e),
                }
            }
            WorkerCommand::Load {
                specifier,
                context,
                reply,
            } => {
                let chain = HookChain {
                    hooks: &hooks,
                    terminal: &terminal,
                };
                let result = chain.load(&specifier, &context);
                if reply.send(result).is_err() {
                    warn!("Load requester for {} went away", specifier);
                }
            }
            WorkerCommand::Shutdown => break,
        }
    }

    debug!("Loader realm stopped");
}

/// Hooks still to run, most recently registered last
struct HookChain<'a> {
    hooks: &'a [Arc<dyn LoaderHook>],
    terminal: &'a dyn NextLoad,
}

impl NextLoad for HookChain<'_> {
    fn load(&self, specifier: &str, context: &LoadContext) -> Result<LoadResult> {
        let Some((hook, rest)) = self.hooks.split_last() else {
            return self.terminal.load(specifier, context);
        };

        let next = TrackedNext {
            chain: HookChain {
                hooks: rest,
                terminal: self.terminal,
            },
            called: Cell::new(false),
        };

        let result = hook.load(specifier, context, &next)?;
        if !result.short_circuit && !next.called.get() {
            return Err(EngineError::ChainIncomplete {
                hook: hook.name().to_string(),
                specifier: specifier.to_string(),
            });
        }

        Ok(result)
    }
}

struct TrackedNext<'a> {
    chain: HookChain<'a>,
    called: Cell<bool>,
}

impl NextLoad for TrackedNext<'_> {
    fn load(&self, specifier: &str, context: &LoadContext) -> Result<LoadResult> {
        self.called.set(true);
        self.chain.load(specifier, context)
    }
}

/// Host default load stage: builtins and local files
struct DefaultLoad {
    reader: Arc<dyn SourceReader>,
}

impl NextLoad for DefaultLoad {
    fn load(&self, specifier: &str, context: &LoadContext) -> Result<LoadResult> {
        if specifier.starts_with("node:") {
            return Ok(LoadResult::new(ModuleFormat::Builtin, ""));
        }

        let is_file = Url::parse(specifier)
            .map(|url| url.scheme() == "file")
            .unwrap_or(false);
        if !is_file {
            return Err(EngineError::UnsupportedSource(specifier.to_string()));
        }

        let source = self
            .reader
            .read_text(specifier)
            .map_err(|source| EngineError::SourceUnavailable {
                identifier: specifier.to_string(),
                source,
            })?;

        let format = context
            .format
            .or_else(|| ModuleFormat::from_extension(specifier))
            .unwrap_or(ModuleFormat::Module);

        Ok(LoadResult::new(format, source))
    }
}
