// src/interception/pipeline.rs
//! Host module-loading pipeline boundary
//!
//! The host runs a chain of load hooks ending in its own default loader.
//! Each hook either delegates to the next stage or short-circuits the chain
//! with a finished result.

use crate::runtime::channel::MessagePort;
use crate::utils::errors::Result;
use std::fmt;

/// Module format reported alongside loaded source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleFormat {
    /// ECMAScript module
    Module,
    CommonJs,
    Json,
    /// Host built-in; carries no source
    Builtin,
}

impl ModuleFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModuleFormat::Module => "module",
            ModuleFormat::CommonJs => "commonjs",
            ModuleFormat::Json => "json",
            ModuleFormat::Builtin => "builtin",
        }
    }

    /// Guess the format from a file extension
    pub fn from_extension(path: &str) -> Option<Self> {
        let ext = path.rsplit('.').next()?;
        match ext {
            "mjs" | "js" => Some(ModuleFormat::Module),
            "cjs" => Some(ModuleFormat::CommonJs),
            "json" => Some(ModuleFormat::Json),
            _ => None,
        }
    }
}

impl fmt::Display for ModuleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Context passed down the load chain
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadContext {
    /// Format hint from the resolve stage
    pub format: Option<ModuleFormat>,

    /// Export conditions active for this load
    pub conditions: Vec<String>,
}

/// Output of a load stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadResult {
    pub format: ModuleFormat,
    pub source: String,

    /// Tells the host no further hook may touch this result
    pub short_circuit: bool,
}

impl LoadResult {
    pub fn new(format: ModuleFormat, source: impl Into<String>) -> Self {
        Self {
            format,
            source: source.into(),
            short_circuit: false,
        }
    }

    pub fn short_circuited(mut self) -> Self {
        self.short_circuit = true;
        self
    }
}

/// The remainder of the chain as seen by one hook
pub trait NextLoad {
    fn load(&self, specifier: &str, context: &LoadContext) -> Result<LoadResult>;
}

/// Data handed to a hook when the host installs it
#[derive(Debug)]
pub struct HookInitData {
    /// Hook-side end of the registration channel
    pub port: MessagePort,
}

impl HookInitData {
    pub fn new(port: MessagePort) -> Self {
        Self { port }
    }
}

/// A load hook installed into the host pipeline
pub trait LoaderHook: Send + Sync {
    /// Name used in logs and chain errors
    fn name(&self) -> &str;

    /// Called once in the loader realm right after installation
    fn initialize(&self, data: HookInitData) -> Result<()>;

    /// Load `specifier`, delegating to `next` for anything not owned
    fn load(&self, specifier: &str, context: &LoadContext, next: &dyn NextLoad)
        -> Result<LoadResult>;
}
