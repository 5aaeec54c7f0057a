// src/lib.rs
//! Modmock Module-Mocking Engine Library
//!
//! Lets a test replace selected dependencies of a module with substitute
//! values, without touching the dependencies' sources and without rewriting
//! anything on disk.
//!
//! # Architecture
//!
//! The engine is structured into several key modules:
//!
//! - **interception**: synthetic specifiers, import rewriting, the loader hook
//! - **runtime**: registry, loader realm, registration handshake, mocking sessions
//! - **observability**: tracing setup and metric names
//! - **utils**: configuration and errors
//!
//! # Example
//!
//! ```no_run
//! use modmock_engine::{EngineConfig, MockEngine};
//! use serde_json::json;
//!
//! # async fn demo() -> modmock_engine::Result<()> {
//! let engine = MockEngine::new(&EngineConfig::load()?)?;
//! engine.initialize().await?;
//!
//! let module = engine
//!     .mock_import(
//!         "./service.js",
//!         "file:///project/test/service.test.js",
//!         [("./db.js", json!({ "default": { "query": null } }))],
//!     )
//!     .await?;
//!
//! let bindings = module.evaluate()?;
//! # let _ = bindings;
//! # Ok(())
//! # }
//! ```

// Public module exports
pub mod interception;
pub mod observability;
pub mod runtime;
pub mod utils;

// Re-export commonly used types
pub use interception::loader_hook::MockLoaderHook;
pub use interception::metadata::{MetadataCodec, MockingInfos};
pub use interception::rewriter::SourceRewriter;
pub use runtime::engine::{MockEngine, MockSession, MockedModule};
pub use runtime::registry::MockRegistry;
pub use utils::config::EngineConfig;
pub use utils::errors::{EngineError, Result};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const GIT_HASH: &str = env!("GIT_HASH");

/// Engine build information
pub struct BuildInfo {
    pub version: &'static str,
    pub git_hash: &'static str,
    pub build_timestamp: &'static str,
    pub rustc_version: &'static str,
}

impl BuildInfo {
    pub fn current() -> Self {
        Self {
            version: VERSION,
            git_hash: GIT_HASH,
            build_timestamp: env!("BUILD_TIMESTAMP"),
            rustc_version: env!("RUSTC_VERSION"),
        }
    }
}
