// src/interception/mod.rs
//! Load-request interception layer
//!
//! Everything that runs inside the loader realm:
//!
//! - **Metadata**: synthetic specifier codec (`MockingInfos` <-> string)
//! - **Resolver**: canonical absolute identifiers shared by codec and rewriter
//! - **Declarations**: scanner for the recognized `import` grammar
//! - **Rewriter**: registry lookups for mocked dependencies, absolute paths for the rest
//! - **Loader Hook**: pass-through / short-circuit entry point of the pipeline
//! - **Pipeline**: host chain contract (`LoaderHook`, `NextLoad`, `LoadResult`)
//! - **Source Reader**: filesystem collaborator
//!
//! # Architecture
//!
//! ```text
//! "modmock:<base64>" ─► MockLoaderHook::load
//!                           │
//!                           ├─ MetadataCodec::decode ─► MockingInfos
//!                           ├─ SourceReader::read_text(moduleIdentifier)
//!                           └─ SourceRewriter::rewrite
//!                                 ├─ declarations::scan
//!                                 └─ SpecifierResolver::resolve (per declaration)
//! ```

pub mod declarations;
pub mod loader_hook;
pub mod metadata;
pub mod pipeline;
pub mod resolver;
pub mod rewriter;
pub mod source_reader;

// Re-export commonly used types
pub use declarations::{ImportBinding, ImportDeclaration, NamedBinding};
pub use loader_hook::MockLoaderHook;
pub use metadata::{MetadataCodec, MockingInfos};
pub use pipeline::{HookInitData, LoadContext, LoadResult, LoaderHook, ModuleFormat, NextLoad};
pub use resolver::SpecifierResolver;
pub use rewriter::SourceRewriter;
pub use source_reader::{FsSourceReader, SourceReader};
