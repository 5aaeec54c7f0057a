// src/runtime/mod.rs
//! Realms and their meeting points
//!
//! - **Registry**: execution-realm store of substitute values
//! - **Channel**: bidirectional message ports between realms
//! - **Realm**: the loader thread owning the hook chain
//! - **Handshake**: one-time hook installation with a ready rendezvous
//! - **Evaluator**: runs the engine-emitted top level of a rewritten module
//! - **Engine**: caller facade and scoped mocking sessions
//!
//! # Architecture
//!
//! ```text
//! ┌──────────── caller / execution realm ────────────┐   ┌──── loader realm ────┐
//! │ MockEngine ── MetadataCodec ──► MockRegistry      │   │                      │
//! │     │                               ▲             │   │  hook chain          │
//! │     ├─ RegistrationHandshake ◄──────┼── port ─────┼───┼─ MockLoaderHook      │
//! │     └─ LoaderWorker::load ──────────┼─ command ───┼──►│  DefaultLoad         │
//! │ MockedModule::evaluate ─────────────┘             │   │                      │
//! └───────────────────────────────────────────────────┘   └──────────────────────┘
//! ```

pub mod channel;
pub mod engine;
pub mod evaluator;
pub mod handshake;
pub mod realm;
pub mod registry;

// Re-export commonly used types
pub use channel::{HookMessage, MessageChannel, MessagePort};
pub use engine::{MockEngine, MockSession, MockedModule};
pub use evaluator::ModuleBindings;
pub use handshake::{HandshakeState, HookHost, RegistrationHandshake};
pub use realm::LoaderWorker;
pub use registry::MockRegistry;
