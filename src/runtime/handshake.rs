// src/runtime/handshake.rs
//! Registration handshake
//!
//! Installing a hook into the loader realm is asynchronous: the host accepts
//! the hook and returns before the hook is live. Mocking before the hook is
//! live would let the first synthetic load race past it, so the caller waits
//! for the hook's ready signal on a dedicated channel.
//!
//! ```text
//! NotReady ──initialize()──► Registering ──Ready──► Ready
//!                                 │
//!                                 └──Failed / channel closed──► Failed
//! ```

use crate::interception::pipeline::{HookInitData, LoaderHook};
use crate::runtime::channel::{HookMessage, MessageChannel, MessagePort};
use crate::utils::errors::{EngineError, Result};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, error, info};

/// Something that can install a hook into a loader realm
pub trait HookHost: Send + Sync {
    /// Queue `hook` for installation; readiness is reported over `data.port`
    fn register(&self, hook: Arc<dyn LoaderHook>, data: HookInitData) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    NotReady,
    Registering,
    Ready,
    /// Terminal; every later `initialize` fails with the original reason
    Failed,
}

/// One-time, idempotent hook installation
pub struct RegistrationHandshake {
    host: Arc<dyn HookHost>,
    hook: Arc<dyn LoaderHook>,
    state: Mutex<HandshakeState>,
    failure: Mutex<Option<String>>,

    /// Caller side of an installation still waiting for its ready signal;
    /// outlives a cancelled `initialize` so the next one resumes the wait
    pending: tokio::sync::Mutex<Option<MessagePort>>,

    /// Correlation id of the confirmed installation
    ready: OnceCell<String>,
}

impl RegistrationHandshake {
    pub fn new(host: Arc<dyn HookHost>, hook: Arc<dyn LoaderHook>) -> Self {
        Self {
            host,
            hook,
            state: Mutex::new(HandshakeState::NotReady),
            failure: Mutex::new(None),
            pending: tokio::sync::Mutex::new(None),
            ready: OnceCell::new(),
        }
    }

    pub fn state(&self) -> HandshakeState {
        *self.state.lock()
    }

    pub fn is_ready(&self) -> bool {
        self.state() == HandshakeState::Ready
    }

    /// Correlation id sent by the hook, once ready
    pub fn correlation_id(&self) -> Option<&str> {
        self.ready.get().map(String::as_str)
    }

    /// Install the hook and wait until it reports ready
    ///
    /// Concurrent callers share one installation and all resolve on the same
    /// ready signal. No timeout is applied here; a caller may wrap this in
    /// `tokio::time::timeout` and retry, the hook is still installed once.
    pub async fn initialize(&self) -> Result<()> {
        self.ready.get_or_try_init(|| self.register()).await?;
        Ok(())
    }

    async fn register(&self) -> Result<String> {
        // A waiter that inherits the init slot after a failure must not register again
        if let Some(reason) = self.failure.lock().clone() {
            return Err(EngineError::Handshake(reason));
        }

        let mut pending = self.pending.lock().await;
        let port = match pending.take() {
            Some(port) => {
                debug!("Resuming wait for loader hook '{}'", self.hook.name());
                port
            }
            None => self.install()?,
        };

        // Parked before awaiting: if this future is dropped the port survives
        let message = pending.insert(port).recv().await;
        *pending = None;

        match message {
            Some(HookMessage::Ready { correlation_id }) => {
                self.set_state(HandshakeState::Ready);
                info!(
                    "Loader hook '{}' ready (correlation id {})",
                    self.hook.name(),
                    correlation_id
                );
                Ok(correlation_id)
            }
            Some(HookMessage::Failed { reason }) => Err(self.fail(reason)),
            None => Err(self.fail(
                "hook dropped its message port before signalling readiness".to_string(),
            )),
        }
    }

    /// Hand the hook to the host; returns the caller side of its channel
    fn install(&self) -> Result<MessagePort> {
        self.set_state(HandshakeState::Registering);
        debug!("Registering loader hook '{}'", self.hook.name());

        let (local, remote) = MessageChannel::pair();
        match self
            .host
            .register(Arc::clone(&self.hook), HookInitData::new(remote))
        {
            Ok(()) => Ok(local),
            Err(e) => Err(self.fail(format!("host rejected hook: {}", e))),
        }
    }

    fn set_state(&self, state: HandshakeState) {
        *self.state.lock() = state;
    }

    fn fail(&self, reason: String) -> EngineError {
        error!("Loader hook registration failed: {}", reason);
        *self.failure.lock() = Some(reason.clone());
        self.set_state(HandshakeState::Failed);
        EngineError::Handshake(reason)
    }
}
