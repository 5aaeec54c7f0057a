// src/runtime/channel.rs
//! Bidirectional message channel between the caller realm and the loader realm
//!
//! Each side holds one `MessagePort`. What one port posts, the other
//! receives. Dropping a port closes the direction it sends on.

use crate::utils::errors::{EngineError, Result};
use tokio::sync::mpsc;

/// Messages exchanged during hook registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HookMessage {
    /// Hook is installed and live
    Ready { correlation_id: String },
    /// Hook could not come up
    Failed { reason: String },
}

/// Factory for connected port pairs
pub struct MessageChannel;

impl MessageChannel {
    pub fn pair() -> (MessagePort, MessagePort) {
        let (a_tx, a_rx) = mpsc::unbounded_channel();
        let (b_tx, b_rx) = mpsc::unbounded_channel();

        (
            MessagePort { tx: a_tx, rx: b_rx },
            MessagePort { tx: b_tx, rx: a_rx },
        )
    }
}

/// One end of a `MessageChannel`
#[derive(Debug)]
pub struct MessagePort {
    tx: mpsc::UnboundedSender<HookMessage>,
    rx: mpsc::UnboundedReceiver<HookMessage>,
}

impl MessagePort {
    /// Send to the peer; fails once the peer port is gone
    pub fn post(&self, message: HookMessage) -> Result<()> {
        self.tx
            .send(message)
            .map_err(|e| EngineError::ChannelClosed(format!("peer dropped, lost {:?}", e.0)))
    }

    /// Next message from the peer; `None` once the peer is gone and drained
    pub async fn recv(&mut self) -> Option<HookMessage> {
        self.rx.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ports_are_crossed() {
        let (mut left, mut right) = MessageChannel::pair();

        left.post(HookMessage::Ready {
            correlation_id: "c1".into(),
        })
        .unwrap();
        right
            .post(HookMessage::Failed {
                reason: "nope".into(),
            })
            .unwrap();

        assert_eq!(
            right.recv().await,
            Some(HookMessage::Ready {
                correlation_id: "c1".into()
            })
        );
        assert_eq!(
            left.recv().await,
            Some(HookMessage::Failed {
                reason: "nope".into()
            })
        );
    }

    #[tokio::test]
    async fn test_dropped_peer_closes() {
        let (mut left, right) = MessageChannel::pair();
        drop(right);

        assert!(left.recv().await.is_none());
        assert!(matches!(
            left.post(HookMessage::Failed { reason: "x".into() }),
            Err(EngineError::ChannelClosed(_))
        ));
    }
}
