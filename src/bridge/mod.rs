//! Cross-frame bridge.
//!
//! # Responsibilities
//! - Encode/decode the two proxy handshake tokens
//! - Hold the single pending handshake continuation
//!
//! # Design Decisions
//! - One pending slot; whichever of confirmation or timeout happens first
//!   clears it
//! - Unknown messages are ignored, they belong to other scripts on the page

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::time::Duration;

use tokio::sync::oneshot;

pub const PROXY_REQUEST: &str = "jshcms_isInProxy";
pub const PROXY_CONFIRMED: &str = "jshcms_isInProxy_Confirmed";

/// Messages exchanged between an embedding frame and its proxy frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeMessage {
    /// Sent by a nested frame asking whether it is a passthrough proxy.
    ProxyRequest,
    /// Reply from the frame hosting the proxy.
    ProxyConfirmed,
}

impl BridgeMessage {
    pub fn parse(data: &str) -> Option<Self> {
        match data {
            PROXY_REQUEST => Some(BridgeMessage::ProxyRequest),
            PROXY_CONFIRMED => Some(BridgeMessage::ProxyConfirmed),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BridgeMessage::ProxyRequest => PROXY_REQUEST,
            BridgeMessage::ProxyConfirmed => PROXY_CONFIRMED,
        }
    }
}

impl fmt::Display for BridgeMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pending proxy confirmation. Cheap to clone; clones share the slot.
#[derive(Debug, Clone, Default)]
pub struct ProxyHandshake {
    pending: Rc<RefCell<Option<oneshot::Sender<()>>>>,
}

impl ProxyHandshake {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open the slot, replacing any earlier pending handshake.
    pub fn begin(&self) -> oneshot::Receiver<()> {
        let (tx, rx) = oneshot::channel();
        if self.pending.borrow_mut().replace(tx).is_some() {
            tracing::debug!("Replacing pending proxy handshake");
        }
        rx
    }

    /// Complete the pending handshake. Returns false when none is pending.
    pub fn confirm(&self) -> bool {
        match self.pending.borrow_mut().take() {
            Some(tx) => tx.send(()).is_ok(),
            None => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.borrow().is_some()
    }

    /// Wait for [`Self::confirm`] or `timeout`, whichever comes first.
    pub async fn wait(&self, confirmation: oneshot::Receiver<()>, timeout: Duration) -> bool {
        tokio::select! {
            confirmed = confirmation => confirmed.is_ok(),
            _ = tokio::time::sleep(timeout) => {
                self.pending.borrow_mut().take();
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_tokens() {
        assert_eq!(BridgeMessage::parse("jshcms_isInProxy"), Some(BridgeMessage::ProxyRequest));
        assert_eq!(
            BridgeMessage::parse("jshcms_isInProxy_Confirmed"),
            Some(BridgeMessage::ProxyConfirmed)
        );
        assert_eq!(BridgeMessage::parse("hello"), None);
        assert_eq!(BridgeMessage::ProxyConfirmed.to_string(), PROXY_CONFIRMED);
    }

    #[tokio::test]
    async fn test_confirmation_wins() {
        let handshake = ProxyHandshake::new();
        let rx = handshake.begin();
        assert!(handshake.is_pending());
        assert!(handshake.confirm());
        assert!(handshake.wait(rx, Duration::from_secs(5)).await);
        assert!(!handshake.is_pending());
        assert!(!handshake.confirm());
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_clears_slot() {
        let handshake = ProxyHandshake::new();
        let rx = handshake.begin();
        assert!(!handshake.wait(rx, Duration::from_millis(500)).await);
        assert!(!handshake.is_pending());
        assert!(!handshake.confirm());
    }
}
