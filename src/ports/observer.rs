//! Consumer-facing notifications.
//!
//! The controller reports every decided candidate and every connection
//! transition through a [`SniperObserver`]. Hosts that would rather drain a
//! queue can use [`ChannelObserver`], which forwards the same notifications
//! as [`SniperEvent`] values in delivery order.

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

use crate::domain::candidate::Candidate;

/// Callbacks invoked by the controller
pub trait SniperObserver: Send + Sync {
    /// A candidate passed every filter
    fn on_new_token_detected(&self, candidate: &Candidate);

    /// A candidate was rejected by the filter
    fn on_candidate_filtered(&self, _candidate: &Candidate) {}

    fn on_connected(&self);

    fn on_disconnected(&self);

    /// Fatal pipeline error (reported once)
    fn on_error(&self, message: &str);
}

/// Observer notifications as values
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SniperEvent {
    NewToken { candidate: Candidate },
    Filtered { candidate: Candidate },
    Connected,
    Disconnected,
    Error { message: String },
}

/// Observer forwarding every notification into an unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    tx: mpsc::UnboundedSender<SniperEvent>,
}

impl ChannelObserver {
    /// Create an observer and the receiving end of its queue
    pub fn new() -> (Self, mpsc::UnboundedReceiver<SniperEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: SniperEvent) {
        if self.tx.send(event).is_err() {
            debug!("Event receiver dropped, discarding event");
        }
    }
}

impl SniperObserver for ChannelObserver {
    fn on_new_token_detected(&self, candidate: &Candidate) {
        self.send(SniperEvent::NewToken {
            candidate: candidate.clone(),
        });
    }

    fn on_candidate_filtered(&self, candidate: &Candidate) {
        self.send(SniperEvent::Filtered {
            candidate: candidate.clone(),
        });
    }

    fn on_connected(&self) {
        self.send(SniperEvent::Connected);
    }

    fn on_disconnected(&self) {
        self.send(SniperEvent::Disconnected);
    }

    fn on_error(&self, message: &str) {
        self.send(SniperEvent::Error {
            message: message.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::candidate::SourceType;

    #[tokio::test]
    async fn test_channel_observer_preserves_order() {
        let (observer, mut rx) = ChannelObserver::new();
        let candidate = Candidate::new("Mint111", SourceType::TokenCreation);

        observer.on_connected();
        observer.on_new_token_detected(&candidate);
        observer.on_disconnected();
        observer.on_error("boom");

        assert!(matches!(rx.recv().await, Some(SniperEvent::Connected)));
        match rx.recv().await {
            Some(SniperEvent::NewToken { candidate }) => assert_eq!(candidate.mint_address, "Mint111"),
            other => panic!("unexpected event: {:?}", other),
        }
        assert!(matches!(rx.recv().await, Some(SniperEvent::Disconnected)));
        match rx.recv().await {
            Some(SniperEvent::Error { message }) => assert_eq!(message, "boom"),
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_dropped_receiver_is_ignored() {
        let (observer, rx) = ChannelObserver::new();
        drop(rx);
        observer.on_connected();
    }

    #[test]
    fn test_event_serializes_with_tag() {
        let json = serde_json::to_string(&SniperEvent::Error {
            message: "x".to_string(),
        })
        .unwrap();
        assert_eq!(json, r#"{"event":"error","message":"x"}"#);
    }
}
