//! Ordered, cancellation-aware event delivery for one turn.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::wire::OutboundEvent;

/// Delivers a turn's events to its client channel.
///
/// Events go out in call order. At most one terminal event (`done` or
/// `error`) is delivered and nothing follows it. Once the turn is cancelled,
/// or the receiving side is dropped, every emit is a no-op.
#[derive(Debug)]
pub struct EventEmitter {
    turn_id: String,
    tx: mpsc::Sender<OutboundEvent>,
    cancel: CancellationToken,
    seq: AtomicU64,
    terminated: AtomicBool,
}

impl EventEmitter {
    pub fn new(
        turn_id: impl Into<String>,
        tx: mpsc::Sender<OutboundEvent>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            turn_id: turn_id.into(),
            tx,
            cancel,
            seq: AtomicU64::new(1),
            terminated: AtomicBool::new(false),
        }
    }

    /// Deliver a non-terminal event. Returns `false` if it was suppressed.
    ///
    /// Terminal events passed here are routed through [`Self::finish`].
    pub async fn emit(&self, event: OutboundEvent) -> bool {
        if event.is_terminal() {
            return self.finish(event).await;
        }
        if self.terminated.load(Ordering::SeqCst) {
            tracing::debug!(turn_id = %self.turn_id, kind = event.kind(), "event after terminal dropped");
            return false;
        }
        self.send(event).await
    }

    /// Deliver the terminal event. Only the first call has any effect.
    pub async fn finish(&self, event: OutboundEvent) -> bool {
        if self.terminated.swap(true, Ordering::SeqCst) {
            tracing::debug!(turn_id = %self.turn_id, kind = event.kind(), "duplicate terminal event dropped");
            return false;
        }
        self.send(event).await
    }

    /// Mark the stream closed without delivering anything else.
    pub fn close(&self) {
        self.terminated.store(true, Ordering::SeqCst);
    }

    /// Resolves once the turn is cancelled or the receiver is gone. A dropped
    /// receiver cancels the turn.
    pub async fn stopped(&self) {
        tokio::select! {
            _ = self.cancel.cancelled() => {}
            _ = self.tx.closed() => {
                tracing::info!(turn_id = %self.turn_id, "event receiver dropped; cancelling turn");
                self.cancel.cancel();
            }
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    async fn send(&self, event: OutboundEvent) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        let kind = event.kind();
        let sent = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            sent = self.tx.send(event) => sent.is_ok(),
        };
        if !sent {
            if !self.cancel.is_cancelled() {
                tracing::info!(turn_id = %self.turn_id, "event receiver dropped; cancelling turn");
                self.cancel.cancel();
            }
            return false;
        }
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        tracing::trace!(turn_id = %self.turn_id, seq, kind, "event emitted");
        true
    }
}

/// Events for a request that cannot reach the upstream because no API key is
/// configured: a warning, then a normal `done`.
pub fn missing_api_key_events(env_var: &str) -> Vec<OutboundEvent> {
    vec![
        OutboundEvent::Warning {
            message: format!("Set {env_var} to enable streaming."),
            code: None,
        },
        OutboundEvent::done(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn content(text: &str) -> OutboundEvent {
        OutboundEvent::Content {
            content: text.into(),
            round: 0,
        }
    }

    #[tokio::test]
    async fn nothing_follows_the_terminal_event() {
        let (tx, mut rx) = mpsc::channel(8);
        let emitter = EventEmitter::new("t", tx, CancellationToken::new());

        assert!(emitter.emit(content("a")).await);
        assert!(emitter.finish(OutboundEvent::done()).await);
        assert!(!emitter.emit(content("late")).await);
        assert!(!emitter.emit(OutboundEvent::Error { error: "x".into() }).await);
        drop(emitter);

        let mut received = Vec::new();
        while let Some(event) = rx.recv().await {
            received.push(event);
        }
        assert_eq!(received, vec![content("a"), OutboundEvent::done()]);
    }

    #[tokio::test]
    async fn cancellation_suppresses_everything() {
        let (tx, mut rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        let emitter = EventEmitter::new("t", tx, cancel.clone());

        cancel.cancel();
        assert!(!emitter.emit(content("a")).await);
        assert!(!emitter.finish(OutboundEvent::done()).await);
        drop(emitter);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn dropped_receiver_cancels_the_turn() {
        let (tx, rx) = mpsc::channel(8);
        let cancel = CancellationToken::new();
        let emitter = EventEmitter::new("t", tx, cancel.clone());
        drop(rx);

        assert!(!emitter.emit(content("a")).await);
        assert!(cancel.is_cancelled());
        assert!(!emitter.emit(content("b")).await);
    }

    #[test]
    fn missing_key_stream_is_a_warning_then_done() {
        let events = missing_api_key_events("OPENROUTER_API_KEY");
        assert_eq!(events.len(), 2);
        assert!(matches!(&events[0], OutboundEvent::Warning { message, code: None } if message == "Set OPENROUTER_API_KEY to enable streaming."));
        assert_eq!(events[1], OutboundEvent::done());
    }
}
