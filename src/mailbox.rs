//! Bounded per-client mailbox
//!
//! A fixed-capacity FIFO of outbound envelopes with a non-blocking producer
//! side and a blocking-with-cancellation consumer side. Built on a
//! `tokio::sync::mpsc` channel: the sender half lives behind a mutex as an
//! `Option` so that `close` can drop it, which both rejects further enqueues
//! and wakes a receiver blocked in `recv` once the buffer drains.

use std::sync::Mutex as StdMutex;

use tokio::sync::{mpsc, Mutex};

use crate::message::Envelope;

/// Default mailbox capacity
pub const MAILBOX_CAPACITY: usize = 100;

/// Bounded FIFO of envelopes owned by one client session
///
/// Overflow policy: `try_enqueue` on a full mailbox drops the new envelope
/// and reports failure; it never blocks the producer and never evicts older
/// envelopes. Closing is terminal: once closed and drained, `recv` returns
/// `None` forever.
#[derive(Debug)]
pub struct Mailbox {
    /// Producer half; `None` once closed
    tx: StdMutex<Option<mpsc::Sender<Envelope>>>,
    /// Consumer half; the async mutex serializes concurrent listen calls
    rx: Mutex<mpsc::Receiver<Envelope>>,
}

impl Mailbox {
    /// Create an open mailbox with the default capacity
    pub fn new() -> Self {
        Self::with_capacity(MAILBOX_CAPACITY)
    }

    /// Create an open mailbox with the given capacity
    pub fn with_capacity(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        Self {
            tx: StdMutex::new(Some(tx)),
            rx: Mutex::new(rx),
        }
    }

    /// Append an envelope if there is room. Never blocks.
    ///
    /// Returns false without any state change if the mailbox is full or
    /// closed; an enqueue racing with `close` fails safely.
    pub fn try_enqueue(&self, envelope: Envelope) -> bool {
        match self.tx.lock().unwrap().as_ref() {
            Some(tx) => tx.try_send(envelope).is_ok(),
            None => false,
        }
    }

    /// Wait for the next envelope.
    ///
    /// Returns the oldest buffered envelope, or `None` once the mailbox is
    /// closed and drained. `None` is terminal: every later call also
    /// returns `None`.
    pub async fn recv(&self) -> Option<Envelope> {
        self.rx.lock().await.recv().await
    }

    /// Close the mailbox.
    ///
    /// Further `try_enqueue` calls fail; a receiver blocked in `recv` is
    /// woken once buffered envelopes are drained. Called exactly once, from
    /// unregistration.
    pub fn close(&self) {
        self.tx.lock().unwrap().take();
    }

    /// Whether the mailbox has been closed
    pub fn is_closed(&self) -> bool {
        self.tx.lock().unwrap().is_none()
    }
}

impl Default for Mailbox {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::time::timeout;

    use super::*;
    use crate::message::EnvelopeKind;
    use crate::types::ClientId;

    fn envelope(text: &str) -> Envelope {
        Envelope {
            sender_id: ClientId::from("sender"),
            sender_name: "sender".to_string(),
            text: text.to_string(),
            kind: EnvelopeKind::Message,
        }
    }

    #[tokio::test]
    async fn test_fifo_order() {
        let mailbox = Mailbox::new();
        assert!(mailbox.try_enqueue(envelope("e1")));
        assert!(mailbox.try_enqueue(envelope("e2")));
        assert!(mailbox.try_enqueue(envelope("e3")));

        assert_eq!(mailbox.recv().await.unwrap().text, "e1");
        assert_eq!(mailbox.recv().await.unwrap().text, "e2");
        assert_eq!(mailbox.recv().await.unwrap().text, "e3");
    }

    #[tokio::test]
    async fn test_drop_newest_on_overflow() {
        let mailbox = Mailbox::with_capacity(2);
        assert!(mailbox.try_enqueue(envelope("e1")));
        assert!(mailbox.try_enqueue(envelope("e2")));
        // Full: the new envelope is dropped, nothing is evicted.
        assert!(!mailbox.try_enqueue(envelope("e3")));

        assert_eq!(mailbox.recv().await.unwrap().text, "e1");
        assert_eq!(mailbox.recv().await.unwrap().text, "e2");
    }

    #[tokio::test]
    async fn test_enqueue_after_close_fails() {
        let mailbox = Mailbox::new();
        mailbox.close();
        assert!(mailbox.is_closed());
        assert!(!mailbox.try_enqueue(envelope("late")));
    }

    #[tokio::test]
    async fn test_close_drains_then_terminates() {
        let mailbox = Mailbox::new();
        assert!(mailbox.try_enqueue(envelope("buffered")));
        mailbox.close();

        // Buffered envelope still delivered after close.
        assert_eq!(mailbox.recv().await.unwrap().text, "buffered");
        // Then closed, terminally.
        assert!(mailbox.recv().await.is_none());
        assert!(mailbox.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_close_wakes_blocked_receiver() {
        let mailbox = Arc::new(Mailbox::new());

        let waiter = {
            let mailbox = Arc::clone(&mailbox);
            tokio::spawn(async move { mailbox.recv().await })
        };

        // Give the waiter time to park in recv.
        tokio::time::sleep(Duration::from_millis(10)).await;
        mailbox.close();

        let result = timeout(Duration::from_secs(1), waiter)
            .await
            .expect("receiver was not woken by close")
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_enqueue_wakes_blocked_receiver() {
        let mailbox = Arc::new(Mailbox::new());

        let waiter = {
            let mailbox = Arc::clone(&mailbox);
            tokio::spawn(async move { mailbox.recv().await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(mailbox.try_enqueue(envelope("wake")));

        let result = timeout(Duration::from_secs(1), waiter)
            .await
            .expect("receiver was not woken by enqueue")
            .unwrap();
        assert_eq!(result.unwrap().text, "wake");
    }
}
