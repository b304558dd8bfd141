//! Relay registration and pending message buffer
//!
//! At most one connection is the consumer. Every other message is producer
//! traffic: buffered while no consumer is registered, otherwise forwarded
//! after the buffer has been flushed. The registration and the buffer live
//! under one lock, so a flush can never interleave with another append.

use crate::config::RelayConfig;
use parking_lot::Mutex;
use std::collections::VecDeque;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Identifier of one relay connection
pub type ConnId = Uuid;

/// Outbound queue of a connection, drained by its writer task
pub type Outbox = mpsc::UnboundedSender<Message>;

/// What the relay did with a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Sender became the consumer
    Registered,
    /// No consumer; message appended to the buffer
    Buffered,
    /// Buffer flushed and message delivered to the consumer
    Forwarded { flushed: usize },
    /// Consumer registered but its socket is gone; message not delivered
    Dropped,
}

struct Consumer {
    conn_id: ConnId,
    outbox: Outbox,
}

struct Inner {
    consumer: Option<Consumer>,
    pending: VecDeque<Message>,
}

/// Shared relay state
pub struct RelayState {
    control_message: String,
    max_pending: Option<usize>,
    inner: Mutex<Inner>,
}

impl RelayState {
    pub fn new(config: &RelayConfig) -> Self {
        Self {
            control_message: config.control_message.clone(),
            max_pending: config.max_pending,
            inner: Mutex::new(Inner {
                consumer: None,
                pending: VecDeque::new(),
            }),
        }
    }

    fn is_control(&self, message: &Message) -> bool {
        matches!(message, Message::Text(text) if *text == self.control_message)
    }

    /// Handle one message received from `conn_id`
    pub fn on_message(&self, conn_id: ConnId, outbox: &Outbox, message: Message) -> Disposition {
        let mut inner = self.inner.lock();

        if self.is_control(&message) {
            if let Some(previous) = inner.consumer.as_ref() {
                if previous.conn_id != conn_id {
                    info!(previous = %previous.conn_id, consumer = %conn_id, "Consumer replaced");
                }
            }
            inner.consumer = Some(Consumer {
                conn_id,
                outbox: outbox.clone(),
            });
            info!(consumer = %conn_id, pending = inner.pending.len(), "Consumer registered");
            return Disposition::Registered;
        }

        let Inner { consumer, pending } = &mut *inner;
        let Some(consumer) = consumer.as_ref() else {
            if let Some(max) = self.max_pending {
                while pending.len() >= max {
                    pending.pop_front();
                    warn!(max_pending = max, "Pending buffer full, evicted oldest message");
                }
            }
            pending.push_back(message);
            debug!(pending = pending.len(), "No consumer, message buffered");
            return Disposition::Buffered;
        };

        if consumer.outbox.is_closed() {
            debug!(consumer = %consumer.conn_id, "Consumer socket not open, message dropped");
            return Disposition::Dropped;
        }

        let flushed = pending.len();
        for buffered in pending.drain(..) {
            let _ = consumer.outbox.send(buffered);
        }
        let _ = consumer.outbox.send(message);
        if flushed > 0 {
            debug!(flushed, "Flushed pending messages to consumer");
        }
        Disposition::Forwarded { flushed }
    }

    /// Forget `conn_id`; clears the registration when it was the consumer
    ///
    /// Buffered messages are kept for the next consumer.
    pub fn on_disconnect(&self, conn_id: ConnId) {
        let mut inner = self.inner.lock();
        if inner.consumer.as_ref().map(|c| c.conn_id) == Some(conn_id) {
            inner.consumer = None;
            info!(consumer = %conn_id, pending = inner.pending.len(), "Consumer disconnected");
        }
    }

    pub fn has_consumer(&self) -> bool {
        self.inner.lock().consumer.is_some()
    }

    pub fn consumer_id(&self) -> Option<ConnId> {
        self.inner.lock().consumer.as_ref().map(|c| c.conn_id)
    }

    pub fn pending_len(&self) -> usize {
        self.inner.lock().pending.len()
    }
}
