//! Buffered WebSocket event channel
//!
//! Events produced before the socket is open (or while it reconnects) wait in
//! the pending queue. The queue and the ready flag live under one lock, so a
//! drain on open and a concurrent `send` can never interleave: an event is
//! either drained with the backlog or sent after it.

use super::reconnect::ReconnectionPolicy;
use crate::config::{TraceConfig, DEFAULT_WRITE_TIMEOUT_MS};
use crate::trace::{EventSink, TraceEvent};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{timeout, timeout_at, Instant};
use tokio_tungstenite::{connect_async, tungstenite::Message, WebSocketStream};
use tracing::{debug, info, warn};

/// Event channel state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    /// Socket is being opened; events are queued
    Connecting,
    /// Socket is open; events are transmitted
    Ready,
    /// Socket failed or was closed by the peer; a reconnect may follow
    Erroring,
    /// Channel stopped; events are queued but never transmitted
    Closed,
}

struct Queue {
    state: ChannelState,
    pending: VecDeque<TraceEvent>,
    outbound: Option<mpsc::UnboundedSender<TraceEvent>>,
}

struct Shared {
    url: String,
    write_timeout: Duration,
    queue: Mutex<Queue>,
}

impl Shared {
    fn set_state(&self, state: ChannelState) {
        self.queue.lock().state = state;
    }

    /// Switch to ready, moving the whole backlog into the writer first
    fn mark_ready(&self, tx: mpsc::UnboundedSender<TraceEvent>) -> usize {
        let mut queue = self.queue.lock();
        let drained = queue.pending.len();
        for event in queue.pending.drain(..) {
            // The receiver is owned by the caller and still alive
            let _ = tx.send(event);
        }
        queue.outbound = Some(tx);
        queue.state = ChannelState::Ready;
        drained
    }

    /// Leave the ready state, returning accepted-but-unwritten events to the
    /// front of the pending queue in their original order
    fn detach(
        &self,
        state: ChannelState,
        rx: &mut mpsc::UnboundedReceiver<TraceEvent>,
        failed: Option<TraceEvent>,
    ) -> usize {
        let mut queue = self.queue.lock();
        queue.state = state;
        queue.outbound = None;

        let mut requeue: Vec<TraceEvent> = failed.into_iter().collect();
        while let Ok(event) = rx.try_recv() {
            requeue.push(event);
        }
        let count = requeue.len();
        for event in requeue.into_iter().rev() {
            queue.pending.push_front(event);
        }
        count
    }

    fn take_pending(&self) -> VecDeque<TraceEvent> {
        std::mem::take(&mut self.queue.lock().pending)
    }

    fn restore_pending(&self, mut unsent: VecDeque<TraceEvent>) {
        let mut queue = self.queue.lock();
        unsent.extend(queue.pending.drain(..));
        queue.pending = unsent;
    }
}

enum PumpOutcome {
    Disconnected,
    Shutdown,
}

/// Persistent WebSocket connection to a trace collector
///
/// `send` never blocks and never fails: while the socket is not open the
/// event is queued, and the queue is drained in order as soon as the socket
/// becomes ready.
pub struct EventChannel {
    shared: Arc<Shared>,
    shutdown_tx: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl EventChannel {
    /// Open a channel to `url`
    ///
    /// Returns immediately; the socket is established in the background.
    /// Must be called from within a tokio runtime.
    pub fn open(url: impl Into<String>, policy: ReconnectionPolicy) -> Self {
        Self::open_with_timeout(
            url,
            policy,
            Duration::from_millis(DEFAULT_WRITE_TIMEOUT_MS),
        )
    }

    /// Open a channel whose socket writes give up after `write_timeout`
    ///
    /// A write that times out while ready counts as a disconnect. During
    /// `close()` the whole flush shares one `write_timeout` deadline; events
    /// left unwritten stay in the pending queue.
    pub fn open_with_timeout(
        url: impl Into<String>,
        policy: ReconnectionPolicy,
        write_timeout: Duration,
    ) -> Self {
        let shared = Arc::new(Shared {
            url: url.into(),
            write_timeout,
            queue: Mutex::new(Queue {
                state: ChannelState::Connecting,
                pending: VecDeque::new(),
                outbound: None,
            }),
        });

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(run(Arc::clone(&shared), policy, shutdown_rx));

        Self {
            shared,
            shutdown_tx,
            task: Mutex::new(Some(task)),
        }
    }

    /// Open a channel using the collector URL and reconnection policy from
    /// `config`
    pub fn from_config(config: &TraceConfig) -> crate::Result<Self> {
        config.validate()?;
        Ok(Self::open_with_timeout(
            config.collector_url.clone(),
            config.reconnect.clone(),
            config.write_timeout(),
        ))
    }

    /// Queue or transmit an event
    pub fn send(&self, event: TraceEvent) {
        let mut queue = self.shared.queue.lock();

        if queue.state == ChannelState::Ready {
            let result = match queue.outbound.as_ref() {
                Some(tx) => tx.send(event).map_err(|e| e.0),
                None => Err(event),
            };
            match result {
                Ok(()) => return,
                Err(event) => {
                    // Writer went away between state updates
                    queue.state = ChannelState::Erroring;
                    queue.outbound = None;
                    queue.pending.push_back(event);
                    return;
                }
            }
        }

        if queue.state == ChannelState::Closed {
            debug!(method = %event.method, "Event channel closed, retaining event");
        }
        queue.pending.push_back(event);
    }

    /// Current channel state
    pub fn state(&self) -> ChannelState {
        self.shared.queue.lock().state
    }

    /// Number of events waiting for the socket
    pub fn pending_len(&self) -> usize {
        self.shared.queue.lock().pending.len()
    }

    /// Collector endpoint
    pub fn url(&self) -> &str {
        &self.shared.url
    }

    /// Stop the channel
    ///
    /// Events already accepted while ready are flushed before the socket is
    /// closed. Events sent afterwards stay in the pending queue.
    pub async fn close(&self) {
        let _ = self.shutdown_tx.send(true);
        let task = self.task.lock().take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!("Event channel task ended abnormally: {}", e);
            }
        }
        self.shared.set_state(ChannelState::Closed);
    }
}

impl EventSink for EventChannel {
    fn send(&self, event: TraceEvent) {
        EventChannel::send(self, event);
    }
}

impl Drop for EventChannel {
    fn drop(&mut self) {
        let _ = self.shutdown_tx.send(true);
    }
}

async fn run(
    shared: Arc<Shared>,
    policy: ReconnectionPolicy,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut attempt: u32 = 0;

    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        shared.set_state(ChannelState::Connecting);
        debug!(url = %shared.url, attempt, "Connecting event channel");

        let connected = tokio::select! {
            result = connect_async(shared.url.as_str()) => result,
            _ = shutdown_rx.changed() => break,
        };

        match connected {
            Ok((ws_stream, _)) => {
                attempt = 0;
                info!(url = %shared.url, "Event channel connected");
                match pump(&shared, ws_stream, &mut shutdown_rx).await {
                    PumpOutcome::Shutdown => break,
                    PumpOutcome::Disconnected => {}
                }
            }
            Err(e) => {
                warn!(url = %shared.url, attempt, "Event channel connect failed: {}", e);
                shared.set_state(ChannelState::Erroring);
                attempt += 1;
            }
        }

        if !policy.should_retry(attempt) {
            warn!(url = %shared.url, "Event channel giving up after {} attempts", attempt);
            break;
        }

        let delay = policy.calculate_backoff(attempt.saturating_sub(1));
        debug!(delay_ms = delay.as_millis() as u64, "Event channel reconnect scheduled");
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown_rx.changed() => break,
        }
    }

    shared.set_state(ChannelState::Closed);
    let pending = shared.queue.lock().pending.len();
    if pending > 0 {
        warn!(pending, "Event channel closed with undelivered events");
    }
}

async fn pump<S>(
    shared: &Shared,
    ws_stream: WebSocketStream<S>,
    shutdown_rx: &mut watch::Receiver<bool>,
) -> PumpOutcome
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (mut write, mut read) = ws_stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<TraceEvent>();

    let drained = shared.mark_ready(tx);
    if drained > 0 {
        debug!(drained, "Drained pending events into event channel");
    }

    loop {
        tokio::select! {
            biased;
            _ = shutdown_rx.changed() => {
                shared.detach(ChannelState::Closed, &mut rx, None);
                let deadline = Instant::now() + shared.write_timeout;
                let mut unsent = shared.take_pending();
                while let Some(event) = unsent.pop_front() {
                    let text = match event.to_json() {
                        Ok(text) => text,
                        Err(e) => {
                            warn!(method = %event.method, "Dropping unencodable event: {}", e);
                            continue;
                        }
                    };
                    match timeout_at(deadline, write.send(Message::Text(text))).await {
                        Ok(Ok(())) => {}
                        Ok(Err(e)) => {
                            warn!("Event channel flush failed: {}", e);
                            unsent.push_front(event);
                            break;
                        }
                        Err(_) => {
                            warn!(
                                unsent = unsent.len() + 1,
                                "Event channel flush timed out"
                            );
                            unsent.push_front(event);
                            break;
                        }
                    }
                }
                shared.restore_pending(unsent);
                let _ = timeout_at(deadline, write.send(Message::Close(None))).await;
                info!(url = %shared.url, "Event channel closed");
                return PumpOutcome::Shutdown;
            }
            Some(event) = rx.recv() => {
                let text = match event.to_json() {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(method = %event.method, "Dropping unencodable event: {}", e);
                        continue;
                    }
                };
                let write_result =
                    timeout(shared.write_timeout, write.send(Message::Text(text))).await;
                let failure = match write_result {
                    Ok(Ok(())) => None,
                    Ok(Err(e)) => Some(e.to_string()),
                    Err(_) => Some("write timed out".to_string()),
                };
                if let Some(reason) = failure {
                    warn!(url = %shared.url, "Event channel write failed: {}", reason);
                    let requeued = shared.detach(ChannelState::Erroring, &mut rx, Some(event));
                    debug!(requeued, "Returned unwritten events to pending queue");
                    return PumpOutcome::Disconnected;
                }
            }
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        info!(url = %shared.url, "Event channel closed by collector");
                        shared.detach(ChannelState::Erroring, &mut rx, None);
                        return PumpOutcome::Disconnected;
                    }
                    Some(Err(e)) => {
                        warn!(url = %shared.url, "Event channel read error: {}", e);
                        shared.detach(ChannelState::Erroring, &mut rx, None);
                        return PumpOutcome::Disconnected;
                    }
                    Some(Ok(_)) => {
                        debug!("Ignoring inbound message on event channel");
                    }
                }
            }
        }
    }
}
