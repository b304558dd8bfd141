//! Embedded WebSocket collector for event channel tests
//!
//! Binds a random port immediately but only performs WebSocket handshakes
//! once started, so tests can hold the channel in the connecting state.

use super::{HarnessError, HarnessResult};
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use rtctrace::TraceEvent;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, info, warn};

/// Collector receiving trace events over WebSocket
pub struct TestCollector {
    addr: SocketAddr,
    listener: Mutex<Option<TcpListener>>,
    events_tx: mpsc::UnboundedSender<TraceEvent>,
    events_rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<TraceEvent>>,
    kick_tx: broadcast::Sender<()>,
    accept_task: Mutex<Option<JoinHandle<()>>>,
}

impl TestCollector {
    /// Bind to a random local port without accepting yet
    pub async fn bind() -> HarnessResult<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (kick_tx, _) = broadcast::channel(4);

        info!("Test collector bound to {}", addr);
        Ok(Self {
            addr,
            listener: Mutex::new(Some(listener)),
            events_tx,
            events_rx: tokio::sync::Mutex::new(events_rx),
            kick_tx,
            accept_task: Mutex::new(None),
        })
    }

    /// Bind and start accepting
    pub async fn start_new() -> HarnessResult<Self> {
        let collector = Self::bind().await?;
        collector.start()?;
        Ok(collector)
    }

    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Begin accepting WebSocket connections
    pub fn start(&self) -> HarnessResult<()> {
        let listener = self
            .listener
            .lock()
            .take()
            .ok_or_else(|| HarnessError::CollectorError("already started".to_string()))?;
        let events_tx = self.events_tx.clone();
        let kick_tx = self.kick_tx.clone();

        let task = tokio::spawn(async move {
            loop {
                let (stream, peer) = match listener.accept().await {
                    Ok(accepted) => accepted,
                    Err(e) => {
                        warn!("Test collector accept failed: {}", e);
                        break;
                    }
                };
                let events_tx = events_tx.clone();
                let mut kick_rx = kick_tx.subscribe();

                tokio::spawn(async move {
                    let ws_stream = match accept_async(stream).await {
                        Ok(ws) => ws,
                        Err(e) => {
                            warn!("Test collector handshake failed: {}", e);
                            return;
                        }
                    };
                    debug!("Test collector accepted {}", peer);
                    let (mut write, mut read) = ws_stream.split();

                    loop {
                        tokio::select! {
                            _ = kick_rx.recv() => {
                                let _ = write.send(Message::Close(None)).await;
                                debug!("Test collector dropped {}", peer);
                                break;
                            }
                            msg = read.next() => match msg {
                                Some(Ok(Message::Text(text))) => {
                                    match TraceEvent::from_json(&text) {
                                        Ok(event) => {
                                            let _ = events_tx.send(event);
                                        }
                                        Err(e) => warn!("Test collector got non-event: {}", e),
                                    }
                                }
                                Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                                Some(Ok(_)) => {}
                            }
                        }
                    }
                });
            }
        });

        *self.accept_task.lock() = Some(task);
        Ok(())
    }

    /// Close every open connection from the collector side
    pub fn drop_connections(&self) {
        let _ = self.kick_tx.send(());
    }

    /// Wait for the next event
    pub async fn next_event(&self, timeout: Duration) -> HarnessResult<TraceEvent> {
        let mut rx = self.events_rx.lock().await;
        tokio::time::timeout(timeout, rx.recv())
            .await
            .map_err(|_| HarnessError::Timeout("no trace event received".to_string()))?
            .ok_or_else(|| HarnessError::CollectorError("event stream ended".to_string()))
    }

    /// Wait for exactly `count` events
    pub async fn collect(&self, count: usize, timeout: Duration) -> HarnessResult<Vec<TraceEvent>> {
        let mut events = Vec::with_capacity(count);
        for _ in 0..count {
            events.push(self.next_event(timeout).await?);
        }
        Ok(events)
    }

    /// Assert that nothing else arrives within `window`
    pub async fn expect_quiet(&self, window: Duration) -> bool {
        self.next_event(window).await.is_err()
    }

    pub fn shutdown(&self) {
        self.drop_connections();
        if let Some(task) = self.accept_task.lock().take() {
            task.abort();
        }
    }
}

impl Drop for TestCollector {
    fn drop(&mut self) {
        self.shutdown();
    }
}
