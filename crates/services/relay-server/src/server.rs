//! Relay server accept loop

use crate::config::RelayConfig;
use crate::handler::handle_connection;
use crate::state::RelayState;
use crate::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{error, info};

/// Relay server bound to its listen address
pub struct RelayServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    state: Arc<RelayState>,
}

impl RelayServer {
    /// Validate `config` and bind the listener
    pub async fn bind(config: RelayConfig) -> Result<Self> {
        config.validate()?;
        let listener = TcpListener::bind(config.socket_addr()?).await?;
        let local_addr = listener.local_addr()?;
        info!("Relay listening on ws://{}", local_addr);

        Ok(Self {
            listener,
            local_addr,
            state: Arc::new(RelayState::new(&config)),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Get shared state (for external access)
    pub fn state(&self) -> Arc<RelayState> {
        Arc::clone(&self.state)
    }

    /// Start the accept loop on the current runtime
    pub fn start(self) -> RelayHandle {
        let (shutdown_tx, mut shutdown_rx) = broadcast::channel::<()>(1);
        let listener = self.listener;
        let state = Arc::clone(&self.state);

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        match result {
                            Ok((stream, peer_addr)) => {
                                let state = Arc::clone(&state);
                                tokio::spawn(async move {
                                    if let Err(e) = handle_connection(stream, peer_addr, state).await {
                                        error!("Relay connection error from {}: {}", peer_addr, e);
                                    }
                                });
                            }
                            Err(e) => {
                                error!("Failed to accept relay connection: {}", e);
                            }
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        info!("Relay received shutdown signal");
                        break;
                    }
                }
            }
            info!("Relay accept loop exited");
        });

        RelayHandle {
            local_addr: self.local_addr,
            state: self.state,
            shutdown_tx,
            task,
        }
    }
}

/// Handle to a running relay
pub struct RelayHandle {
    local_addr: SocketAddr,
    state: Arc<RelayState>,
    shutdown_tx: broadcast::Sender<()>,
    task: JoinHandle<()>,
}

impl RelayHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// WebSocket URL of the relay
    pub fn url(&self) -> String {
        format!("ws://{}", self.local_addr)
    }

    pub fn state(&self) -> Arc<RelayState> {
        Arc::clone(&self.state)
    }

    /// Stop accepting connections and wait for the accept loop to exit
    ///
    /// Connections already accepted keep running until their peers close.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        if let Err(e) = self.task.await {
            error!("Relay accept loop panicked: {}", e);
        }
    }
}
