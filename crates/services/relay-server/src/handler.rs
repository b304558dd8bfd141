//! Per-connection WebSocket handling

use crate::state::{Disposition, RelayState};
use crate::Result;
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, trace};
use uuid::Uuid;

/// Handle a single relay connection until it closes
///
/// Generic over the byte stream so a TLS acceptor can sit in front of the
/// plain TCP listener.
pub async fn handle_connection<S>(
    stream: S,
    peer_addr: SocketAddr,
    state: Arc<RelayState>,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let ws_stream = accept_async(stream).await?;
    let conn_id = Uuid::new_v4();
    info!(%conn_id, %peer_addr, "New relay connection");

    let (mut ws_tx, mut ws_rx) = ws_stream.split();

    // Forwarded messages for this connection when it is the consumer
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

    let forward_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Err(e) = ws_tx.send(msg).await {
                error!(%conn_id, "Failed to send WebSocket message: {}", e);
                break;
            }
        }
        let _ = ws_tx.close().await;
    });

    while let Some(msg) = ws_rx.next().await {
        match msg {
            Ok(msg @ (Message::Text(_) | Message::Binary(_))) => {
                let disposition = state.on_message(conn_id, &tx, msg);
                trace!(%conn_id, ?disposition, "Relayed message");
                if disposition == Disposition::Registered {
                    debug!(%conn_id, "Connection is now the consumer");
                }
            }
            Ok(Message::Close(_)) => {
                info!(%conn_id, "Relay connection closed by client");
                break;
            }
            Err(e) => {
                error!(%conn_id, "WebSocket error: {}", e);
                break;
            }
            _ => {}
        }
    }

    state.on_disconnect(conn_id);
    forward_task.abort();

    Ok(())
}
