//! Polling stats reporter
//!
//! One task per traced connection. Every interval the task pulls a stats
//! snapshot, emits it as a `getStats` event, and stops after the tick that
//! observed the connection closed. The task holds the connection weakly, so
//! dropping the connection also ends polling.

use crate::peer::{Method, PeerConnection, PeerConnectionState};
use crate::trace::{ConnectionId, TraceEmitter};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, trace};

/// Handle to a running stats polling task
pub struct StatsReporter {
    task: JoinHandle<u64>,
}

impl StatsReporter {
    /// Start polling `connection` every `period`
    pub fn spawn(
        connection: Weak<dyn PeerConnection>,
        id: ConnectionId,
        emitter: TraceEmitter,
        period: Duration,
    ) -> Self {
        let task = tokio::spawn(poll(connection, id, emitter, period));
        Self { task }
    }

    /// Whether polling has stopped
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stop polling without waiting for the connection to close
    pub fn abort(&self) {
        self.task.abort();
    }

    /// Wait for the task to end, returning the number of snapshots emitted
    pub async fn join(self) -> u64 {
        self.task.await.unwrap_or(0)
    }
}

async fn poll(
    connection: Weak<dyn PeerConnection>,
    id: ConnectionId,
    emitter: TraceEmitter,
    period: Duration,
) -> u64 {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut emitted = 0u64;

    loop {
        ticker.tick().await;

        let Some(pc) = connection.upgrade() else {
            debug!(id = %id, "Connection dropped, stats polling stopped");
            break;
        };

        let closed = pc.connection_state() == PeerConnectionState::Closed;
        snapshot(&pc, &id, &emitter).await;
        emitted += 1;

        if closed {
            debug!(id = %id, emitted, "Connection closed, stats polling stopped");
            break;
        }
    }

    emitted
}

async fn snapshot(pc: &Arc<dyn PeerConnection>, id: &ConnectionId, emitter: &TraceEmitter) {
    match pc.get_stats().await {
        Ok(report) => {
            trace!(id = %id, reports = report.len(), "Stats snapshot");
            emitter.emit(Method::GetStats.name(), id, &report);
        }
        Err(e) => {
            // Failures stay inside the reporter
            debug!(id = %id, error = %e, "Stats snapshot failed");
        }
    }
}
