//! Trace collector
//!
//! Registers with the relay as the consumer, folds every trace event into a
//! per-connection record, and writes the records as JSON when the relay
//! closes the socket or on Ctrl+C.
//!
//! # Usage
//!
//! ```bash
//! cargo run -p rtctrace-relay --bin rtctrace-collector -- \
//!   --relay-url ws://localhost:3000 \
//!   --output trace.json
//! ```

use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use rtctrace::{ConnectionId, PeerConnectionRecord, TraceEvent};
use rtctrace_relay::DEFAULT_CONTROL_MESSAGE;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// rtctrace collector
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Relay WebSocket URL
    #[arg(long, default_value = "ws://localhost:3000", env = "RTCTRACE_RELAY_URL")]
    relay_url: String,

    /// Control message the relay expects from its consumer
    #[arg(long, default_value = DEFAULT_CONTROL_MESSAGE, env = "RTCTRACE_RELAY_CONTROL_MESSAGE")]
    control_message: String,

    /// Where to write the collected records
    #[arg(long, default_value = "rtctrace.json", env = "RTCTRACE_COLLECTOR_OUTPUT")]
    output: PathBuf,

    /// Emit logs as JSON
    #[arg(long, default_value_t = false, env = "RTCTRACE_JSON_LOGS")]
    json_logs: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let shutdown_flag = Arc::new(AtomicBool::new(false));
    let shutdown_flag_handler = Arc::clone(&shutdown_flag);

    ctrlc::set_handler(move || {
        eprintln!("\nCtrl+C received, writing records...");
        if shutdown_flag_handler.swap(true, Ordering::SeqCst) {
            std::process::exit(0);
        }
    })?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async_main(args, shutdown_flag))
}

async fn async_main(
    args: Args,
    shutdown_flag: Arc<AtomicBool>,
) -> Result<(), Box<dyn std::error::Error>> {
    init_tracing(args.json_logs);

    let (ws_stream, _) = connect_async(args.relay_url.as_str()).await?;
    let (mut ws_tx, mut ws_rx) = ws_stream.split();
    ws_tx.send(Message::Text(args.control_message.clone())).await?;
    info!(relay_url = %args.relay_url, "Registered with relay as consumer");

    let mut records: BTreeMap<ConnectionId, PeerConnectionRecord> = BTreeMap::new();
    let mut received = 0usize;
    let mut shutdown_poll = tokio::time::interval(Duration::from_millis(100));

    loop {
        tokio::select! {
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => match TraceEvent::from_json(&text) {
                        Ok(event) => {
                            received += 1;
                            debug!(method = %event.method, id = %event.id, "Trace event");
                            records
                                .entry(event.id.clone())
                                .or_insert_with(|| PeerConnectionRecord::new(event.id.clone()))
                                .apply(&event);
                        }
                        Err(e) => warn!("Ignoring malformed trace event: {}", e),
                    },
                    Some(Ok(Message::Close(_))) | None => {
                        info!("Relay closed the connection");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("Relay connection error: {}", e);
                        break;
                    }
                }
            }
            _ = shutdown_poll.tick() => {
                if shutdown_flag.load(Ordering::SeqCst) {
                    let _ = ws_tx.close().await;
                    break;
                }
            }
        }
    }

    let mut document = Map::new();
    for (id, record) in &records {
        info!(
            id = %id,
            series = record.series_keys().count(),
            updates = record.update_log().len(),
            "Connection record"
        );
        document.insert(id.as_str().to_string(), record.to_json()?);
    }
    std::fs::write(
        &args.output,
        serde_json::to_string_pretty(&Value::Object(document))?,
    )?;

    info!(
        events = received,
        connections = records.len(),
        output = %args.output.display(),
        "Wrote trace records"
    );
    Ok(())
}

fn init_tracing(json: bool) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
