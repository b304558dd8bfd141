//! Relay binary entry point
//!
//! # Usage
//!
//! ```bash
//! # Listen on the default address (0.0.0.0:3000)
//! cargo run -p rtctrace-relay --bin rtctrace-relay
//!
//! # Custom address and a bounded pending buffer
//! cargo run -p rtctrace-relay --bin rtctrace-relay -- \
//!   --bind 127.0.0.1:4000 \
//!   --max-pending 10000
//! ```

use clap::Parser;
use rtctrace_relay::{RelayConfig, RelayServer, DEFAULT_CONTROL_MESSAGE};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// rtctrace relay
///
/// Forwards trace events from any number of producers to one consumer.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Listen address
    #[arg(long, default_value = "0.0.0.0:3000", env = "RTCTRACE_RELAY_BIND")]
    bind: String,

    /// Text message that registers its sender as the consumer
    #[arg(long, default_value = DEFAULT_CONTROL_MESSAGE, env = "RTCTRACE_RELAY_CONTROL_MESSAGE")]
    control_message: String,

    /// Bound the pending buffer; the oldest message is evicted when full
    #[arg(long, env = "RTCTRACE_RELAY_MAX_PENDING")]
    max_pending: Option<usize>,

    /// Emit logs as JSON
    #[arg(long, default_value_t = false, env = "RTCTRACE_JSON_LOGS")]
    json_logs: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let shutdown_flag = Arc::new(AtomicBool::new(false));
    let shutdown_flag_handler = Arc::clone(&shutdown_flag);

    ctrlc::set_handler(move || {
        eprintln!("\nCtrl+C received, shutting down relay...");
        if shutdown_flag_handler.swap(true, Ordering::SeqCst) {
            std::process::exit(0);
        }
    })?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .thread_name("rtctrace-relay")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(args, shutdown_flag))
}

async fn async_main(
    args: Args,
    shutdown_flag: Arc<AtomicBool>,
) -> Result<(), Box<dyn std::error::Error>> {
    init_tracing(args.json_logs);

    let config = RelayConfig {
        bind_addr: args.bind,
        control_message: args.control_message,
        max_pending: args.max_pending,
    };

    info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_addr = %config.bind_addr,
        control_message = %config.control_message,
        max_pending = ?config.max_pending,
        "rtctrace relay starting"
    );

    let server = RelayServer::bind(config).await?;
    let handle = server.start();

    while !shutdown_flag.load(Ordering::SeqCst) {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    let state = handle.state();
    info!(
        pending = state.pending_len(),
        has_consumer = state.has_consumer(),
        "Shutdown signal received, stopping relay"
    );
    handle.shutdown().await;

    info!("Relay shut down gracefully");
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
