//! Loopback demo
//!
//! Creates two traced webrtc-rs connections in one process, negotiates them
//! against each other (offer/answer plus trickled candidates), sends a
//! synthetic audio track and a data channel message, then closes both. All
//! trace events go to the collector URL through the event channel.
//!
//! # Usage
//!
//! ```bash
//! # Start the relay first
//! cargo run -p rtctrace-relay --bin rtctrace-relay
//!
//! # Run the demo for ten seconds
//! cargo run -p rtctrace --bin rtctrace-demo -- \
//!   --collector-url ws://localhost:3000 \
//!   --duration-secs 10
//! ```

use async_trait::async_trait;
use bytes::Bytes;
use clap::Parser;
use rtctrace::peer::webrtc_rs::RemoteTrack;
use rtctrace::peer::{
    ConnectionEvent, DataChannel, IceCandidate, IceServer, MediaStream,
    OfferOptions, PeerConnection, RtcConfiguration, SessionDescription, TrackHandle,
};
use rtctrace::{
    connection_id, with_continuations, CapabilityRegistry, EventChannel, Instrumentation,
    InterceptOptions, LocalTrack, MediaSource, ReconnectionPolicy, RemoteTrackSink, TraceConfig,
    TraceEmitter, WebRtcFactory,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use webrtc::media::Sample;

/// rtctrace loopback demo
///
/// Negotiates two traced peer connections against each other and ships the
/// resulting trace to a collector.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Collector (relay) WebSocket URL
    #[arg(long, default_value = "ws://localhost:3000", env = "RTCTRACE_COLLECTOR_URL")]
    collector_url: String,

    /// Stats polling interval in milliseconds
    #[arg(long, default_value_t = 1000, env = "RTCTRACE_STATS_INTERVAL_MS")]
    stats_interval_ms: u64,

    /// How long to keep the call up before closing
    #[arg(long, default_value_t = 5, env = "RTCTRACE_DEMO_DURATION_SECS")]
    duration_secs: u64,

    /// STUN servers (comma-separated); loopback needs none
    #[arg(long, value_delimiter = ',')]
    stun_servers: Vec<String>,

    /// Emit logs as JSON
    #[arg(long, default_value_t = false, env = "RTCTRACE_JSON_LOGS")]
    json_logs: bool,
}

/// Opus silence frame
const SILENCE: [u8; 3] = [0xf8, 0xff, 0xfe];
const FRAME: Duration = Duration::from_millis(20);

/// Media source producing one Opus track of silence
struct SyntheticAudio;

#[async_trait]
impl MediaSource for SyntheticAudio {
    async fn local_stream(&self) -> rtctrace::Result<MediaStream> {
        let track: TrackHandle = Arc::new(LocalTrack::opus("synthetic-audio", "demo-stream"));
        Ok(MediaStream::new("demo-stream", vec![track]))
    }
}

/// Stands in for rendering: counts RTP packets of each remote track
struct LoggingTrackSink;

impl RemoteTrackSink for LoggingTrackSink {
    fn attach(&self, track: TrackHandle, stream_ids: &[String]) {
        info!(
            track = %track.id(),
            kind = %track.kind(),
            streams = ?stream_ids,
            "Remote track attached"
        );

        let Some(remote) = track.as_any().downcast_ref::<RemoteTrack>() else {
            return;
        };
        let remote = Arc::clone(remote.inner());
        tokio::spawn(async move {
            let mut packets = 0u64;
            while remote.read_rtp().await.is_ok() {
                packets += 1;
                if packets % 250 == 0 {
                    debug!(track = %remote.id(), packets, "Remote track receiving");
                }
            }
            info!(track = %remote.id(), packets, "Remote track ended");
        });
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let shutdown_flag = Arc::new(AtomicBool::new(false));
    let shutdown_flag_handler = Arc::clone(&shutdown_flag);

    ctrlc::set_handler(move || {
        eprintln!("\nCtrl+C received, closing connections...");
        if shutdown_flag_handler.swap(true, Ordering::SeqCst) {
            std::process::exit(0);
        }
    })?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .thread_name("rtctrace-demo")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(args, shutdown_flag))
}

async fn async_main(
    args: Args,
    shutdown_flag: Arc<AtomicBool>,
) -> Result<(), Box<dyn std::error::Error>> {
    init_tracing(args.json_logs);

    let config = TraceConfig {
        collector_url: args.collector_url.clone(),
        stats_interval_ms: args.stats_interval_ms,
        reconnect: ReconnectionPolicy::default(),
        ..Default::default()
    };
    config.validate()?;

    info!(
        version = rtctrace::version(),
        collector_url = %config.collector_url,
        stats_interval_ms = config.stats_interval_ms,
        "rtctrace demo starting"
    );

    let registry = CapabilityRegistry::new();
    registry.bind("RTCPeerConnection", Arc::new(WebRtcFactory::new()?));

    let channel = Arc::new(EventChannel::from_config(&config)?);
    let instrumentation = Instrumentation::setup(
        &registry,
        TraceEmitter::new(channel.clone()),
        InterceptOptions::from_config(&config).with_track_sink(Arc::new(LoggingTrackSink)),
    )?;

    let rtc_config = RtcConfiguration {
        ice_servers: if args.stun_servers.is_empty() {
            vec![]
        } else {
            vec![IceServer {
                urls: args.stun_servers.clone(),
                ..Default::default()
            }]
        },
    };

    // Application code only sees the registry binding
    let factory = registry
        .get(instrumentation.binding())
        .ok_or("capability binding disappeared")?;
    let caller = factory.create(rtc_config.clone()).await?;
    let callee = factory.create(rtc_config).await?;
    info!(
        caller = ?connection_id(caller.as_ref()),
        callee = ?connection_id(callee.as_ref()),
        "Traced connections created"
    );

    let caller_candidates = candidate_queue(caller.as_ref());
    let callee_candidates = candidate_queue(callee.as_ref());

    let stream = SyntheticAudio.local_stream().await?;
    let mut local_tracks = Vec::new();
    for track in &stream.tracks {
        caller
            .add_track(Arc::clone(track), std::slice::from_ref(&stream))
            .await?;
        local_tracks.push(Arc::clone(track));
    }
    let data_channel = caller.create_data_channel("rtctrace-demo", None).await?;

    // Offer through the continuation convention, the rest awaited
    let (offer_tx, offer_rx) = oneshot::channel::<SessionDescription>();
    let offering = Arc::clone(&caller);
    with_continuations(
        async move { offering.create_offer(Some(OfferOptions::default())).await },
        move |offer| {
            let _ = offer_tx.send(offer);
        },
        |e| warn!("createOffer failed: {}", e),
    );
    let offer = offer_rx.await.map_err(|_| "createOffer did not complete")?;

    caller.set_local_description(offer.clone()).await?;
    callee.set_remote_description(offer).await?;
    let answer = callee.create_answer(None).await?;
    callee.set_local_description(answer.clone()).await?;
    caller.set_remote_description(answer).await?;

    // Candidates are applied only once both descriptions are in place
    let forward_to_callee = forward_candidates(caller_candidates, Arc::clone(&callee));
    let forward_to_caller = forward_candidates(callee_candidates, Arc::clone(&caller));

    let media = tokio::spawn(send_silence(local_tracks, Arc::clone(&shutdown_flag)));

    let deadline = tokio::time::Instant::now() + Duration::from_secs(args.duration_secs);
    let mut greeted = false;
    while !shutdown_flag.load(Ordering::SeqCst) && tokio::time::Instant::now() < deadline {
        if !greeted {
            greeted = data_channel.send_text("hello from rtctrace").await.is_ok();
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    shutdown_flag.store(true, Ordering::SeqCst);

    info!("Closing connections");
    caller.close().await?;
    callee.close().await?;
    forward_to_callee.abort();
    forward_to_caller.abort();
    let _ = media.await;

    // Let each stats reporter observe the closed state once
    tokio::time::sleep(config.stats_interval() + Duration::from_millis(100)).await;

    channel.close().await;
    info!(undelivered = channel.pending_len(), "rtctrace demo finished");
    Ok(())
}

/// Queue local candidates of `pc` until the remote side can take them
fn candidate_queue(pc: &dyn PeerConnection) -> mpsc::UnboundedReceiver<IceCandidate> {
    let (tx, rx) = mpsc::unbounded_channel();
    pc.add_event_listener(Arc::new(move |event: &ConnectionEvent| {
        if let ConnectionEvent::IceCandidate(Some(candidate)) = event {
            let _ = tx.send(candidate.clone());
        }
    }));
    rx
}

fn forward_candidates(
    mut candidates: mpsc::UnboundedReceiver<IceCandidate>,
    remote: Arc<dyn PeerConnection>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(candidate) = candidates.recv().await {
            if let Err(e) = remote.add_ice_candidate(candidate).await {
                warn!("Failed to apply trickled candidate: {}", e);
            }
        }
    })
}

async fn send_silence(tracks: Vec<TrackHandle>, shutdown_flag: Arc<AtomicBool>) {
    let mut ticker = tokio::time::interval(FRAME);
    while !shutdown_flag.load(Ordering::SeqCst) {
        ticker.tick().await;
        for track in &tracks {
            let Some(writer) = track
                .as_any()
                .downcast_ref::<LocalTrack>()
                .and_then(LocalTrack::sample_track)
            else {
                continue;
            };
            let sample = Sample {
                data: Bytes::from_static(&SILENCE),
                duration: FRAME,
                ..Default::default()
            };
            if let Err(e) = writer.write_sample(&sample).await {
                debug!("Sample write failed: {}", e);
            }
        }
    }
}

fn init_tracing(json: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,webrtc=warn"));

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
