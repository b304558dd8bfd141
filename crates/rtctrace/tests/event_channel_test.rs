//! Event Channel Integration Tests
//!
//! Run the buffered WebSocket channel against the embedded test collector.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p rtctrace --test event_channel_test -- --nocapture
//! ```

mod harness;

use harness::{init_logging, MockFactory, MockScript, TestCollector};
use rtctrace::peer::OfferOptions;
use rtctrace::{
    CapabilityRegistry, ChannelState, ConnectionId, EventChannel, Instrumentation,
    InterceptOptions, ReconnectionPolicy, TraceEmitter, TraceEvent,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_secs(5);

fn event(n: usize) -> TraceEvent {
    TraceEvent::new(format!("m{}", n), ConnectionId::from("pc-1"), json!({"n": n}))
}

async fn wait_for_state(channel: &EventChannel, state: ChannelState) {
    tokio::time::timeout(TIMEOUT, async {
        while channel.state() != state {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("channel never reached {:?}", state));
}

#[tokio::test]
async fn test_events_before_open_are_drained_in_order_then_later_events_follow() {
    init_logging();
    let collector = TestCollector::bind().await.unwrap();
    let channel = EventChannel::open(collector.url(), ReconnectionPolicy::aggressive());

    for n in 0..10 {
        channel.send(event(n));
    }
    assert_ne!(channel.state(), ChannelState::Ready);
    assert_eq!(channel.pending_len(), 10);

    collector.start().unwrap();
    wait_for_state(&channel, ChannelState::Ready).await;
    assert_eq!(channel.pending_len(), 0);

    for n in 10..15 {
        channel.send(event(n));
    }

    let received = collector.collect(15, TIMEOUT).await.unwrap();
    let methods: Vec<String> = received.into_iter().map(|e| e.method).collect();
    let expected: Vec<String> = (0..15).map(|n| format!("m{}", n)).collect();
    assert_eq!(methods, expected);
    assert!(collector.expect_quiet(Duration::from_millis(200)).await);

    channel.close().await;
    assert_eq!(channel.state(), ChannelState::Closed);
}

#[tokio::test]
async fn test_reconnects_after_collector_drops_connection() {
    init_logging();
    let collector = TestCollector::start_new().await.unwrap();
    let channel = EventChannel::open(collector.url(), ReconnectionPolicy::aggressive());

    wait_for_state(&channel, ChannelState::Ready).await;
    channel.send(event(0));
    assert_eq!(collector.next_event(TIMEOUT).await.unwrap().method, "m0");

    collector.drop_connections();
    tokio::time::timeout(TIMEOUT, async {
        while channel.state() == ChannelState::Ready {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();

    // Produced while disconnected, delivered after the reconnect
    channel.send(event(1));
    channel.send(event(2));
    wait_for_state(&channel, ChannelState::Ready).await;
    channel.send(event(3));

    let methods: Vec<String> = collector
        .collect(3, TIMEOUT)
        .await
        .unwrap()
        .into_iter()
        .map(|e| e.method)
        .collect();
    assert_eq!(methods, vec!["m1", "m2", "m3"]);

    channel.close().await;
}

#[tokio::test]
async fn test_close_retains_later_events() {
    init_logging();
    let collector = TestCollector::start_new().await.unwrap();
    let channel = EventChannel::open(collector.url(), ReconnectionPolicy::default());
    wait_for_state(&channel, ChannelState::Ready).await;

    channel.send(event(0));
    channel.close().await;
    channel.send(event(1));

    assert_eq!(collector.next_event(TIMEOUT).await.unwrap().method, "m0");
    assert_eq!(channel.state(), ChannelState::Closed);
    assert_eq!(channel.pending_len(), 1);
}

#[tokio::test]
async fn test_traced_connection_reaches_collector() {
    init_logging();
    let collector = TestCollector::bind().await.unwrap();
    let channel = Arc::new(EventChannel::open(
        collector.url(),
        ReconnectionPolicy::aggressive(),
    ));

    let factory = MockFactory::new(MockScript::new());
    let registry = CapabilityRegistry::new();
    registry.bind("webkitRTCPeerConnection", factory);
    let instrumentation = Instrumentation::setup(
        &registry,
        TraceEmitter::new(channel.clone()),
        InterceptOptions::default().with_stats_interval(Duration::from_secs(3600)),
    )
    .unwrap();
    assert_eq!(instrumentation.binding(), "webkitRTCPeerConnection");

    // Produced before the collector accepts anything
    let pc = instrumentation.create(Default::default()).await.unwrap();
    pc.create_offer(Some(OfferOptions::default())).await.unwrap();
    assert_eq!(channel.pending_len(), 2);

    collector.start().unwrap();
    let events = collector.collect(2, TIMEOUT).await.unwrap();
    assert_eq!(events[0].method, "createOffer");
    assert_eq!(events[0].args, json!({"iceRestart": false}));
    assert_eq!(events[1].method, "createOfferOnSuccess");
    assert_eq!(events[0].id, events[1].id);

    channel.close().await;
}
