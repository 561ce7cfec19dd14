mod common;

//local shortcuts
use ws_runtime::{HeartbeatConfig, MockAdapter, ReconnectConfig, Runtime, RuntimeConfig, RuntimeConfigBuilder, RuntimeEvent};

//third-party shortcuts
use tokio::sync::broadcast::Receiver;

//standard shortcuts
use std::time::Duration;

//-------------------------------------------------------------------------------------------------------------------

async fn next_matching(events: &mut Receiver<RuntimeEvent>, pred: impl Fn(&RuntimeEvent) -> bool) -> RuntimeEvent
{
    loop
    {
        let event = events.recv().await.expect("event stream should not lag or close in a short test");
        if pred(&event)
        {
            return event;
        }
    }
}

fn short_heartbeat_config() -> RuntimeConfig
{
    RuntimeConfigBuilder::new()
        .heartbeat(HeartbeatConfig{
            enabled   : true,
            interval  : Duration::from_millis(50),
            timeout   : Duration::from_millis(50),
            message   : serde_json::json!({ "type": "ping" }),
            pong_type : "pong".to_string(),
        })
        .reconnect(ReconnectConfig{ enabled: false, ..ReconnectConfig::default() })
        .build()
}

//-------------------------------------------------------------------------------------------------------------------

/// A pong that arrives in time keeps the connection alive and records a latency sample.
#[tokio::test(start_paused = true)]
async fn ponged_probe_keeps_the_connection_alive()
{
    common::init_tracing();
    let (adapter, transport) = MockAdapter::pair();
    let (handle, _join) = Runtime::open(short_heartbeat_config(), adapter);
    let mut events = handle.events();

    handle.connect().await.unwrap();
    next_matching(&mut events, |e| matches!(e, RuntimeEvent::Open)).await;

    tokio::time::advance(Duration::from_millis(60)).await;
    next_matching(&mut events, |e| matches!(e, RuntimeEvent::Ping{ .. })).await;

    transport.push_message(serde_json::json!({ "type": "pong" }));
    next_matching(&mut events, |e| matches!(e, RuntimeEvent::Pong{ .. })).await;

    // advance past the original timeout window; the connection must still be up since the pong cleared it.
    tokio::time::advance(Duration::from_millis(60)).await;
    assert!(handle.is_connected());
    assert!(handle.metrics().latency.current.is_some());
}

//-------------------------------------------------------------------------------------------------------------------

/// A probe that never gets ponged is treated as connection loss.
#[tokio::test(start_paused = true)]
async fn missed_pong_kills_the_connection()
{
    common::init_tracing();
    let (adapter, _transport) = MockAdapter::pair();
    let (handle, _join) = Runtime::open(short_heartbeat_config(), adapter);
    let mut events = handle.events();

    handle.connect().await.unwrap();
    next_matching(&mut events, |e| matches!(e, RuntimeEvent::Open)).await;

    tokio::time::advance(Duration::from_millis(60)).await;
    next_matching(&mut events, |e| matches!(e, RuntimeEvent::Ping{ .. })).await;

    // no pong is ever injected; advance past the probe timeout.
    tokio::time::advance(Duration::from_millis(60)).await;
    let RuntimeEvent::Close{ code, .. } = next_matching(&mut events, |e| matches!(e, RuntimeEvent::Close{ .. })).await
    else { unreachable!() };
    assert_eq!(code, 4001);
    assert!(!handle.is_connected());
}

//-------------------------------------------------------------------------------------------------------------------
