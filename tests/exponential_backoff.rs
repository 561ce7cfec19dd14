mod common;

//local shortcuts
use ws_runtime::{AdapterEvent, MockAdapter, ReconnectConfig, Runtime, RuntimeConfig, RuntimeConfigBuilder, RuntimeEvent};

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

//-------------------------------------------------------------------------------------------------------------------

/// Losing the connection schedules a reconnect after a growing backoff delay, and a successful retry reports how
/// many attempts it took.
#[tokio::test(start_paused = true)]
async fn reconnect_backs_off_and_eventually_succeeds()
{
    common::init_tracing();
    let config: RuntimeConfig = RuntimeConfigBuilder::new()
        .reconnect(ReconnectConfig{
            enabled      : true,
            delay        : Duration::from_millis(100),
            max_delay    : Duration::from_secs(10),
            max_attempts : 0,
            factor       : 2.0,
            jitter       : 0.0,
        })
        .build();

    let (adapter, transport) = MockAdapter::pair();
    let (handle, _join) = Runtime::open(config, adapter);
    let mut events = handle.events();

    handle.connect().await.unwrap();
    next_matching(&mut events, |e| matches!(e, RuntimeEvent::Open)).await;

    transport.push_event(AdapterEvent::Close{ code: 1006, reason: "lost".to_string(), was_clean: false });

    let RuntimeEvent::Reconnecting{ attempt, delay, .. } =
        next_matching(&mut events, |e| matches!(e, RuntimeEvent::Reconnecting{ .. })).await
    else { unreachable!() };
    assert_eq!(attempt, 1);
    assert!(delay >= Duration::from_millis(99) && delay <= Duration::from_millis(101));

    tokio::time::advance(Duration::from_millis(150)).await;

    let RuntimeEvent::Reconnected{ attempts, .. } =
        next_matching(&mut events, |e| matches!(e, RuntimeEvent::Reconnected{ .. })).await
    else { unreachable!() };
    assert_eq!(attempts, 1);
    assert!(handle.is_connected());
}

//-------------------------------------------------------------------------------------------------------------------

/// Once the attempt budget is exhausted, the runtime settles as disconnected instead of retrying forever.
#[tokio::test(start_paused = true)]
async fn reconnect_gives_up_after_max_attempts()
{
    common::init_tracing();
    let config: RuntimeConfig = RuntimeConfigBuilder::new()
        .reconnect(ReconnectConfig{
            enabled      : true,
            delay        : Duration::from_millis(10),
            max_delay    : Duration::from_secs(1),
            max_attempts : 1,
            factor       : 2.0,
            jitter       : 0.0,
        })
        .build();

    let (adapter, _transport) = MockAdapter::pair_failing_connect();
    let (handle, _join) = Runtime::open(config, adapter);
    let mut events = handle.events();

    // the first connect attempt itself fails; with reconnect enabled this still resolves `Ok` and the failure
    // is absorbed into the reconnect loop.
    handle.connect().await.unwrap();
    next_matching(&mut events, |e| matches!(e, RuntimeEvent::Reconnecting{ .. })).await;

    tokio::time::advance(Duration::from_millis(20)).await;

    let RuntimeEvent::ReconnectFailed{ attempts, .. } =
        next_matching(&mut events, |e| matches!(e, RuntimeEvent::ReconnectFailed{ .. })).await
    else { unreachable!() };
    assert_eq!(attempts, 1);
    assert!(!handle.is_connected());
}

//-------------------------------------------------------------------------------------------------------------------
