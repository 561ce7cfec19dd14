mod common;

//local shortcuts
use ws_runtime::{AdapterMessage, MockAdapter, Runtime, RuntimeConfig, RuntimeEvent};

//third-party shortcuts
use serde_json::json;

//-------------------------------------------------------------------------------------------------------------------

/// Messages sent while disconnected land in the offline queue and are flushed, in order, once connected.
#[tokio::test]
async fn queued_messages_flush_on_connect()
{
    common::init_tracing();
    let (adapter, mut transport) = MockAdapter::pair();
    let (handle, _join) = Runtime::open(RuntimeConfig::default(), adapter);

    handle.send(json!({ "seq": 1 })).await.unwrap();
    handle.send(json!({ "seq": 2 })).await.unwrap();
    assert_eq!(handle.queue_size(), 2);
    assert!(!handle.is_connected());

    handle.connect().await.unwrap();

    let mut seqs = Vec::new();
    for _ in 0..2
    {
        let AdapterMessage::Text(text) = transport.next_sent().await.unwrap()
        else { panic!("expected text frames"); };
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        seqs.push(value["seq"].as_i64().unwrap());
    }
    assert_eq!(seqs, vec![1, 2]);
    assert_eq!(handle.queue_size(), 0);
}

//-------------------------------------------------------------------------------------------------------------------

/// `clear_queue` discards buffered messages without ever dispatching them.
#[tokio::test]
async fn clear_queue_drops_buffered_messages()
{
    common::init_tracing();
    let (adapter, _transport) = MockAdapter::pair();
    let (handle, _join) = Runtime::open(RuntimeConfig::default(), adapter);

    handle.send(json!({ "seq": 1 })).await.unwrap();
    assert_eq!(handle.queue_size(), 1);

    handle.clear_queue().await;
    // clear_queue is fire-and-forget; give the driver task a moment to process and republish.
    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    assert_eq!(handle.queue_size(), 0);
}

//-------------------------------------------------------------------------------------------------------------------

/// Read events until one matching `pred` arrives, ignoring the `StateChange` chatter every transition emits
/// alongside its dedicated event.
async fn next_matching(
    events : &mut tokio::sync::broadcast::Receiver<RuntimeEvent>,
    pred   : impl Fn(&RuntimeEvent) -> bool,
) -> RuntimeEvent
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

/// A brief connection loss re-queues nothing already delivered, but new sends made while reconnecting still queue.
#[tokio::test]
async fn sends_while_reconnecting_are_queued()
{
    common::init_tracing();
    let config = RuntimeConfig::default();
    let (adapter, mut transport) = MockAdapter::pair();
    let (handle, _join) = Runtime::open(config, adapter);

    let mut events = handle.events();
    handle.connect().await.unwrap();
    next_matching(&mut events, |e| matches!(e, RuntimeEvent::Open)).await;

    transport.push_event(ws_runtime::AdapterEvent::Close{ code: 1006, reason: "lost".to_string(), was_clean: false });
    next_matching(&mut events, |e| matches!(e, RuntimeEvent::Reconnecting{ .. })).await;

    handle.send(json!({ "seq": "during-reconnect" })).await.unwrap();
    assert_eq!(handle.queue_size(), 1);
}

//-------------------------------------------------------------------------------------------------------------------
