mod common;

//local shortcuts
use ws_runtime::{MockAdapter, Runtime, RuntimeConfig, RuntimeEvent};

//third-party shortcuts
use serde_json::json;

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

//-------------------------------------------------------------------------------------------------------------------

#[tokio::test]
async fn connect_send_and_receive()
{
    common::init_tracing();
    let (adapter, mut transport) = MockAdapter::pair();
    let (handle, _join) = Runtime::open(RuntimeConfig::default(), adapter);
    let mut events = handle.events();

    handle.connect().await.unwrap();
    assert!(handle.is_connected());

    next_matching(&mut events, |e| matches!(e, RuntimeEvent::Open)).await;

    handle.send(json!({ "type": "hello", "value": 1 })).await.unwrap();
    let sent = transport.next_sent().await.unwrap();
    match sent
    {
        ws_runtime::AdapterMessage::Text(text) =>
        {
            let parsed: serde_json::Value = serde_json::from_str(&text).unwrap();
            assert_eq!(parsed["value"], 1);
        }
        other => panic!("expected a text frame, got {other:?}"),
    }

    transport.push_message(json!({ "type": "greeting", "value": 2 }));
    let message = next_matching(&mut events, |e| matches!(e, RuntimeEvent::Message{ .. })).await;
    let RuntimeEvent::Message{ data, .. } = message else { unreachable!() };
    assert_eq!(data["value"], 2);
}

//-------------------------------------------------------------------------------------------------------------------

#[tokio::test]
async fn destroy_is_idempotent_and_rejects_further_sends()
{
    common::init_tracing();
    let (adapter, _transport) = MockAdapter::pair();
    let (handle, join) = Runtime::open(RuntimeConfig::default(), adapter);

    handle.connect().await.unwrap();
    handle.destroy().await;
    handle.destroy().await; // must not hang or panic

    let err = handle.send(json!({ "type": "too-late" })).await.unwrap_err();
    assert_eq!(err.kind(), ws_runtime::RuntimeErrorKind::State);

    join.await.unwrap();
}

//-------------------------------------------------------------------------------------------------------------------
