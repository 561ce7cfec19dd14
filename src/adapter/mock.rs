//local shortcuts
use crate::*;

//third-party shortcuts
use async_trait::async_trait;
use tokio::sync::mpsc;

//standard shortcuts

//-------------------------------------------------------------------------------------------------------------------

/// An in-process [`TransportAdapter`] driven entirely by test code, with no real socket involved.
///
/// Outbound frames passed to `send` are forwarded to the paired [`MockAdapterHandle`] for inspection; inbound
/// events are injected the other way. This is the collaborator the runtime's integration tests drive instead of a
/// real `NativeAdapter`.
#[derive(Debug)]
pub struct MockAdapter
{
    connected    : bool,
    fail_connect : bool,
    outbound_tx  : mpsc::UnboundedSender<AdapterMessage>,
    events_rx    : mpsc::UnboundedReceiver<AdapterEvent>,
}

/// The test-side handle paired with a [`MockAdapter`].
#[derive(Debug)]
pub struct MockAdapterHandle
{
    outbound_rx : mpsc::UnboundedReceiver<AdapterMessage>,
    events_tx   : mpsc::UnboundedSender<AdapterEvent>,
}

impl MockAdapter
{
    /// Make a connected-by-default adapter/handle pair.
    pub fn pair() -> (Self, MockAdapterHandle)
    {
        Self::new(false)
    }

    /// Make a pair whose `connect()` always fails with a [`RuntimeErrorKind::Connection`] error.
    pub fn pair_failing_connect() -> (Self, MockAdapterHandle)
    {
        Self::new(true)
    }

    fn new(fail_connect: bool) -> (Self, MockAdapterHandle)
    {
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let adapter = Self{ connected: false, fail_connect, outbound_tx, events_rx };
        let handle = MockAdapterHandle{ outbound_rx, events_tx };
        (adapter, handle)
    }
}

#[async_trait]
impl TransportAdapter for MockAdapter
{
    async fn connect(&mut self) -> Result<(), RuntimeError>
    {
        if self.fail_connect
        {
            return Err(RuntimeError::new(RuntimeErrorKind::Connection, "mock adapter configured to fail connect"));
        }
        self.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self, _code: Option<u16>, _reason: Option<String>)
    {
        self.connected = false;
    }

    async fn send(&mut self, message: AdapterMessage) -> Result<(), RuntimeError>
    {
        if !self.connected
        {
            return Err(RuntimeError::new(RuntimeErrorKind::State, "mock adapter is not connected"));
        }
        self.outbound_tx.send(message)
            .map_err(|_| RuntimeError::new(RuntimeErrorKind::Connection, "mock adapter handle was dropped"))
    }

    async fn next_event(&mut self) -> Option<AdapterEvent>
    {
        self.events_rx.recv().await
    }
}

impl MockAdapterHandle
{
    /// Inject an event as though it arrived from the transport.
    pub fn push_event(&self, event: AdapterEvent)
    {
        let _ = self.events_tx.send(event);
    }

    /// Convenience: inject an `Open` event.
    pub fn push_open(&self)
    {
        self.push_event(AdapterEvent::Open);
    }

    /// Convenience: inject a text `Message` event carrying JSON.
    pub fn push_message(&self, payload: serde_json::Value)
    {
        self.push_event(AdapterEvent::Message(AdapterMessage::Text(payload.to_string())));
    }

    /// Await the next frame the adapter under test sent.
    pub async fn next_sent(&mut self) -> Option<AdapterMessage>
    {
        self.outbound_rx.recv().await
    }

    /// Drain any frames already sent, without waiting for more.
    pub fn try_drain_sent(&mut self) -> Vec<AdapterMessage>
    {
        let mut out = Vec::new();
        while let Ok(msg) = self.outbound_rx.try_recv()
        {
            out.push(msg);
        }
        out
    }
}

//-------------------------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests
{
    use super::*;

    #[tokio::test]
    async fn send_before_connect_fails_with_state_error()
    {
        let (mut adapter, _handle) = MockAdapter::pair();
        let err = adapter.send(AdapterMessage::Text("hi".to_string())).await.unwrap_err();
        assert_eq!(err.kind(), RuntimeErrorKind::State);
    }

    #[tokio::test]
    async fn connect_then_send_is_observed_by_the_handle()
    {
        let (mut adapter, mut handle) = MockAdapter::pair();
        adapter.connect().await.unwrap();
        adapter.send(AdapterMessage::Text("hi".to_string())).await.unwrap();

        let sent = handle.next_sent().await.unwrap();
        assert_eq!(sent, AdapterMessage::Text("hi".to_string()));
    }

    #[tokio::test]
    async fn injected_events_are_observed_by_the_adapter()
    {
        let (mut adapter, handle) = MockAdapter::pair();
        handle.push_open();
        assert!(matches!(adapter.next_event().await, Some(AdapterEvent::Open)));
    }

    #[tokio::test]
    async fn failing_connect_pair_always_errors()
    {
        let (mut adapter, _handle) = MockAdapter::pair_failing_connect();
        let err = adapter.connect().await.unwrap_err();
        assert_eq!(err.kind(), RuntimeErrorKind::Connection);
    }
}

//-------------------------------------------------------------------------------------------------------------------
