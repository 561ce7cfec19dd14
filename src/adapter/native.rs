//local shortcuts
use crate::*;

//third-party shortcuts
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::{CloseFrame, Message as WsMessage};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

//standard shortcuts

//-------------------------------------------------------------------------------------------------------------------

/// A [`TransportAdapter`] wrapping a standards-compliant WebSocket via `tokio-tungstenite`.
///
/// Holds no connection until `connect` succeeds; `send`/`disconnect` on a never-connected or already-disconnected
/// instance behave per the trait's contract (`send` fails with a [`RuntimeErrorKind::State`] error, `disconnect` is
/// a harmless no-op).
pub struct NativeAdapter
{
    url    : url::Url,
    stream : Option<WebSocketStream<MaybeTlsStream<TcpStream>>>,
}

impl std::fmt::Debug for NativeAdapter
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        f.debug_struct("NativeAdapter")
            .field("url", &self.url.as_str())
            .field("connected", &self.stream.is_some())
            .finish()
    }
}

impl NativeAdapter
{
    /// Make a new, not-yet-connected adapter for `url`.
    pub fn new(url: url::Url) -> Self
    {
        Self{ url, stream: None }
    }
}

#[async_trait]
impl TransportAdapter for NativeAdapter
{
    async fn connect(&mut self) -> Result<(), RuntimeError>
    {
        let (stream, _response) = connect_async(self.url.as_str()).await
            .map_err(|e| RuntimeError::with_source(RuntimeErrorKind::Connection, "failed to open native websocket", e))?;
        self.stream = Some(stream);
        Ok(())
    }

    async fn disconnect(&mut self, code: Option<u16>, reason: Option<String>)
    {
        let Some(mut stream) = self.stream.take() else { return; };
        let frame = code.map(|code| CloseFrame{ code: code.into(), reason: reason.unwrap_or_default().into() });
        let _ = stream.close(frame).await;
    }

    async fn send(&mut self, message: AdapterMessage) -> Result<(), RuntimeError>
    {
        let Some(stream) = self.stream.as_mut() else
        {
            return Err(RuntimeError::new(RuntimeErrorKind::State, "native adapter is not connected"));
        };

        let ws_message = match message
        {
            AdapterMessage::Text(text)     => WsMessage::Text(text.into()),
            AdapterMessage::Binary(binary) => WsMessage::Binary(binary.into()),
        };

        stream.send(ws_message).await
            .map_err(|e| RuntimeError::with_source(RuntimeErrorKind::Connection, "native websocket send failed", e))
    }

    async fn next_event(&mut self) -> Option<AdapterEvent>
    {
        loop
        {
            let stream = self.stream.as_mut()?;
            match stream.next().await
            {
                None =>
                {
                    self.stream = None;
                    return Some(AdapterEvent::Close{ code: 1000, reason: String::new(), was_clean: true });
                }
                Some(Ok(WsMessage::Text(text))) =>
                {
                    return Some(AdapterEvent::Message(AdapterMessage::Text(text.to_string())));
                }
                Some(Ok(WsMessage::Binary(bytes))) =>
                {
                    return Some(AdapterEvent::Message(AdapterMessage::Binary(bytes.to_vec())));
                }
                Some(Ok(WsMessage::Close(frame))) =>
                {
                    self.stream = None;
                    let (code, reason) = frame
                        .map(|f| (u16::from(f.code), f.reason.to_string()))
                        .unwrap_or((1000, String::new()));
                    return Some(AdapterEvent::Close{ code, reason, was_clean: true });
                }
                // tungstenite answers pings/pongs internally; these carry no application event
                Some(Ok(WsMessage::Ping(_))) | Some(Ok(WsMessage::Pong(_))) | Some(Ok(WsMessage::Frame(_))) =>
                {
                    continue;
                }
                Some(Err(e)) =>
                {
                    self.stream = None;
                    return Some(AdapterEvent::Error{ message: e.to_string() });
                }
            }
        }
    }
}

//-------------------------------------------------------------------------------------------------------------------
