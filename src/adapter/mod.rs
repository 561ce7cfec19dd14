//module tree
mod mock;
#[cfg(feature = "native-adapter")]
mod native;

//API exports
pub use mock::*;
#[cfg(feature = "native-adapter")]
pub use native::*;

//-------------------------------------------------------------------------------------------------------------------
//local shortcuts
use crate::*;

//third-party shortcuts
use async_trait::async_trait;

//standard shortcuts

//-------------------------------------------------------------------------------------------------------------------

/// A frame sent to, or received from, the transport.
#[derive(Debug, Clone, PartialEq)]
pub enum AdapterMessage
{
    Text(String),
    Binary(Vec<u8>),
}

//-------------------------------------------------------------------------------------------------------------------

/// An event surfaced by a [`TransportAdapter`]'s event stream.
#[derive(Debug, Clone)]
pub enum AdapterEvent
{
    Open,
    Close{ code: u16, reason: String, was_clean: bool },
    Error{ message: String },
    Message(AdapterMessage),
}

//-------------------------------------------------------------------------------------------------------------------

/// Abstracts the underlying socket implementation behind a uniform open/close/send/receive surface.
///
/// Implementations are not required to be `Clone`; the core holds exactly one boxed instance per session and
/// recreates it (or calls `connect` again) across reconnects. `send` on a not-open adapter must fail with a
/// [`RuntimeErrorKind::State`] error rather than silently queueing — queueing while disconnected is the Message
/// Queue's job, one layer up.
#[async_trait]
pub trait TransportAdapter: Send
{
    /// Open the underlying connection. Fails with [`RuntimeErrorKind::Connection`] if no socket can be opened.
    async fn connect(&mut self) -> Result<(), RuntimeError>;

    /// Close the underlying connection, if open. Never fails; best-effort.
    async fn disconnect(&mut self, code: Option<u16>, reason: Option<String>);

    /// Send a frame. Fails with [`RuntimeErrorKind::State`] if the transport is not open.
    async fn send(&mut self, message: AdapterMessage) -> Result<(), RuntimeError>;

    /// Await the next adapter event. Returns `None` once the adapter's event stream is permanently exhausted
    /// (e.g. after a clean disconnect with no further reconnection by this same instance).
    async fn next_event(&mut self) -> Option<AdapterEvent>;
}

//-------------------------------------------------------------------------------------------------------------------
