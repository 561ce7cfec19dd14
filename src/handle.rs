//local shortcuts
use crate::*;

//third-party shortcuts
use tokio::sync::{broadcast, mpsc, oneshot};

//standard shortcuts
use std::sync::{Arc, RwLock};
use std::time::Duration;

//-------------------------------------------------------------------------------------------------------------------

/// Which middleware chain(s) a registration applies to.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum MiddlewareScope
{
    Both,
    SendOnly,
    ReceiveOnly,
}

//-------------------------------------------------------------------------------------------------------------------

/// The number of in-flight commands a [`RuntimeHandle`] may have queued against the [`RuntimeTask`] before `send`
/// calls start applying backpressure.
const COMMAND_CHANNEL_CAPACITY: usize = 256;

/// The number of events a lagging [`RuntimeEvent`] subscriber may fall behind by before old events are dropped for it.
const EVENT_CHANNEL_CAPACITY: usize = 256;

//-------------------------------------------------------------------------------------------------------------------

/// Per-send options recognized by [`RuntimeHandle::send_with_options`].
#[derive(Debug, Clone, Default)]
pub struct SendOptions
{
    /// Which priority band the message falls into if it must be queued. Defaults to [`Priority::Normal`].
    pub priority: Priority,
    /// Whether this send is tracked for at-least-once delivery via the [`AckTracker`] overlay. Defaults to `false`.
    pub ack: bool,
    /// Overrides [`RuntimeConfig::ack`] for this send only.
    pub ack_options: Option<AckOptions>,
}

//-------------------------------------------------------------------------------------------------------------------

/// A handler registered with the [`Router`] overlay via [`RuntimeHandle::on`]/[`RuntimeHandle::once`].
pub type RouteHandler = Box<dyn Fn(&serde_json::Value) + Send + Sync + 'static>;

/// A handler registered with the runtime's [`EventBus`] via [`RuntimeHandle::on_event`]/[`RuntimeHandle::once_event`].
pub type EventHandler = Box<dyn Fn(&RuntimeEvent) + Send + Sync + 'static>;

//-------------------------------------------------------------------------------------------------------------------

/// Internal command protocol between a [`RuntimeHandle`] and its [`RuntimeTask`].
///
/// Every variant that produces a result the caller must observe carries its own `oneshot::Sender`; registration-only
/// variants (`On`/`Off`/`Subscribe`/...) do not, since the single command channel already gives FIFO ordering with
/// respect to any later command from the same handle.
pub(crate) enum Command
{
    Connect{ respond: oneshot::Sender<Result<(), RuntimeError>> },
    Disconnect{ code: Option<u16>, reason: Option<String>, respond: oneshot::Sender<()> },
    Send{ payload: serde_json::Value, options: SendOptions, respond: oneshot::Sender<Result<(), RuntimeError>> },
    SendBinary{ bytes: Vec<u8>, respond: oneshot::Sender<Result<(), RuntimeError>> },
    SendBatched{ payload: serde_json::Value, respond: oneshot::Sender<Result<(), RuntimeError>> },
    Request{ payload: serde_json::Value, timeout: Option<Duration>, respond: oneshot::Sender<Result<oneshot::Receiver<RpcOutcome>, RuntimeError>> },
    On{ pattern: String, priority: i32, handler: RouteHandler },
    Once{ pattern: String, priority: i32, handler: RouteHandler },
    Off{ pattern: String },
    SetDefaultRoute{ handler: RouteHandler },
    Subscribe{ channel: String },
    Unsubscribe{ channel: String },
    UseMiddleware{ scope: MiddlewareScope, middleware: Arc<dyn Middleware> },
    ClearQueue,
    OnEvent{ event: String, handler: EventHandler },
    OnceEvent{ event: String, handler: EventHandler },
    OffEvent{ event: String },
    SetMaxEventListeners{ max: usize },
    RemoveAllEventListeners,
    Destroy{ respond: oneshot::Sender<()> },
}

//-------------------------------------------------------------------------------------------------------------------

/// A cheap, eventually-consistent snapshot of the runtime's observable properties, refreshed by the [`RuntimeTask`]
/// after every state-affecting step. Read through a `RwLock` instead of individual atomics since the fields are
/// logically one coherent reading (e.g. `queue_size` inside `metrics` should match the standalone `queue_size`).
#[derive(Debug, Clone)]
pub(crate) struct RuntimeSnapshot
{
    pub state      : ConnectionState,
    pub queue_size : usize,
    pub metrics    : MetricsReport,
}

impl Default for RuntimeSnapshot
{
    fn default() -> Self
    {
        Self{
            state      : ConnectionState::Disconnected,
            queue_size : 0,
            metrics    : PerformanceMonitor::new(MonitorConfig::default()).report(),
        }
    }
}

//-------------------------------------------------------------------------------------------------------------------

/// A cloneable, `Send + Sync` handle to a running [`RuntimeTask`].
///
/// Mirrors the base design's Client Facade public contract. Mutating calls round-trip through the task's command
/// channel so every operation observes a consistent, single-threaded view of the runtime's internal state; the
/// observable properties (`state`, `is_connected`, `metrics`, `queue_size`) instead read a cached [`RuntimeSnapshot`]
/// so polling them (e.g. from a UI tick) never blocks on the task.
#[derive(Clone)]
pub struct RuntimeHandle
{
    commands : mpsc::Sender<Command>,
    events   : broadcast::Sender<RuntimeEvent>,
    snapshot : Arc<RwLock<RuntimeSnapshot>>,
}

impl std::fmt::Debug for RuntimeHandle
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        f.debug_struct("RuntimeHandle").field("state", &self.state()).finish()
    }
}

/// Error returned when the owning [`RuntimeTask`] has already stopped (e.g. after `destroy`, or if it panicked).
fn task_stopped() -> RuntimeError
{
    RuntimeError::new(RuntimeErrorKind::State, "runtime task is no longer running")
}

impl RuntimeHandle
{
    pub(crate) fn new(commands: mpsc::Sender<Command>, events: broadcast::Sender<RuntimeEvent>, snapshot: Arc<RwLock<RuntimeSnapshot>>) -> Self
    {
        Self{ commands, events, snapshot }
    }

    /// Subscribe to the runtime's [`RuntimeEvent`] stream. Each subscriber gets its own lagging-tolerant receiver.
    pub fn events(&self) -> broadcast::Receiver<RuntimeEvent>
    {
        self.events.subscribe()
    }

    /// Current connection state, per the last published snapshot.
    pub fn state(&self) -> ConnectionState
    {
        self.snapshot.read().unwrap().state
    }

    /// Shorthand for `state().is_connected()`.
    pub fn is_connected(&self) -> bool
    {
        self.state().is_connected()
    }

    /// The latest performance report, per the last published snapshot.
    pub fn metrics(&self) -> MetricsReport
    {
        self.snapshot.read().unwrap().metrics
    }

    /// Current outbox occupancy, per the last published snapshot.
    pub fn queue_size(&self) -> usize
    {
        self.snapshot.read().unwrap().queue_size
    }

    /// Open the connection. If already `connecting`/`connected`, this is a no-op success. A connect-path failure is
    /// absorbed into the reconnect loop (and this resolves `Ok`) when reconnect is enabled; otherwise the failure is
    /// returned directly.
    pub async fn connect(&self) -> Result<(), RuntimeError>
    {
        let (respond, rx) = oneshot::channel();
        self.commands.send(Command::Connect{ respond }).await.map_err(|_| task_stopped())?;
        rx.await.map_err(|_| task_stopped())?
    }

    /// Close the connection (if open), cancel any scheduled reconnect, and stop heartbeating. Never fails.
    pub async fn disconnect(&self, code: Option<u16>, reason: Option<String>)
    {
        let (respond, rx) = oneshot::channel();
        if self.commands.send(Command::Disconnect{ code, reason, respond }).await.is_ok()
        {
            let _ = rx.await;
        }
    }

    /// Send `payload` with default [`SendOptions`]. See [`RuntimeHandle::send_with_options`].
    pub async fn send(&self, payload: serde_json::Value) -> Result<(), RuntimeError>
    {
        self.send_with_options(payload, SendOptions::default()).await
    }

    /// Send `payload`. If connected, dispatches immediately; on dispatch failure (or while disconnected), enqueues
    /// when the message queue is enabled, otherwise fails with [`RuntimeErrorKind::State`].
    pub async fn send_with_options(&self, payload: serde_json::Value, options: SendOptions) -> Result<(), RuntimeError>
    {
        let (respond, rx) = oneshot::channel();
        self.commands.send(Command::Send{ payload, options, respond }).await.map_err(|_| task_stopped())?;
        rx.await.map_err(|_| task_stopped())?
    }

    /// Send raw bytes, bypassing the queue, middleware, and codec chain entirely. Requires an active connection.
    pub async fn send_binary(&self, bytes: Vec<u8>) -> Result<(), RuntimeError>
    {
        let (respond, rx) = oneshot::channel();
        self.commands.send(Command::SendBinary{ bytes, respond }).await.map_err(|_| task_stopped())?;
        rx.await.map_err(|_| task_stopped())?
    }

    /// Buffer `payload` into the [`BatchSender`] overlay. Requires [`RuntimeConfig::batch_enabled`]. The batch is
    /// flushed as one envelope once a size, byte, or time trigger fires; this call only reports whether buffering
    /// itself succeeded, not the eventual flush's delivery outcome.
    pub async fn send_batched(&self, payload: serde_json::Value) -> Result<(), RuntimeError>
    {
        let (respond, rx) = oneshot::channel();
        self.commands.send(Command::SendBatched{ payload, respond }).await.map_err(|_| task_stopped())?;
        rx.await.map_err(|_| task_stopped())?
    }

    /// Issue a correlated request and await its paired response. Requires an active connection; resolves with
    /// [`RuntimeErrorKind::Timeout`] if no response arrives within `timeout` (or [`RpcConfig::default_timeout`]).
    pub async fn request(&self, payload: serde_json::Value, timeout: Option<Duration>) -> Result<serde_json::Value, RuntimeError>
    {
        let (respond, rx) = oneshot::channel();
        self.commands.send(Command::Request{ payload, timeout, respond }).await.map_err(|_| task_stopped())?;
        let completion = rx.await.map_err(|_| task_stopped())??;
        match completion.await.map_err(|_| task_stopped())?
        {
            RpcOutcome::Resolved(value) => Ok(value),
            RpcOutcome::Rejected(err) => Err(err),
        }
    }

    /// Register a router handler on `pattern`. See [`Router::on`].
    pub async fn on(&self, pattern: impl Into<String>, priority: i32, handler: impl Fn(&serde_json::Value) + Send + Sync + 'static)
    {
        let _ = self.commands.send(Command::On{ pattern: pattern.into(), priority, handler: Box::new(handler) }).await;
    }

    /// Register a once-firing router handler on `pattern`. See [`Router::once`].
    pub async fn once(&self, pattern: impl Into<String>, priority: i32, handler: impl Fn(&serde_json::Value) + Send + Sync + 'static)
    {
        let _ = self.commands.send(Command::Once{ pattern: pattern.into(), priority, handler: Box::new(handler) }).await;
    }

    /// Remove every router handler registered on `pattern`.
    pub async fn off(&self, pattern: impl Into<String>)
    {
        let _ = self.commands.send(Command::Off{ pattern: pattern.into() }).await;
    }

    /// Set the router's fallback handler.
    pub async fn set_default_route(&self, handler: impl Fn(&serde_json::Value) + Send + Sync + 'static)
    {
        let _ = self.commands.send(Command::SetDefaultRoute{ handler: Box::new(handler) }).await;
    }

    /// Mark `channel` subscribed, so channel-bearing inbound messages on it are routed.
    pub async fn subscribe(&self, channel: impl Into<String>)
    {
        let _ = self.commands.send(Command::Subscribe{ channel: channel.into() }).await;
    }

    /// Remove a channel subscription.
    pub async fn unsubscribe(&self, channel: impl Into<String>)
    {
        let _ = self.commands.send(Command::Unsubscribe{ channel: channel.into() }).await;
    }

    /// Register `middleware` on the chain(s) selected by `scope`. See [`MiddlewarePipeline`].
    pub async fn use_middleware(&self, scope: MiddlewareScope, middleware: Arc<dyn Middleware>)
    {
        let _ = self.commands.send(Command::UseMiddleware{ scope, middleware }).await;
    }

    /// Discard every currently-queued message.
    pub async fn clear_queue(&self)
    {
        let _ = self.commands.send(Command::ClearQueue).await;
    }

    /// Register `handler` to fire on every [`RuntimeEvent`] named `event` (e.g. `"open"`, `"message"`,
    /// `"reconnecting"` — see [`RuntimeEvent::name`]). This is the callback-style counterpart to
    /// [`RuntimeHandle::events`]'s stream-style subscription; both observe the same emissions.
    pub async fn on_event(&self, event: impl Into<String>, handler: impl Fn(&RuntimeEvent) + Send + Sync + 'static)
    {
        let _ = self.commands.send(Command::OnEvent{ event: event.into(), handler: Box::new(handler) }).await;
    }

    /// Register `handler` to fire at most once for `event`, then self-remove.
    pub async fn once_event(&self, event: impl Into<String>, handler: impl Fn(&RuntimeEvent) + Send + Sync + 'static)
    {
        let _ = self.commands.send(Command::OnceEvent{ event: event.into(), handler: Box::new(handler) }).await;
    }

    /// Remove every handler registered for `event`.
    pub async fn off_event(&self, event: impl Into<String>)
    {
        let _ = self.commands.send(Command::OffEvent{ event: event.into() }).await;
    }

    /// Set the per-event listener count above which a warning is logged once.
    pub async fn set_max_event_listeners(&self, max: usize)
    {
        let _ = self.commands.send(Command::SetMaxEventListeners{ max }).await;
    }

    /// Remove every handler registered for every event name.
    pub async fn remove_all_event_listeners(&self)
    {
        let _ = self.commands.send(Command::RemoveAllEventListeners).await;
    }

    /// Permanently stop the runtime: closes the connection, rejects every pending ACK/RPC, clears the queue, and
    /// transitions to [`ConnectionState::Destroyed`]. Idempotent; every operation after this fails fast with a
    /// [`RuntimeErrorKind::State`] error.
    pub async fn destroy(&self)
    {
        let (respond, rx) = oneshot::channel();
        if self.commands.send(Command::Destroy{ respond }).await.is_ok()
        {
            let _ = rx.await;
        }
    }
}

//-------------------------------------------------------------------------------------------------------------------

/// Make the bounded command channel and broadcast event channel a [`RuntimeHandle`]/[`RuntimeTask`] pair share.
pub(crate) fn channel_pair() -> (mpsc::Sender<Command>, mpsc::Receiver<Command>, broadcast::Sender<RuntimeEvent>)
{
    let (commands_tx, commands_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
    let (events_tx, _events_rx) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
    (commands_tx, commands_rx, events_tx)
}

//-------------------------------------------------------------------------------------------------------------------
