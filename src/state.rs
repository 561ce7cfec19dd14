//local shortcuts

//third-party shortcuts

//standard shortcuts
use std::time::SystemTime;

//-------------------------------------------------------------------------------------------------------------------

/// The connection's lifecycle state.
///
/// Exactly one value holds at any instant; transitions follow the diagram documented on [`ConnectionStateMachine`].
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ConnectionState
{
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
    Reconnecting,
    /// Terminal: the owning facade was destroyed. All further public operations fail fast.
    Destroyed,
}

impl ConnectionState
{
    /// Whether the runtime is usable for sending messages directly (without queueing).
    pub fn is_connected(&self) -> bool
    {
        matches!(self, ConnectionState::Connected)
    }

    /// Whether the state is terminal for the lifetime of the facade.
    pub fn is_destroyed(&self) -> bool
    {
        matches!(self, ConnectionState::Destroyed)
    }
}

impl std::fmt::Display for ConnectionState
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        match self
        {
            ConnectionState::Disconnected  => write!(f, "disconnected"),
            ConnectionState::Connecting    => write!(f, "connecting"),
            ConnectionState::Connected     => write!(f, "connected"),
            ConnectionState::Disconnecting => write!(f, "disconnecting"),
            ConnectionState::Reconnecting  => write!(f, "reconnecting"),
            ConnectionState::Destroyed     => write!(f, "destroyed"),
        }
    }
}

//-------------------------------------------------------------------------------------------------------------------

/// A `state-change` notification: emitted before any state-dependent side effect runs.
#[derive(Debug, Clone, Copy)]
pub struct StateChange
{
    pub old_state  : ConnectionState,
    pub new_state  : ConnectionState,
    pub timestamp  : SystemTime,
}

//-------------------------------------------------------------------------------------------------------------------

/// Owns the connection lifecycle state and enforces the transition diagram.
///
/// Subsystems observe `state()` read-only; only the owning facade task calls `transition`.
#[derive(Debug)]
pub struct ConnectionStateMachine
{
    state: ConnectionState,
}

impl ConnectionStateMachine
{
    /// Make a new machine, starting `disconnected`.
    pub fn new() -> Self
    {
        Self{ state: ConnectionState::Disconnected }
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState
    {
        self.state
    }

    /// Force a transition to `new_state`, returning the [`StateChange`] event to emit.
    ///
    /// Validity of the transition per the diagram is the caller's responsibility (the facade task drives this
    /// machine from a fixed set of call sites, each of which already knows the transition is legal); this keeps the
    /// machine itself a simple, panics-never state holder rather than a second place encoding the diagram.
    pub fn transition(&mut self, new_state: ConnectionState) -> StateChange
    {
        let old_state = self.state;
        self.state = new_state;
        StateChange{ old_state, new_state, timestamp: SystemTime::now() }
    }
}

impl Default for ConnectionStateMachine
{
    fn default() -> Self
    {
        Self::new()
    }
}

//-------------------------------------------------------------------------------------------------------------------


//-------------------------------------------------------------------------------------------------------------------
