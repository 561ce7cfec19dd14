//local shortcuts
use crate::*;

//third-party shortcuts

//standard shortcuts
use std::time::{Duration, SystemTime};

//-------------------------------------------------------------------------------------------------------------------

/// The public event surface broadcast by a [`RuntimeHandle`]'s event stream.
///
/// Exactly mirrors the event names in the base design (`open`, `close`, `error`, `message`, `reconnecting`,
/// `reconnected`, `reconnect-failed`, `ping`, `pong`, `state-change`), realized as one Rust enum rather than a
/// stringly-typed emitter so subscribers get exhaustiveness checking.
#[derive(Debug, Clone)]
pub enum RuntimeEvent
{
    Open,
    Close{ code: u16, reason: String, was_clean: bool, timestamp: SystemTime },
    Error{ message: String, timestamp: SystemTime },
    Message{ data: serde_json::Value, timestamp: SystemTime },
    Reconnecting{ attempt: u32, max_attempts: u32, delay: Duration, timestamp: SystemTime },
    Reconnected{ attempts: u32, duration: Duration, timestamp: SystemTime },
    ReconnectFailed{ attempts: u32, reason: String, timestamp: SystemTime },
    Ping{ message: serde_json::Value, timestamp: SystemTime },
    Pong{ timestamp: SystemTime },
    StateChange{ old_state: ConnectionState, new_state: ConnectionState, timestamp: SystemTime },
}

impl From<StateChange> for RuntimeEvent
{
    fn from(change: StateChange) -> Self
    {
        RuntimeEvent::StateChange{ old_state: change.old_state, new_state: change.new_state, timestamp: change.timestamp }
    }
}

impl RuntimeEvent
{
    /// The string event name this variant is delivered under on the [`EventBus`]-backed callback registration
    /// surface (`RuntimeHandle::on_event`/`once_event`/`off_event` apply to these names; `RuntimeHandle::events`
    /// instead delivers every variant on one stream regardless of name).
    pub fn name(&self) -> &'static str
    {
        match self
        {
            RuntimeEvent::Open               => "open",
            RuntimeEvent::Close{ .. }         => "close",
            RuntimeEvent::Error{ .. }         => "error",
            RuntimeEvent::Message{ .. }       => "message",
            RuntimeEvent::Reconnecting{ .. }  => "reconnecting",
            RuntimeEvent::Reconnected{ .. }   => "reconnected",
            RuntimeEvent::ReconnectFailed{ .. } => "reconnect-failed",
            RuntimeEvent::Ping{ .. }          => "ping",
            RuntimeEvent::Pong{ .. }          => "pong",
            RuntimeEvent::StateChange{ .. }   => "state-change",
        }
    }
}

//-------------------------------------------------------------------------------------------------------------------
