#[allow(unused_imports)]
use crate as ws_runtime;

//module tree
mod error;
mod id_gen;
mod event_bus;
mod state;
mod session;
mod reconnect;
mod heartbeat;
mod queue;
mod middleware;
mod codec;
mod ack;
mod rpc;
mod router;
mod batch;
mod dedup;
mod monitor;
mod adapter;
mod config;
mod event;
mod handle;
mod task;

//API exports
pub use error::*;
pub(crate) use id_gen::*;
pub use event_bus::*;
pub use state::*;
pub(crate) use session::*;
pub use reconnect::*;
pub use heartbeat::*;
pub use queue::*;
pub use middleware::*;
pub use codec::*;
pub use ack::*;
pub use rpc::*;
pub use router::*;
pub use batch::*;
pub use dedup::*;
pub use monitor::*;
pub use adapter::*;
pub use config::*;
pub use event::*;
pub use handle::*;
pub use task::Runtime;

//-------------------------------------------------------------------------------------------------------------------
