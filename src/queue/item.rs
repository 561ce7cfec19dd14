//local shortcuts

//third-party shortcuts
use serde::{Deserialize, Serialize};

//standard shortcuts
use std::time::SystemTime;

//-------------------------------------------------------------------------------------------------------------------

/// A priority band for outbound messages. Ordered `High > Normal > Low`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub enum Priority
{
    Low,
    Normal,
    High,
}

impl Default for Priority
{
    fn default() -> Self
    {
        Priority::Normal
    }
}

//-------------------------------------------------------------------------------------------------------------------

/// One entry in a [`super::MessageQueue`].
///
/// `id` is unique within the owning queue; `enqueued_at` is monotonic non-decreasing under `SystemTime::now()`.
#[derive(Debug, Clone, PartialEq)]
pub struct QueueItem
{
    pub id          : String,
    pub payload     : serde_json::Value,
    pub priority    : Priority,
    pub enqueued_at : SystemTime,
    pub retries     : u32,
}

//-------------------------------------------------------------------------------------------------------------------
