//local shortcuts

//third-party shortcuts

//standard shortcuts
use std::collections::HashMap;
use std::sync::Mutex;

//-------------------------------------------------------------------------------------------------------------------

/// A string-valued key/value store with best-effort durability.
///
/// This is the persistence collaborator named in the base spec: the core only assumes synchronous get/set/remove
/// on strings, with non-fatal errors and recognizable quota exhaustion. Consumers wire in a real backend (e.g. a
/// browser's `localStorage`, a file, a small embedded database); [`InMemoryQueueStore`] is provided for tests and
/// for consumers who don't need durability across process restarts.
pub trait QueueStore: Send + Sync
{
    /// Fetch the value for `key`, or `Ok(None)` if absent.
    fn get(&self, key: &str) -> Result<Option<String>, QueueStoreError>;

    /// Store `value` under `key`.
    fn set(&self, key: &str, value: &str) -> Result<(), QueueStoreError>;

    /// Remove `key`, if present.
    fn remove(&self, key: &str) -> Result<(), QueueStoreError>;
}

//-------------------------------------------------------------------------------------------------------------------

/// An error reported by a [`QueueStore`] implementation.
#[derive(Debug, Clone)]
pub enum QueueStoreError
{
    /// The store has no remaining capacity; the queue should shrink and retry.
    QuotaExceeded,
    /// Any other backend failure, carrying a description.
    Backend(String),
}

impl std::fmt::Display for QueueStoreError
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        match self
        {
            QueueStoreError::QuotaExceeded => write!(f, "QueueStoreError::QuotaExceeded"),
            QueueStoreError::Backend(msg)  => write!(f, "QueueStoreError::Backend({msg})"),
        }
    }
}

impl std::error::Error for QueueStoreError {}

//-------------------------------------------------------------------------------------------------------------------

/// An in-memory [`QueueStore`] with no durability across process restarts.
///
/// Useful as the default for consumers who don't provide a real backend, and for tests.
#[derive(Debug, Default)]
pub struct InMemoryQueueStore
{
    map: Mutex<HashMap<String, String>>,
}

impl InMemoryQueueStore
{
    /// Make a new, empty store.
    pub fn new() -> Self
    {
        Self::default()
    }
}

impl QueueStore for InMemoryQueueStore
{
    fn get(&self, key: &str) -> Result<Option<String>, QueueStoreError>
    {
        Ok(self.map.lock().unwrap().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), QueueStoreError>
    {
        self.map.lock().unwrap().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), QueueStoreError>
    {
        self.map.lock().unwrap().remove(key);
        Ok(())
    }
}

//-------------------------------------------------------------------------------------------------------------------
