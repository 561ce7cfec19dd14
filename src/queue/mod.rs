//module tree
mod item;
mod persistence;

//API exports
pub use item::*;
pub use persistence::*;

//-------------------------------------------------------------------------------------------------------------------
//local shortcuts
use crate::*;

//third-party shortcuts
use serde::{Deserialize, Serialize};

//standard shortcuts
use std::collections::VecDeque;
use std::time::{Duration, SystemTime};

//-------------------------------------------------------------------------------------------------------------------

/// A snapshot of queue occupancy, per the base spec's `getStats()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueueStats
{
    pub len         : usize,
    pub bytes       : usize,
    pub high_count  : usize,
    pub normal_count: usize,
    pub low_count   : usize,
}

//-------------------------------------------------------------------------------------------------------------------

/// Config for the [`MessageQueue`].
#[derive(Debug, Clone)]
pub struct QueueConfig
{
    /// Whether offline/overflow messages are queued at all. Defaults to `true`.
    pub enabled: bool,
    /// Maximum total estimated byte size the queue may hold. Defaults to 1 MiB.
    pub max_size: usize,
    /// Maximum estimated byte size of any single message. Defaults to 64 KiB.
    pub max_message_size: usize,
    /// Whether the queue persists itself to a [`QueueStore`] on each mutation. Defaults to `false`.
    pub persistent: bool,
    /// The storage key used when `persistent` is set. Defaults to `"ws_runtime::queue"`.
    pub storage_key: String,
}

impl Default for QueueConfig
{
    fn default() -> Self
    {
        Self{
            enabled          : true,
            max_size         : 1024 * 1024,
            max_message_size : 64 * 1024,
            persistent       : false,
            storage_key      : "ws_runtime::queue".to_string(),
        }
    }
}

//-------------------------------------------------------------------------------------------------------------------

/// How long a persisted entry may sit in storage before `restore()` treats it as expired.
const PERSISTED_ENTRY_EXPIRY: Duration = Duration::from_secs(24 * 60 * 60);

//-------------------------------------------------------------------------------------------------------------------

/// A serializable snapshot of one queue item, used by the persistence layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PersistedItem
{
    id          : String,
    payload     : serde_json::Value,
    priority    : Priority,
    enqueued_at : SystemTime,
    retries     : u32,
}

//-------------------------------------------------------------------------------------------------------------------

/// Priority-ordered, bounded, optionally persistent outbox.
///
/// Items are kept in a flat `VecDeque` with a lazily-maintained sort: `enqueue` marks the queue unsorted, and any
/// order-dependent read re-sorts (stable, so FIFO-within-band is preserved) before looking at the front. This gives
/// amortized O(n log n) bulk enqueue and O(1) reads between enqueues, matching the base spec's sorting strategy.
#[derive(Debug)]
pub struct MessageQueue
{
    config    : QueueConfig,
    items     : VecDeque<QueueItem>,
    bytes     : usize,
    is_sorted : bool,
    degraded  : bool,
}

impl MessageQueue
{
    /// Make a new, empty queue.
    pub fn new(config: QueueConfig) -> Self
    {
        Self{ config, items: VecDeque::new(), bytes: 0, is_sorted: true, degraded: false }
    }

    /// Current configuration.
    pub fn config(&self) -> &QueueConfig
    {
        &self.config
    }

    /// Estimate the serialized byte size of a payload (JSON length is a reasonable, cheap stand-in for wire size).
    pub fn estimate_size(payload: &serde_json::Value) -> usize
    {
        serde_json::to_vec(payload).map(|v| v.len()).unwrap_or(0)
    }

    fn ensure_sorted(&mut self)
    {
        if self.is_sorted { return; }
        // descending priority, then ascending enqueued_at within a priority - both stable so ties keep insertion order
        let mut buf: Vec<QueueItem> = self.items.drain(..).collect();
        buf.sort_by(|a, b| {
            b.priority.cmp(&a.priority).then(a.enqueued_at.cmp(&b.enqueued_at))
        });
        self.items = buf.into();
        self.is_sorted = true;
    }

    /// Enqueue `payload` at `priority`. Fails with [`RuntimeErrorKind::MessageSize`] if the estimated size exceeds
    /// `max_message_size`. On overflow (total bytes would exceed `max_size`), evicts the oldest lowest-priority item
    /// first, even when the new item is itself the lowest priority present.
    pub fn enqueue(&mut self, payload: serde_json::Value, priority: Priority) -> Result<String, RuntimeError>
    {
        let size = Self::estimate_size(&payload);
        if size > self.config.max_message_size
        {
            return Err(RuntimeError::new(
                RuntimeErrorKind::MessageSize,
                format!("payload of {size} bytes exceeds max_message_size of {}", self.config.max_message_size),
            ));
        }

        while self.bytes + size > self.config.max_size && !self.items.is_empty()
        {
            self.evict_oldest_lowest_priority();
        }

        let id = format!("q-{}-{}", self.items.len(), rand_suffix());
        let item = QueueItem{
            id          : id.clone(),
            payload,
            priority,
            enqueued_at : SystemTime::now(),
            retries     : 0,
        };
        self.bytes += size;
        self.items.push_back(item);
        self.is_sorted = false;

        Ok(id)
    }

    fn evict_oldest_lowest_priority(&mut self)
    {
        self.ensure_sorted();
        // bands run descending priority, ascending enqueued_at within a band, so the last band is the lowest
        // priority present and its first item (not its last) is the oldest one in it.
        let Some(lowest) = self.items.back().map(|item| item.priority) else { return; };
        let Some(index) = self.items.iter().position(|item| item.priority == lowest) else { return; };
        if let Some(evicted) = self.items.remove(index)
        {
            self.bytes = self.bytes.saturating_sub(Self::estimate_size(&evicted.payload));
            tracing::debug!(id = %evicted.id, "evicted queue item on overflow");
        }
    }

    /// Remove and return the highest-band, oldest item.
    pub fn dequeue(&mut self) -> Option<QueueItem>
    {
        self.ensure_sorted();
        let item = self.items.pop_front()?;
        self.bytes = self.bytes.saturating_sub(Self::estimate_size(&item.payload));
        Some(item)
    }

    /// View the highest-band, oldest item without removing it.
    pub fn peek(&mut self) -> Option<&QueueItem>
    {
        self.ensure_sorted();
        self.items.front()
    }

    /// Remove and return up to `n` items in dequeue order.
    pub fn dequeue_batch(&mut self, n: usize) -> Vec<QueueItem>
    {
        let mut out = Vec::with_capacity(n);
        for _ in 0..n
        {
            let Some(item) = self.dequeue() else { break; };
            out.push(item);
        }
        out
    }

    /// Re-enqueue an item at its original priority with `retries` incremented, preserving its id.
    fn requeue_with_retry(&mut self, mut item: QueueItem)
    {
        item.retries += 1;
        let size = Self::estimate_size(&item.payload);
        self.bytes += size;
        self.items.push_back(item);
        self.is_sorted = false;
    }

    /// Drain items one at a time, invoking `send_fn` for each. Stops on the first failure, re-enqueueing that item
    /// with `retries + 1`. Returns the number of items successfully delivered.
    pub async fn flush<F, Fut>(&mut self, mut send_fn: F) -> usize
    where
        F: FnMut(QueueItem) -> Fut,
        Fut: std::future::Future<Output = Result<(), RuntimeError>>,
    {
        let mut delivered = 0;
        while let Some(item) = self.dequeue()
        {
            let item_for_retry = item.clone();
            match send_fn(item).await
            {
                Ok(()) => delivered += 1,
                Err(err) =>
                {
                    tracing::warn!(?err, "queue flush send failed; re-enqueueing item");
                    self.requeue_with_retry(item_for_retry);
                    break;
                }
            }
        }
        delivered
    }

    /// Remove all items.
    pub fn clear(&mut self)
    {
        self.items.clear();
        self.bytes = 0;
        self.is_sorted = true;
    }

    /// Find an item by id without removing it.
    pub fn find_by_id(&self, id: &str) -> Option<&QueueItem>
    {
        self.items.iter().find(|i| i.id == id)
    }

    /// Remove an item by id, returning it if present.
    pub fn remove_by_id(&mut self, id: &str) -> Option<QueueItem>
    {
        let idx = self.items.iter().position(|i| i.id == id)?;
        let item = self.items.remove(idx)?;
        self.bytes = self.bytes.saturating_sub(Self::estimate_size(&item.payload));
        Some(item)
    }

    /// All items currently held, in dequeue order.
    pub fn get_all(&mut self) -> Vec<QueueItem>
    {
        self.ensure_sorted();
        self.items.iter().cloned().collect()
    }

    /// Current occupancy statistics.
    pub fn get_stats(&self) -> QueueStats
    {
        let mut stats = QueueStats{ len: self.items.len(), bytes: self.bytes, ..Default::default() };
        for item in &self.items
        {
            match item.priority
            {
                Priority::High   => stats.high_count += 1,
                Priority::Normal => stats.normal_count += 1,
                Priority::Low    => stats.low_count += 1,
            }
        }
        stats
    }

    /// Number of items currently held.
    pub fn len(&self) -> usize
    {
        self.items.len()
    }

    /// Whether the queue is empty.
    pub fn is_empty(&self) -> bool
    {
        self.items.is_empty()
    }

    /// Serialize the queue to a [`QueueStore`] under `config().storage_key`. Storage errors are logged and
    /// non-fatal; on repeated failure the queue continues operating in memory-only mode.
    pub fn persist(&mut self, store: &dyn QueueStore)
    {
        if !self.config.persistent || self.degraded { return; }

        let snapshot: Vec<PersistedItem> = self.items.iter().map(|i| PersistedItem{
            id          : i.id.clone(),
            payload     : i.payload.clone(),
            priority    : i.priority,
            enqueued_at : i.enqueued_at,
            retries     : i.retries,
        }).collect();

        let Ok(serialized) = serde_json::to_string(&snapshot) else
        {
            tracing::error!("failed to serialize queue for persistence");
            return;
        };

        if let Err(err) = store.set(&self.config.storage_key, &serialized)
        {
            tracing::warn!(?err, "queue persistence write failed; attempting shrink-and-retry");
            self.evict_half_of_low_band();
            let snapshot: Vec<PersistedItem> = self.items.iter().map(|i| PersistedItem{
                id: i.id.clone(), payload: i.payload.clone(), priority: i.priority,
                enqueued_at: i.enqueued_at, retries: i.retries,
            }).collect();
            let Ok(retry_serialized) = serde_json::to_string(&snapshot) else { return; };
            if let Err(err) = store.set(&self.config.storage_key, &retry_serialized)
            {
                tracing::error!(?err, "queue persistence still failing after shrink; continuing memory-only");
                self.degraded = true;
            }
        }
    }

    fn evict_half_of_low_band(&mut self)
    {
        self.ensure_sorted();
        let low_indices: Vec<usize> = self.items.iter().enumerate()
            .filter(|(_, i)| i.priority == Priority::Low)
            .map(|(idx, _)| idx)
            .collect();
        let to_evict = low_indices.len() / 2;
        for idx in low_indices.into_iter().rev().take(to_evict)
        {
            if let Some(item) = self.items.remove(idx)
            {
                self.bytes = self.bytes.saturating_sub(Self::estimate_size(&item.payload));
            }
        }
    }

    /// Restore previously persisted items from `store`. Entries older than 24h are dropped; byte totals are
    /// recomputed from what survives.
    pub fn restore(&mut self, store: &dyn QueueStore)
    {
        if !self.config.persistent { return; }

        let Ok(Some(serialized)) = store.get(&self.config.storage_key) else { return; };
        let Ok(snapshot) = serde_json::from_str::<Vec<PersistedItem>>(&serialized) else
        {
            tracing::warn!("failed to deserialize persisted queue; discarding");
            return;
        };

        let now = SystemTime::now();
        self.items.clear();
        self.bytes = 0;
        for persisted in snapshot
        {
            let age = now.duration_since(persisted.enqueued_at).unwrap_or(Duration::ZERO);
            if age > PERSISTED_ENTRY_EXPIRY { continue; }

            let size = Self::estimate_size(&persisted.payload);
            self.bytes += size;
            self.items.push_back(QueueItem{
                id          : persisted.id,
                payload     : persisted.payload,
                priority    : persisted.priority,
                enqueued_at : persisted.enqueued_at,
                retries     : persisted.retries,
            });
        }
        self.is_sorted = false;
    }
}

fn rand_suffix() -> u32
{
    use rand::RngCore;
    rand::thread_rng().next_u32()
}

//-------------------------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests
{
    use super::*;

    fn payload(n: u32) -> serde_json::Value
    {
        serde_json::json!({ "n": n })
    }

    #[test]
    fn dequeue_returns_highest_band_first()
    {
        let mut q = MessageQueue::new(QueueConfig::default());
        q.enqueue(payload(1), Priority::Low).unwrap();
        q.enqueue(payload(2), Priority::High).unwrap();
        q.enqueue(payload(3), Priority::Normal).unwrap();

        assert_eq!(q.dequeue().unwrap().payload, payload(2));
        assert_eq!(q.dequeue().unwrap().payload, payload(3));
        assert_eq!(q.dequeue().unwrap().payload, payload(1));
    }

    #[test]
    fn same_band_is_fifo()
    {
        let mut q = MessageQueue::new(QueueConfig::default());
        q.enqueue(payload(1), Priority::Normal).unwrap();
        q.enqueue(payload(2), Priority::Normal).unwrap();
        q.enqueue(payload(3), Priority::Normal).unwrap();

        assert_eq!(q.dequeue().unwrap().payload, payload(1));
        assert_eq!(q.dequeue().unwrap().payload, payload(2));
        assert_eq!(q.dequeue().unwrap().payload, payload(3));
    }

    #[test]
    fn oversized_message_is_rejected()
    {
        let mut q = MessageQueue::new(QueueConfig{ max_message_size: 4, ..QueueConfig::default() });
        let err = q.enqueue(payload(123456789), Priority::Normal).unwrap_err();
        assert_eq!(err.kind(), RuntimeErrorKind::MessageSize);
    }

    #[test]
    fn overflow_evicts_oldest_low_band_item()
    {
        let small_payload = serde_json::json!({ "x": 1 });
        let size = MessageQueue::estimate_size(&small_payload);
        let mut q = MessageQueue::new(QueueConfig{ max_size: size * 2, max_message_size: size * 10, ..QueueConfig::default() });

        let id_low = q.enqueue(small_payload.clone(), Priority::Low).unwrap();
        q.enqueue(small_payload.clone(), Priority::Normal).unwrap();
        // this should evict the low-priority item to make room
        q.enqueue(small_payload.clone(), Priority::High).unwrap();

        assert!(q.find_by_id(&id_low).is_none());
        assert_eq!(q.len(), 2);
    }

    #[test]
    fn overflow_with_all_high_evicts_oldest_high()
    {
        let p = serde_json::json!({ "x": 1 });
        let size = MessageQueue::estimate_size(&p);
        let mut q = MessageQueue::new(QueueConfig{ max_size: size * 2, max_message_size: size * 10, ..QueueConfig::default() });

        let id1 = q.enqueue(p.clone(), Priority::High).unwrap();
        q.enqueue(p.clone(), Priority::High).unwrap();
        q.enqueue(p.clone(), Priority::High).unwrap();

        assert!(q.find_by_id(&id1).is_none());
        assert_eq!(q.len(), 2);
    }

    #[tokio::test]
    async fn flush_stops_and_requeues_on_failure()
    {
        let mut q = MessageQueue::new(QueueConfig::default());
        q.enqueue(payload(1), Priority::Normal).unwrap();
        q.enqueue(payload(2), Priority::Normal).unwrap();
        q.enqueue(payload(3), Priority::Normal).unwrap();

        let mut calls = 0;
        let delivered = q.flush(|item| {
            calls += 1;
            let should_fail = item.payload == payload(2);
            async move
            {
                if should_fail { Err(RuntimeError::new(RuntimeErrorKind::Connection, "nope")) } else { Ok(()) }
            }
        }).await;

        assert_eq!(delivered, 1);
        assert_eq!(calls, 2);
        assert_eq!(q.len(), 2); // item 2 (retried) and item 3 (never attempted)
        let requeued = q.find_by_id(&q.get_all()[0].id).unwrap();
        assert_eq!(requeued.retries, 1);
    }

    #[test]
    fn persist_and_restore_round_trips_modulo_expiry()
    {
        let store = InMemoryQueueStore::new();
        let mut q = MessageQueue::new(QueueConfig{ persistent: true, ..QueueConfig::default() });
        q.enqueue(payload(1), Priority::High).unwrap();
        q.enqueue(payload(2), Priority::Low).unwrap();
        q.persist(&store);

        let mut restored = MessageQueue::new(QueueConfig{ persistent: true, ..QueueConfig::default() });
        restored.restore(&store);
        assert_eq!(restored.len(), 2);
        assert_eq!(restored.dequeue().unwrap().payload, payload(1));
    }
}

//-------------------------------------------------------------------------------------------------------------------
