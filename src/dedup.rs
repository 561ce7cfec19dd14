//local shortcuts
use crate::*;

//third-party shortcuts

//standard shortcuts
use std::collections::{HashMap, VecDeque};
use std::time::{Duration, SystemTime};

//-------------------------------------------------------------------------------------------------------------------

/// Which key(s) the [`Deduplicator`] derives from a message.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum DedupStrategy
{
    /// Only `id:<idField>`, when the message carries an `id`. Messages without an id are never flagged duplicate.
    IdOnly,
    /// Only `hash:<djb2>` over the message's serialization.
    HashOnly,
    /// Both: `id:<idField>` (when present) and `hash:<djb2>`. A duplicate on either key counts.
    Both,
}

//-------------------------------------------------------------------------------------------------------------------

/// Config for the [`Deduplicator`].
#[derive(Debug, Clone, Copy)]
pub struct DedupConfig
{
    /// How long a record is retained before the periodic sweep evicts it. Defaults to 60 seconds.
    pub window_size: Duration,
    /// Maximum number of retained records; the oldest is evicted before insertion past this. Defaults to 10,000.
    pub capacity: usize,
    /// Key derivation strategy. Defaults to [`DedupStrategy::Both`].
    pub strategy: DedupStrategy,
}

impl Default for DedupConfig
{
    fn default() -> Self
    {
        Self{ window_size: Duration::from_secs(60), capacity: 10_000, strategy: DedupStrategy::Both }
    }
}

//-------------------------------------------------------------------------------------------------------------------

/// A djb2 hash over `bytes`, used to derive the `hash:` dedup key.
fn djb2(bytes: &[u8]) -> u64
{
    let mut hash: u64 = 5381;
    for &b in bytes
    {
        hash = hash.wrapping_mul(33).wrapping_add(b as u64);
    }
    hash
}

fn derive_keys(message: &serde_json::Value, strategy: DedupStrategy) -> Vec<String>
{
    let id_key = message.get("id").and_then(|v| v.as_str()).map(|id| format!("id:{id}"));
    let hash_key = || format!("hash:{:016x}", djb2(serde_json::to_vec(message).unwrap_or_default().as_slice()));

    match strategy
    {
        DedupStrategy::IdOnly => id_key.into_iter().collect(),
        DedupStrategy::HashOnly => vec![hash_key()],
        DedupStrategy::Both => id_key.into_iter().chain(std::iter::once(hash_key())).collect(),
    }
}

//-------------------------------------------------------------------------------------------------------------------

/// Sliding-window duplicate suppression.
///
/// Records are kept both in a `HashMap` (for O(1) membership checks) and a `VecDeque` in insertion order (which, for
/// a monotonic clock, is also age order) so both the periodic sweep and capacity eviction can find the oldest
/// records without a full scan.
#[derive(Debug)]
pub struct Deduplicator
{
    config  : DedupConfig,
    records : HashMap<String, SystemTime>,
    order   : VecDeque<String>,
}

impl Deduplicator
{
    /// Make a new, empty deduplicator.
    pub fn new(config: DedupConfig) -> Self
    {
        Self{ config, records: HashMap::new(), order: VecDeque::new() }
    }

    /// Current configuration.
    pub fn config(&self) -> &DedupConfig
    {
        &self.config
    }

    /// Whether any key derived from `message` is already recorded.
    pub fn is_duplicate(&self, message: &serde_json::Value) -> bool
    {
        derive_keys(message, self.config.strategy).iter().any(|k| self.records.contains_key(k))
    }

    /// Record `message`'s derived keys as processed at the current time, evicting the oldest record first whenever
    /// capacity would otherwise be exceeded.
    pub fn mark_processed(&mut self, message: &serde_json::Value)
    {
        let now = SystemTime::now();
        for key in derive_keys(message, self.config.strategy)
        {
            if self.records.contains_key(&key) { continue; }

            while self.records.len() >= self.config.capacity
            {
                let Some(oldest) = self.order.pop_front() else { break; };
                self.records.remove(&oldest);
            }

            self.records.insert(key.clone(), now);
            self.order.push_back(key);
        }
    }

    /// Evict every record older than `window_size`. Intended to run on a periodic timer firing every
    /// [`Deduplicator::sweep_interval`].
    pub fn sweep(&mut self)
    {
        let now = SystemTime::now();
        while let Some(oldest_key) = self.order.front()
        {
            let Some(&recorded_at) = self.records.get(oldest_key) else
            {
                // already evicted by capacity pressure; drop the stale order entry and keep scanning
                self.order.pop_front();
                continue;
            };

            if now.duration_since(recorded_at).unwrap_or(Duration::ZERO) <= self.config.window_size
            {
                break;
            }

            let key = self.order.pop_front().expect("front() just returned Some");
            self.records.remove(&key);
        }
    }

    /// The interval at which [`Deduplicator::sweep`] should be invoked: `window_size / 2`.
    pub fn sweep_interval(&self) -> Duration
    {
        self.config.window_size / 2
    }

    /// Number of records currently retained.
    pub fn len(&self) -> usize
    {
        self.records.len()
    }

    /// Whether no records are currently retained.
    pub fn is_empty(&self) -> bool
    {
        self.records.is_empty()
    }
}

//-------------------------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn marked_message_is_reported_duplicate()
    {
        let mut dedup = Deduplicator::new(DedupConfig::default());
        let msg = serde_json::json!({ "id": "m1", "type": "chat" });
        assert!(!dedup.is_duplicate(&msg));
        dedup.mark_processed(&msg);
        assert!(dedup.is_duplicate(&msg));
    }

    #[test]
    fn hash_strategy_catches_duplicates_without_an_id()
    {
        let mut dedup = Deduplicator::new(DedupConfig{ strategy: DedupStrategy::HashOnly, ..DedupConfig::default() });
        let msg = serde_json::json!({ "type": "ping", "seq": 1 });
        dedup.mark_processed(&msg);
        assert!(dedup.is_duplicate(&msg));
        assert!(!dedup.is_duplicate(&serde_json::json!({ "type": "ping", "seq": 2 })));
    }

    #[test]
    fn id_only_strategy_ignores_messages_without_an_id()
    {
        let mut dedup = Deduplicator::new(DedupConfig{ strategy: DedupStrategy::IdOnly, ..DedupConfig::default() });
        let msg = serde_json::json!({ "type": "ping" });
        dedup.mark_processed(&msg);
        assert!(!dedup.is_duplicate(&msg));
        assert_eq!(dedup.len(), 0);
    }

    #[test]
    fn sweep_evicts_expired_records()
    {
        let mut dedup = Deduplicator::new(DedupConfig{ window_size: Duration::from_millis(1), ..DedupConfig::default() });
        let msg = serde_json::json!({ "id": "m1" });
        dedup.mark_processed(&msg);
        std::thread::sleep(Duration::from_millis(5));
        dedup.sweep();
        assert!(!dedup.is_duplicate(&msg));
        assert_eq!(dedup.len(), 0);
    }

    #[test]
    fn capacity_evicts_oldest_record_first()
    {
        let mut dedup = Deduplicator::new(DedupConfig{ strategy: DedupStrategy::IdOnly, capacity: 2, ..DedupConfig::default() });
        dedup.mark_processed(&serde_json::json!({ "id": "a" }));
        dedup.mark_processed(&serde_json::json!({ "id": "b" }));
        dedup.mark_processed(&serde_json::json!({ "id": "c" }));

        assert!(!dedup.is_duplicate(&serde_json::json!({ "id": "a" })));
        assert!(dedup.is_duplicate(&serde_json::json!({ "id": "b" })));
        assert!(dedup.is_duplicate(&serde_json::json!({ "id": "c" })));
        assert_eq!(dedup.len(), 2);
    }

    #[test]
    fn sweep_interval_is_half_the_window()
    {
        let dedup = Deduplicator::new(DedupConfig{ window_size: Duration::from_secs(10), ..DedupConfig::default() });
        assert_eq!(dedup.sweep_interval(), Duration::from_secs(5));
    }
}

//-------------------------------------------------------------------------------------------------------------------
