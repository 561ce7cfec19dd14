//local shortcuts
use crate::*;

//third-party shortcuts
use tokio_util::time::{delay_queue, DelayQueue};

//standard shortcuts
use std::collections::HashMap;
use std::time::{Duration, SystemTime};

//-------------------------------------------------------------------------------------------------------------------

/// Per-send options recognized by the [`AckTracker`].
#[derive(Debug, Clone, Copy)]
pub struct AckOptions
{
    /// How long to wait for a paired ACK before retrying or giving up. Defaults to 5 seconds.
    pub timeout: Duration,
    /// Number of re-sends attempted before invoking the timeout callback. Defaults to 0 (no retry).
    pub retries: u32,
}

impl Default for AckOptions
{
    fn default() -> Self
    {
        Self{ timeout: Duration::from_secs(5), retries: 0 }
    }
}

//-------------------------------------------------------------------------------------------------------------------

/// An outstanding reliable send awaiting its paired ACK.
#[derive(Debug, Clone)]
pub struct PendingAck
{
    pub id          : String,
    pub payload     : serde_json::Value,
    pub options     : AckOptions,
    pub enqueued_at : SystemTime,
    pub retries     : u32,
}

struct Entry
{
    pending   : PendingAck,
    timer_key : delay_queue::Key,
}

//-------------------------------------------------------------------------------------------------------------------

/// Result of a timer firing for some pending entry.
#[derive(Debug, Clone)]
pub enum AckTimerEvent
{
    /// Retries remain; the tracker already incremented the retry count and re-armed the timer. The caller must
    /// re-dispatch `payload` via the normal send path.
    Retry{ id: String, payload: serde_json::Value },
    /// Retries are exhausted; the entry has been removed. The caller should invoke its `onTimeout` equivalent.
    Exhausted{ id: String, payload: serde_json::Value },
}

//-------------------------------------------------------------------------------------------------------------------

/// Aggregate statistics over pending entries.
#[derive(Debug, Clone, Copy, Default)]
pub struct AckStats
{
    pub pending_count      : usize,
    pub total_retries      : u32,
    pub oldest_pending_age : Option<Duration>,
}

//-------------------------------------------------------------------------------------------------------------------

/// At-least-once delivery tracking with retry and timeout.
///
/// Every pending entry gets its own logical timer, multiplexed behind a single [`DelayQueue`] rather than one
/// `tokio::time::Sleep` per entry, matching how the many-outstanding-timers case is realized elsewhere in this
/// runtime. Dispatch of the original and retried payloads stays the caller's responsibility: this tracker only
/// bookkeeps pending state and arms/re-arms/cancels timers.
pub struct AckTracker
{
    entries : HashMap<String, Entry>,
    timers  : DelayQueue<String>,
}

impl std::fmt::Debug for AckTracker
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        f.debug_struct("AckTracker").field("pending_count", &self.entries.len()).finish()
    }
}

impl Default for AckTracker
{
    fn default() -> Self
    {
        Self::new()
    }
}

impl AckTracker
{
    /// Make a new, empty tracker.
    pub fn new() -> Self
    {
        Self{ entries: HashMap::new(), timers: DelayQueue::new() }
    }

    /// Register a pending ACK under `id` and arm its timeout timer.
    pub fn register(&mut self, id: String, payload: serde_json::Value, options: AckOptions)
    {
        let timer_key = self.timers.insert(id.clone(), options.timeout);
        let pending = PendingAck{ id: id.clone(), payload, options, enqueued_at: SystemTime::now(), retries: 0 };
        self.entries.insert(id, Entry{ pending, timer_key });
    }

    /// Process receipt of an ACK for `id`: cancels its timer and removes the entry.
    ///
    /// Returns `None` for a stray or duplicate ACK (no matching pending entry).
    pub fn on_ack(&mut self, id: &str) -> Option<PendingAck>
    {
        let entry = self.entries.remove(id)?;
        self.timers.remove(&entry.timer_key);
        Some(entry.pending)
    }

    /// Remove `id` without invoking any callback.
    pub fn cancel(&mut self, id: &str)
    {
        if let Some(entry) = self.entries.remove(id)
        {
            self.timers.remove(&entry.timer_key);
        }
    }

    /// Remove all pending entries, called on session loss.
    pub fn cancel_all(&mut self)
    {
        self.entries.clear();
        self.timers.clear();
    }

    /// Number of entries currently pending.
    pub fn pending_count(&self) -> usize
    {
        self.entries.len()
    }

    /// Aggregate statistics over pending entries.
    pub fn stats(&self) -> AckStats
    {
        let now = SystemTime::now();
        let total_retries = self.entries.values().map(|e| e.pending.retries).sum();
        let oldest_pending_age = self.entries.values()
            .map(|e| now.duration_since(e.pending.enqueued_at).unwrap_or(Duration::ZERO))
            .max();
        AckStats{ pending_count: self.entries.len(), total_retries, oldest_pending_age }
    }

    /// Await the next timer firing. Retries are handled internally (re-arm, return [`AckTimerEvent::Retry`]);
    /// exhausted entries are removed before returning [`AckTimerEvent::Exhausted`].
    ///
    /// Returns `None` once no timers remain armed. Intended to be awaited in a `tokio::select!` branch alongside
    /// the rest of the owning task's event sources, not polled in a tight loop on its own.
    pub async fn next_timeout(&mut self) -> Option<AckTimerEvent>
    {
        loop
        {
            let expired = std::future::poll_fn(|cx| self.timers.poll_expired(cx)).await?;
            let id = expired.into_inner();
            let Some(entry) = self.entries.get_mut(&id) else { continue; };

            if entry.pending.retries < entry.pending.options.retries
            {
                entry.pending.retries += 1;
                entry.timer_key = self.timers.insert(id.clone(), entry.pending.options.timeout);
                return Some(AckTimerEvent::Retry{ id, payload: entry.pending.payload.clone() });
            }

            let entry = self.entries.remove(&id).expect("just looked up by the same key");
            return Some(AckTimerEvent::Exhausted{ id, payload: entry.pending.payload });
        }
    }
}

//-------------------------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn on_ack_removes_entry_and_returns_it()
    {
        let mut tracker = AckTracker::new();
        tracker.register("a".to_string(), serde_json::json!({ "v": 1 }), AckOptions::default());
        let pending = tracker.on_ack("a").unwrap();
        assert_eq!(pending.id, "a");
        assert_eq!(tracker.pending_count(), 0);
    }

    #[test]
    fn stray_ack_returns_none()
    {
        let mut tracker = AckTracker::new();
        assert!(tracker.on_ack("nope").is_none());
    }

    #[test]
    fn cancel_all_clears_everything()
    {
        let mut tracker = AckTracker::new();
        tracker.register("a".to_string(), serde_json::json!({}), AckOptions::default());
        tracker.register("b".to_string(), serde_json::json!({}), AckOptions::default());
        tracker.cancel_all();
        assert_eq!(tracker.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_with_retries_remaining_yields_retry_and_rearms()
    {
        let mut tracker = AckTracker::new();
        tracker.register(
            "a".to_string(),
            serde_json::json!({ "v": 1 }),
            AckOptions{ timeout: Duration::from_millis(10), retries: 1 },
        );

        tokio::time::advance(Duration::from_millis(11)).await;
        match tracker.next_timeout().await.unwrap()
        {
            AckTimerEvent::Retry{ id, .. } => assert_eq!(id, "a"),
            other => panic!("expected Retry, got {other:?}"),
        }
        assert_eq!(tracker.pending_count(), 1);

        tokio::time::advance(Duration::from_millis(11)).await;
        match tracker.next_timeout().await.unwrap()
        {
            AckTimerEvent::Exhausted{ id, .. } => assert_eq!(id, "a"),
            other => panic!("expected Exhausted, got {other:?}"),
        }
        assert_eq!(tracker.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn zero_retries_times_out_immediately()
    {
        let mut tracker = AckTracker::new();
        tracker.register(
            "a".to_string(),
            serde_json::json!({}),
            AckOptions{ timeout: Duration::from_millis(5), retries: 0 },
        );
        tokio::time::advance(Duration::from_millis(6)).await;
        match tracker.next_timeout().await.unwrap()
        {
            AckTimerEvent::Exhausted{ id, .. } => assert_eq!(id, "a"),
            other => panic!("expected Exhausted, got {other:?}"),
        }
    }

    #[test]
    fn cancelled_entry_does_not_leave_a_stale_timer_id_behind()
    {
        let mut tracker = AckTracker::new();
        tracker.register("a".to_string(), serde_json::json!({}), AckOptions::default());
        tracker.cancel("a");
        assert_eq!(tracker.pending_count(), 0);
        assert!(tracker.entries.is_empty());
    }
}

//-------------------------------------------------------------------------------------------------------------------
