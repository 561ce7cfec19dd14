//local shortcuts
use crate::*;

//third-party shortcuts

//standard shortcuts
use std::time::{Duration, Instant};

//-------------------------------------------------------------------------------------------------------------------

/// Config for the [`BatchSender`].
#[derive(Debug, Clone, Copy)]
pub struct BatchConfig
{
    /// Flush once the buffer holds at least this many messages. Defaults to 20.
    pub max_size: usize,
    /// Flush once the buffer's estimated byte size reaches this many bytes. Defaults to 16 KiB.
    pub max_bytes: usize,
    /// Flush once this long has elapsed since the first buffered message. Defaults to 100ms.
    pub max_wait: Duration,
}

impl Default for BatchConfig
{
    fn default() -> Self
    {
        Self{ max_size: 20, max_bytes: 16 * 1024, max_wait: Duration::from_millis(100) }
    }
}

//-------------------------------------------------------------------------------------------------------------------

/// Coalescing buffer with size/byte/time flush triggers.
///
/// The injected send function is supplied at flush time rather than stored, so this type stays plain data; the
/// owning task is responsible for polling [`BatchSender::deadline`] in its scheduling loop (e.g. a
/// `tokio::time::sleep_until` branch in a `tokio::select!`) and calling `flush` when it fires.
#[derive(Debug)]
pub struct BatchSender
{
    config           : BatchConfig,
    buffer           : Vec<serde_json::Value>,
    bytes            : usize,
    first_buffered_at: Option<Instant>,
    destroyed        : bool,
}

impl BatchSender
{
    /// Make a new, empty sender.
    pub fn new(config: BatchConfig) -> Self
    {
        Self{ config, buffer: Vec::new(), bytes: 0, first_buffered_at: None, destroyed: false }
    }

    /// Current configuration.
    pub fn config(&self) -> &BatchConfig
    {
        &self.config
    }

    /// Buffer `message`. Returns `true` if the size or byte trigger now requires an immediate flush.
    pub fn add(&mut self, message: serde_json::Value) -> bool
    {
        if self.destroyed
        {
            tracing::warn!("add() called on a destroyed BatchSender; ignoring");
            return false;
        }

        if self.first_buffered_at.is_none()
        {
            self.first_buffered_at = Some(Instant::now());
        }
        self.bytes += MessageQueue::estimate_size(&message);
        self.buffer.push(message);

        self.buffer.len() >= self.config.max_size || self.bytes >= self.config.max_bytes
    }

    /// Number of messages currently buffered.
    pub fn len(&self) -> usize
    {
        self.buffer.len()
    }

    /// Whether the buffer is empty.
    pub fn is_empty(&self) -> bool
    {
        self.buffer.is_empty()
    }

    /// The instant at which the time trigger will fire, if any message is buffered.
    pub fn deadline(&self) -> Option<Instant>
    {
        self.first_buffered_at.map(|t| t + self.config.max_wait)
    }

    /// Whether the time trigger has elapsed for the oldest buffered message.
    pub fn is_wait_expired(&self) -> bool
    {
        self.deadline().is_some_and(|d| Instant::now() >= d)
    }

    /// Drain and dispatch the buffer via `send_fn`. Idempotent: a no-op when nothing is buffered.
    pub fn flush(&mut self, send_fn: impl FnOnce(Vec<serde_json::Value>))
    {
        if self.buffer.is_empty() { return; }
        let drained = std::mem::take(&mut self.buffer);
        self.bytes = 0;
        self.first_buffered_at = None;
        send_fn(drained);
    }

    /// Flush any remaining buffer, then mark the sender destroyed; further `add` calls are ignored.
    pub fn destroy(&mut self, send_fn: impl FnOnce(Vec<serde_json::Value>))
    {
        self.flush(send_fn);
        self.destroyed = true;
    }
}

//-------------------------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn max_size_one_flushes_every_add()
    {
        let mut sender = BatchSender::new(BatchConfig{ max_size: 1, ..BatchConfig::default() });
        assert!(sender.add(serde_json::json!({ "v": 1 })));
    }

    #[test]
    fn below_triggers_does_not_request_flush()
    {
        let mut sender = BatchSender::new(BatchConfig::default());
        assert!(!sender.add(serde_json::json!({ "v": 1 })));
        assert_eq!(sender.len(), 1);
    }

    #[test]
    fn flush_is_idempotent_when_empty()
    {
        let mut sender = BatchSender::new(BatchConfig::default());
        let mut calls = 0;
        sender.flush(|_| calls += 1);
        assert_eq!(calls, 0);
    }

    #[test]
    fn flush_drains_buffer_in_order()
    {
        let mut sender = BatchSender::new(BatchConfig::default());
        sender.add(serde_json::json!(1));
        sender.add(serde_json::json!(2));

        let mut seen = Vec::new();
        sender.flush(|batch| seen = batch);
        assert_eq!(seen, vec![serde_json::json!(1), serde_json::json!(2)]);
        assert!(sender.is_empty());
    }

    #[test]
    fn destroy_flushes_then_ignores_further_adds()
    {
        let mut sender = BatchSender::new(BatchConfig::default());
        sender.add(serde_json::json!(1));

        let mut flushed = Vec::new();
        sender.destroy(|batch| flushed = batch);
        assert_eq!(flushed, vec![serde_json::json!(1)]);

        assert!(!sender.add(serde_json::json!(2)));
        assert!(sender.is_empty());
    }

    #[test]
    fn byte_trigger_fires_before_size_trigger()
    {
        let small = serde_json::json!({ "x": 1 });
        let size = MessageQueue::estimate_size(&small);
        let mut sender = BatchSender::new(BatchConfig{ max_size: 100, max_bytes: size, ..BatchConfig::default() });
        assert!(sender.add(small));
    }
}

//-------------------------------------------------------------------------------------------------------------------
