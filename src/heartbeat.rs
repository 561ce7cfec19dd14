//local shortcuts

//third-party shortcuts
use serde_json::Value;

//standard shortcuts
use std::collections::VecDeque;
use std::time::{Duration, Instant};

//-------------------------------------------------------------------------------------------------------------------

/// Maximum number of round-trip samples retained by a [`HeartbeatController`]'s latency ring.
pub const MAX_LATENCY_SAMPLES: usize = 64;

//-------------------------------------------------------------------------------------------------------------------

/// Config for the [`HeartbeatController`].
#[derive(Debug, Clone)]
pub struct HeartbeatConfig
{
    /// Whether heartbeat probing is active. Defaults to `true`.
    pub enabled: bool,
    /// Interval between probes. Defaults to 15 seconds.
    pub interval: Duration,
    /// How long to wait for a pong before declaring a timeout. Defaults to 5 seconds.
    pub timeout: Duration,
    /// The probe payload sent on each heartbeat. Defaults to `{"type":"ping"}`.
    pub message: Value,
    /// The `type` field value that identifies a pong reply. Defaults to `"pong"`.
    pub pong_type: String,
}

impl Default for HeartbeatConfig
{
    fn default() -> Self
    {
        Self{
            enabled   : true,
            interval  : Duration::from_secs(15),
            timeout   : Duration::from_secs(5),
            message   : serde_json::json!({ "type": "ping" }),
            pong_type : "pong".to_string(),
        }
    }
}

//-------------------------------------------------------------------------------------------------------------------

/// A single measured round trip.
#[derive(Debug, Clone, Copy)]
pub struct LatencySample
{
    pub rtt: Duration,
}

//-------------------------------------------------------------------------------------------------------------------

/// Bounded ring of recent round-trip samples with a derived mean, per the base spec's `HeartbeatStats`.
#[derive(Debug, Default)]
pub struct HeartbeatStats
{
    samples: VecDeque<LatencySample>,
}

impl HeartbeatStats
{
    fn push(&mut self, sample: LatencySample)
    {
        if self.samples.len() >= MAX_LATENCY_SAMPLES
        {
            self.samples.pop_front();
        }
        self.samples.push_back(sample);
    }

    /// Number of retained samples.
    pub fn len(&self) -> usize
    {
        self.samples.len()
    }

    /// Whether any samples have been recorded.
    pub fn is_empty(&self) -> bool
    {
        self.samples.is_empty()
    }

    /// Mean round-trip time across retained samples, or `None` if empty.
    pub fn mean(&self) -> Option<Duration>
    {
        if self.samples.is_empty() { return None; }
        let total: Duration = self.samples.iter().map(|s| s.rtt).sum();
        Some(total / self.samples.len() as u32)
    }
}

//-------------------------------------------------------------------------------------------------------------------

/// Tracks the outcome of one probe cycle.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ProbeOutcome
{
    /// A pong has not yet been seen for the in-flight probe.
    Pending,
    /// A matching pong arrived; the timer is cleared.
    Ponged,
    /// The pong timeout fired with no reply.
    TimedOut,
}

//-------------------------------------------------------------------------------------------------------------------

/// Periodic liveness probe with round-trip measurement.
///
/// One probe is ever in flight: `probe()` must not be called again until the in-flight probe resolves via
/// `on_pong()` or `on_timeout()`. The facade task enforces this by only scheduling the next probe after the
/// current one resolves.
#[derive(Debug)]
pub struct HeartbeatController
{
    config        : HeartbeatConfig,
    stats         : HeartbeatStats,
    in_flight_at  : Option<Instant>,
    outcome       : ProbeOutcome,
}

impl HeartbeatController
{
    /// Make a new controller from `config`.
    pub fn new(config: HeartbeatConfig) -> Self
    {
        Self{ config, stats: HeartbeatStats::default(), in_flight_at: None, outcome: ProbeOutcome::Ponged }
    }

    /// Current configuration.
    pub fn config(&self) -> &HeartbeatConfig
    {
        &self.config
    }

    /// Replace the configuration. Per the base spec, a config update suspends the controller; callers must call
    /// `restart()` (i.e. stop probing, then `begin_probe()` again) to resume.
    pub fn set_config(&mut self, config: HeartbeatConfig)
    {
        self.config = config;
        self.in_flight_at = None;
    }

    /// Retained round-trip statistics.
    pub fn stats(&self) -> &HeartbeatStats
    {
        &self.stats
    }

    /// Whether a probe is currently awaiting a pong.
    pub fn is_probe_in_flight(&self) -> bool
    {
        self.in_flight_at.is_some()
    }

    /// Begin a new probe: records the send timestamp and arms the pong-timeout window.
    ///
    /// Returns the configured probe payload to dispatch via the normal send path. Panics if a probe is already in
    /// flight, since at most one probe may be in flight at a time (base spec §5 ordering guarantee (e)).
    pub fn begin_probe(&mut self) -> Value
    {
        assert!(!self.is_probe_in_flight(), "heartbeat probe already in flight");
        self.in_flight_at = Some(Instant::now());
        self.outcome = ProbeOutcome::Pending;
        self.config.message.clone()
    }

    /// Whether an inbound message is a pong reply, per the configured `pong_type`.
    pub fn is_pong(&self, message: &Value) -> bool
    {
        message.get("type").and_then(Value::as_str) == Some(self.config.pong_type.as_str())
    }

    /// Process a pong: clears the in-flight timer and records a latency sample.
    ///
    /// Returns `None` if no probe was in flight (a stray or duplicate pong).
    pub fn on_pong(&mut self) -> Option<LatencySample>
    {
        let sent_at = self.in_flight_at.take()?;
        self.outcome = ProbeOutcome::Ponged;
        let sample = LatencySample{ rtt: sent_at.elapsed() };
        self.stats.push(sample);
        Some(sample)
    }

    /// Process a pong-timeout firing for the in-flight probe. No-op (returns `false`) if the probe already
    /// resolved (the timer fired after a late cancel).
    pub fn on_timeout(&mut self) -> bool
    {
        if self.in_flight_at.take().is_none() { return false; }
        self.outcome = ProbeOutcome::TimedOut;
        true
    }
}

//-------------------------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn pong_clears_in_flight_and_records_sample()
    {
        let mut hb = HeartbeatController::new(HeartbeatConfig::default());
        hb.begin_probe();
        assert!(hb.is_probe_in_flight());
        let sample = hb.on_pong().unwrap();
        assert!(!hb.is_probe_in_flight());
        assert!(sample.rtt < Duration::from_secs(1));
        assert_eq!(hb.stats().len(), 1);
    }

    #[test]
    fn timeout_with_no_probe_in_flight_is_noop()
    {
        let mut hb = HeartbeatController::new(HeartbeatConfig::default());
        assert!(!hb.on_timeout());
    }

    #[test]
    fn latency_ring_is_bounded()
    {
        let mut hb = HeartbeatController::new(HeartbeatConfig::default());
        for _ in 0..(MAX_LATENCY_SAMPLES + 10)
        {
            hb.begin_probe();
            hb.on_pong();
        }
        assert!(hb.stats().len() <= MAX_LATENCY_SAMPLES);
    }

    #[test]
    fn pong_identified_by_configured_type()
    {
        let hb = HeartbeatController::new(HeartbeatConfig{ pong_type: "P".to_string(), ..HeartbeatConfig::default() });
        assert!(hb.is_pong(&serde_json::json!({ "type": "P" })));
        assert!(!hb.is_pong(&serde_json::json!({ "type": "p" })));
    }

    #[test]
    #[should_panic(expected = "already in flight")]
    fn double_probe_panics()
    {
        let mut hb = HeartbeatController::new(HeartbeatConfig::default());
        hb.begin_probe();
        hb.begin_probe();
    }
}

//-------------------------------------------------------------------------------------------------------------------
