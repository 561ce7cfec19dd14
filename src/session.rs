//local shortcuts

//third-party shortcuts

//standard shortcuts
use std::time::{Duration, SystemTime};

//-------------------------------------------------------------------------------------------------------------------

/// The conceptual lifespan of a client from a successful open to its terminal close.
///
/// Counters are preserved across reconnects within the same logical client lifetime; a new `Session` is only
/// created when the facade opens a socket after a *full* disconnect-to-destroy cycle never happens mid-lifetime
/// (the facade keeps exactly one `Session` alive for its own lifetime and resets its reconnect-scoped fields on
/// each successful connect).
#[derive(Debug, Clone)]
pub struct Session
{
    pub start_time          : SystemTime,
    pub messages_sent       : u64,
    pub messages_received   : u64,
    pub reconnects          : u32,
    pub current_attempt     : u32,
    pub last_heartbeat      : Option<SystemTime>,
    pub queue_depth         : usize,
    avg_latency_ms          : f64,
    latency_sample_count    : u64,
}

impl Session
{
    /// Start a fresh session.
    pub fn new() -> Self
    {
        Self{
            start_time           : SystemTime::now(),
            messages_sent        : 0,
            messages_received    : 0,
            reconnects           : 0,
            current_attempt      : 0,
            last_heartbeat       : None,
            queue_depth          : 0,
            avg_latency_ms       : 0.0,
            latency_sample_count : 0,
        }
    }

    /// Record a successfully sent message.
    pub fn record_sent(&mut self)
    {
        self.messages_sent += 1;
    }

    /// Record a received message.
    pub fn record_received(&mut self)
    {
        self.messages_received += 1;
    }

    /// Record a reconnect having completed; resets the in-progress attempt counter.
    pub fn record_reconnected(&mut self)
    {
        self.reconnects += 1;
        self.current_attempt = 0;
    }

    /// Record a latency sample into the running moving average.
    pub fn record_latency(&mut self, sample: Duration)
    {
        self.latency_sample_count += 1;
        let sample_ms = sample.as_secs_f64() * 1000.0;
        // simple incremental mean, avoids keeping every sample just to report an average
        self.avg_latency_ms += (sample_ms - self.avg_latency_ms) / self.latency_sample_count as f64;
    }

    /// Current moving-average latency in milliseconds.
    pub fn avg_latency_ms(&self) -> f64
    {
        self.avg_latency_ms
    }

    /// Mark a heartbeat as received now.
    pub fn record_heartbeat(&mut self)
    {
        self.last_heartbeat = Some(SystemTime::now());
    }
}

impl Default for Session
{
    fn default() -> Self
    {
        Self::new()
    }
}

//-------------------------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn moving_average_tracks_samples()
    {
        let mut s = Session::new();
        s.record_latency(Duration::from_millis(100));
        s.record_latency(Duration::from_millis(200));
        assert!((s.avg_latency_ms() - 150.0).abs() < 1e-6);
    }

    #[test]
    fn reconnect_resets_attempt_counter()
    {
        let mut s = Session::new();
        s.current_attempt = 3;
        s.record_reconnected();
        assert_eq!(s.current_attempt, 0);
        assert_eq!(s.reconnects, 1);
    }
}

//-------------------------------------------------------------------------------------------------------------------
