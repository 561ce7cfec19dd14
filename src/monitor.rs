//local shortcuts
use crate::*;

//third-party shortcuts

//standard shortcuts
use std::collections::VecDeque;
use std::time::{Duration, Instant};

//-------------------------------------------------------------------------------------------------------------------

/// Config for the [`PerformanceMonitor`].
#[derive(Debug, Clone, Copy)]
pub struct MonitorConfig
{
    /// Window over which send/receive rates are computed. Defaults to 60 seconds.
    pub window_size: Duration,
    /// Maximum latency samples retained (most recent kept). Defaults to 1000.
    pub max_latency_samples: usize,
    /// Maximum error messages retained in the ring. Defaults to 50.
    pub max_error_samples: usize,
}

impl Default for MonitorConfig
{
    fn default() -> Self
    {
        Self{ window_size: Duration::from_secs(60), max_latency_samples: 1000, max_error_samples: 50 }
    }
}

//-------------------------------------------------------------------------------------------------------------------

/// A latency summary over retained samples.
#[derive(Debug, Clone, Copy, Default)]
pub struct LatencySnapshot
{
    pub current : Option<Duration>,
    pub avg     : Option<Duration>,
    pub min     : Option<Duration>,
    pub max     : Option<Duration>,
    pub p95     : Option<Duration>,
    pub p99     : Option<Duration>,
}

//-------------------------------------------------------------------------------------------------------------------

/// A full metrics snapshot, as returned by [`PerformanceMonitor::report`] and rendered by
/// [`PerformanceMonitor::generate_report`].
#[derive(Debug, Clone, Copy)]
pub struct MetricsReport
{
    pub total_sent      : u64,
    pub total_received  : u64,
    pub total_errors    : u64,
    pub reconnect_count : u32,
    pub sent_rate       : f64,
    pub received_rate   : f64,
    pub error_rate      : f64,
    pub latency         : LatencySnapshot,
    pub queue_size      : usize,
    pub queue_capacity  : usize,
    pub quality_score   : u8,
}

//-------------------------------------------------------------------------------------------------------------------

/// Throughput, latency percentiles, and a blended quality score.
///
/// Send/receive timestamps are kept in bounded, window-pruned deques so rates reflect only recent activity; latency
/// samples and error messages are kept in fixed-capacity rings (oldest evicted first) independent of the time
/// window, matching the base spec's "bounded windowed arrays" / "bounded array" / "bounded ring" distinction.
#[derive(Debug)]
pub struct PerformanceMonitor
{
    config             : MonitorConfig,
    sent_timestamps    : VecDeque<Instant>,
    received_timestamps: VecDeque<Instant>,
    latencies          : VecDeque<Duration>,
    errors             : VecDeque<String>,
    total_sent         : u64,
    total_received     : u64,
    total_errors       : u64,
    reconnect_count    : u32,
    queue_size         : usize,
    queue_capacity     : usize,
}

impl PerformanceMonitor
{
    /// Make a new monitor from `config`.
    pub fn new(config: MonitorConfig) -> Self
    {
        Self{
            config,
            sent_timestamps    : VecDeque::new(),
            received_timestamps: VecDeque::new(),
            latencies          : VecDeque::new(),
            errors             : VecDeque::new(),
            total_sent         : 0,
            total_received     : 0,
            total_errors       : 0,
            reconnect_count    : 0,
            queue_size         : 0,
            queue_capacity     : 1,
        }
    }

    /// Record one outbound message.
    pub fn record_sent(&mut self)
    {
        self.total_sent += 1;
        self.sent_timestamps.push_back(Instant::now());
        self.prune_window();
    }

    /// Record one inbound message.
    pub fn record_received(&mut self)
    {
        self.total_received += 1;
        self.received_timestamps.push_back(Instant::now());
        self.prune_window();
    }

    /// Record one round-trip latency sample (e.g. from a heartbeat pong or an ACK round trip).
    pub fn record_latency(&mut self, sample: Duration)
    {
        if self.latencies.len() >= self.config.max_latency_samples
        {
            self.latencies.pop_front();
        }
        self.latencies.push_back(sample);
    }

    /// Record one error observation.
    pub fn record_error(&mut self, message: impl Into<String>)
    {
        self.total_errors += 1;
        if self.errors.len() >= self.config.max_error_samples
        {
            self.errors.pop_front();
        }
        self.errors.push_back(message.into());
    }

    /// Record one reconnect cycle having occurred.
    pub fn record_reconnect(&mut self)
    {
        self.reconnect_count += 1;
    }

    /// Update the current queue occupancy used by the quality score's queue-usage deduction.
    pub fn set_queue_usage(&mut self, size: usize, capacity: usize)
    {
        self.queue_size = size;
        self.queue_capacity = capacity.max(1);
    }

    fn prune_window(&mut self)
    {
        let cutoff = Instant::now().checked_sub(self.config.window_size).unwrap_or_else(Instant::now);
        while self.sent_timestamps.front().is_some_and(|t| *t < cutoff)
        {
            self.sent_timestamps.pop_front();
        }
        while self.received_timestamps.front().is_some_and(|t| *t < cutoff)
        {
            self.received_timestamps.pop_front();
        }
    }

    /// Outbound messages per second, computed over the configured window.
    pub fn sent_rate(&mut self) -> f64
    {
        self.prune_window();
        self.sent_timestamps.len() as f64 / self.config.window_size.as_secs_f64()
    }

    /// Inbound messages per second, computed over the configured window.
    pub fn received_rate(&mut self) -> f64
    {
        self.prune_window();
        self.received_timestamps.len() as f64 / self.config.window_size.as_secs_f64()
    }

    /// Errors divided by total traffic (sent + received), `0.0` when there has been no traffic.
    pub fn error_rate(&self) -> f64
    {
        let traffic = self.total_sent + self.total_received;
        if traffic == 0 { return 0.0; }
        self.total_errors as f64 / traffic as f64
    }

    /// Latency summary over retained samples.
    pub fn latency_snapshot(&self) -> LatencySnapshot
    {
        if self.latencies.is_empty() { return LatencySnapshot::default(); }

        let mut sorted: Vec<Duration> = self.latencies.iter().copied().collect();
        sorted.sort();

        let sum: Duration = sorted.iter().sum();
        let avg = sum / sorted.len() as u32;

        LatencySnapshot{
            current : self.latencies.back().copied(),
            avg     : Some(avg),
            min     : sorted.first().copied(),
            max     : sorted.last().copied(),
            p95     : Some(percentile(&sorted, 0.95)),
            p99     : Some(percentile(&sorted, 0.99)),
        }
    }

    /// A 0–100 health score blending average latency, error rate, reconnect count, and queue usage. Starts at 100
    /// and deducts by thresholded bands per factor; never goes below 0.
    pub fn quality_score(&self) -> u8
    {
        let mut score: i32 = 100;

        if let Some(avg) = self.latency_snapshot().avg
        {
            score -= match avg.as_millis()
            {
                ms if ms > 1000 => 30,
                ms if ms > 500  => 15,
                ms if ms > 200  => 5,
                _ => 0,
            };
        }

        score -= match self.error_rate()
        {
            r if r > 0.10 => 30,
            r if r > 0.05 => 15,
            r if r > 0.01 => 5,
            _ => 0,
        };

        score -= match self.reconnect_count
        {
            n if n > 10 => 20,
            n if n > 5  => 10,
            n if n > 0  => 5,
            _ => 0,
        };

        let queue_usage = self.queue_size as f64 / self.queue_capacity as f64;
        score -= match queue_usage
        {
            u if u > 0.9 => 20,
            u if u > 0.7 => 10,
            u if u > 0.5 => 5,
            _ => 0,
        };

        score.clamp(0, 100) as u8
    }

    /// A full metrics snapshot.
    pub fn report(&mut self) -> MetricsReport
    {
        MetricsReport{
            total_sent      : self.total_sent,
            total_received  : self.total_received,
            total_errors    : self.total_errors,
            reconnect_count : self.reconnect_count,
            sent_rate       : self.sent_rate(),
            received_rate   : self.received_rate(),
            error_rate      : self.error_rate(),
            latency         : self.latency_snapshot(),
            queue_size      : self.queue_size,
            queue_capacity  : self.queue_capacity,
            quality_score   : self.quality_score(),
        }
    }

    /// Render a human-readable multi-line summary, matching the base spec's `generateReport`.
    pub fn generate_report(&mut self) -> String
    {
        let r = self.report();
        format!(
            "Runtime Performance Report\n\
             --------------------------\n\
             Quality score : {}/100\n\
             Sent          : {} total, {:.2}/s\n\
             Received      : {} total, {:.2}/s\n\
             Errors        : {} total, {:.2}% rate\n\
             Latency       : avg={:?} p95={:?} p99={:?}\n\
             Reconnects    : {}\n\
             Queue         : {}/{}",
            r.quality_score,
            r.total_sent, r.sent_rate,
            r.total_received, r.received_rate,
            r.total_errors, r.error_rate * 100.0,
            r.latency.avg, r.latency.p95, r.latency.p99,
            r.reconnect_count,
            r.queue_size, r.queue_capacity,
        )
    }
}

fn percentile(sorted: &[Duration], p: f64) -> Duration
{
    if sorted.is_empty() { return Duration::ZERO; }
    let idx = ((sorted.len() - 1) as f64 * p).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

//-------------------------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn empty_monitor_has_perfect_score_and_empty_latency()
    {
        let monitor = PerformanceMonitor::new(MonitorConfig::default());
        assert_eq!(monitor.quality_score(), 100);
        assert!(monitor.latency_snapshot().avg.is_none());
    }

    #[test]
    fn latency_samples_are_bounded()
    {
        let mut monitor = PerformanceMonitor::new(MonitorConfig{ max_latency_samples: 5, ..MonitorConfig::default() });
        for i in 0..20
        {
            monitor.record_latency(Duration::from_millis(i));
        }
        assert_eq!(monitor.latencies.len(), 5);
    }

    #[test]
    fn p95_and_p99_are_at_or_above_the_median_for_increasing_samples()
    {
        let mut monitor = PerformanceMonitor::new(MonitorConfig::default());
        for i in 1..=100
        {
            monitor.record_latency(Duration::from_millis(i));
        }
        let snap = monitor.latency_snapshot();
        assert!(snap.p95.unwrap() >= snap.avg.unwrap());
        assert!(snap.p99.unwrap() >= snap.p95.unwrap());
    }

    #[test]
    fn error_rate_is_zero_with_no_traffic()
    {
        let monitor = PerformanceMonitor::new(MonitorConfig::default());
        assert_eq!(monitor.error_rate(), 0.0);
    }

    #[test]
    fn error_rate_reflects_errors_over_traffic()
    {
        let mut monitor = PerformanceMonitor::new(MonitorConfig::default());
        monitor.record_sent();
        monitor.record_sent();
        monitor.record_error("boom");
        assert!((monitor.error_rate() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn heavy_reconnects_and_high_latency_depress_quality_score()
    {
        let mut monitor = PerformanceMonitor::new(MonitorConfig::default());
        for _ in 0..20
        {
            monitor.record_reconnect();
        }
        monitor.record_latency(Duration::from_millis(2000));
        assert!(monitor.quality_score() < 100);
        assert!(monitor.quality_score() <= 50);
    }

    #[test]
    fn generate_report_contains_quality_score_line()
    {
        let mut monitor = PerformanceMonitor::new(MonitorConfig::default());
        let report = monitor.generate_report();
        assert!(report.contains("Quality score"));
    }
}

//-------------------------------------------------------------------------------------------------------------------
