//local shortcuts

//third-party shortcuts
use rand::Rng;

//standard shortcuts
use std::time::Duration;

//-------------------------------------------------------------------------------------------------------------------

/// Config for the [`ReconnectController`].
#[derive(Debug, Clone)]
pub struct ReconnectConfig
{
    /// Whether the controller schedules any reconnect attempts at all. Defaults to `true`.
    pub enabled: bool,
    /// Base delay for the first attempt. Defaults to 1 second.
    pub delay: Duration,
    /// Ceiling on the computed delay before jitter is applied. Defaults to 30 seconds.
    pub max_delay: Duration,
    /// Maximum number of attempts before giving up; `0` means unbounded. Defaults to `0`.
    pub max_attempts: u32,
    /// Multiplicative backoff factor applied per attempt. Defaults to `2.0`.
    pub factor: f64,
    /// Jitter fraction of the capped delay, applied as `±(cappedDelay * jitter)`. Defaults to `0.2`.
    pub jitter: f64,
}

impl Default for ReconnectConfig
{
    fn default() -> Self
    {
        Self{
            enabled      : true,
            delay        : Duration::from_secs(1),
            max_delay    : Duration::from_secs(30),
            max_attempts : 0,
            factor       : 2.0,
            jitter       : 0.2,
        }
    }
}

//-------------------------------------------------------------------------------------------------------------------

/// Computes exponential-backoff-with-jitter delays and tracks the current attempt count.
///
/// The controller never touches the adapter or the facade directly; it only answers "what's the next delay" and
/// "have we exhausted our attempts". Driving the actual reconnect (re-entering the facade's connect path so every
/// subsystem re-initializes) is the facade task's job.
#[derive(Debug)]
pub struct ReconnectController
{
    config  : ReconnectConfig,
    attempt : u32,
}

impl ReconnectController
{
    /// Make a new controller from `config`.
    pub fn new(config: ReconnectConfig) -> Self
    {
        Self{ config, attempt: 0 }
    }

    /// Replace the configuration. Takes effect on the next computed delay.
    pub fn set_config(&mut self, config: ReconnectConfig)
    {
        self.config = config;
    }

    /// Read the current configuration.
    pub fn config(&self) -> &ReconnectConfig
    {
        &self.config
    }

    /// Whether reconnect is enabled at all.
    pub fn enabled(&self) -> bool
    {
        self.config.enabled
    }

    /// Current (zero-indexed) attempt count.
    pub fn attempt(&self) -> u32
    {
        self.attempt
    }

    /// Whether attempts remain, given `max_attempts` (`0` = unbounded).
    pub fn attempts_remaining(&self) -> bool
    {
        self.config.max_attempts == 0 || self.attempt < self.config.max_attempts
    }

    /// Compute the delay for the *current* attempt, then increment the attempt counter.
    ///
    /// `min(maxDelay, baseDelay * factor^n) + jitter`, where jitter is uniform in `[-j, +j]` and
    /// `j = cappedDelay * jitterFraction`, clamped to non-negative. The result never exceeds
    /// `maxDelay * (1 + jitterFraction)`.
    pub fn next_delay(&mut self) -> Duration
    {
        let n = self.attempt as i32;
        let base_ms = self.config.delay.as_secs_f64() * 1000.0;
        let max_ms = self.config.max_delay.as_secs_f64() * 1000.0;
        let raw_ms = base_ms * self.config.factor.powi(n);
        let capped_ms = raw_ms.min(max_ms);

        let j = capped_ms * self.config.jitter;
        let jitter_ms = if j > 0.0 { rand::thread_rng().gen_range(-j..=j) } else { 0.0 };
        let delay_ms = (capped_ms + jitter_ms).max(0.0);

        self.attempt += 1;
        Duration::from_secs_f64(delay_ms / 1000.0)
    }

    /// Record a failed attempt (the attempt counter was already incremented by `next_delay`; this exists for
    /// callers that fail without having computed a delay via `next_delay`, e.g. an immediate synchronous refusal).
    pub fn record_failure(&mut self)
    {
        self.attempt += 1;
    }

    /// Reset the attempt counter to zero (called on a successful reconnect).
    pub fn reset(&mut self)
    {
        self.attempt = 0;
    }
}

//-------------------------------------------------------------------------------------------------------------------

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn first_attempt_uses_base_delay_without_jitter()
    {
        let mut c = ReconnectController::new(ReconnectConfig{
            delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            factor: 2.0,
            jitter: 0.0,
            max_attempts: 0,
            enabled: true,
        });
        assert_eq!(c.next_delay(), Duration::from_millis(100));
    }

    #[test]
    fn delays_follow_exponential_growth_until_saturation()
    {
        let mut c = ReconnectController::new(ReconnectConfig{
            delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(1000),
            factor: 2.0,
            jitter: 0.0,
            max_attempts: 5,
            enabled: true,
        });
        let delays: Vec<_> = (0..5).map(|_| c.next_delay()).collect();
        assert_eq!(delays, vec![
            Duration::from_millis(100),
            Duration::from_millis(200),
            Duration::from_millis(400),
            Duration::from_millis(800),
            Duration::from_millis(1000),
        ]);
        assert!(!c.attempts_remaining());
    }

    #[test]
    fn jitter_stays_within_bound()
    {
        let mut c = ReconnectController::new(ReconnectConfig{
            delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(1000),
            factor: 2.0,
            jitter: 0.3,
            max_attempts: 0,
            enabled: true,
        });
        for _ in 0..50
        {
            let d = c.next_delay();
            assert!(d.as_secs_f64() * 1000.0 <= 1000.0 * 1.3 + 1e-6);
        }
    }

    #[test]
    fn unbounded_attempts_never_run_out()
    {
        let mut c = ReconnectController::new(ReconnectConfig{ max_attempts: 0, ..ReconnectConfig::default() });
        for _ in 0..1000
        {
            c.next_delay();
            assert!(c.attempts_remaining());
        }
    }

    #[test]
    fn cancel_does_not_reset_attempt_count()
    {
        // "cancel" at this layer is just "don't call next_delay anymore"; the attempt counter only resets via
        // `reset()`, matching the base spec's "Cancel aborts any pending timer but does not reset the counter".
        let mut c = ReconnectController::new(ReconnectConfig::default());
        c.next_delay();
        c.next_delay();
        assert_eq!(c.attempt(), 2);
        c.reset();
        assert_eq!(c.attempt(), 0);
    }
}

//-------------------------------------------------------------------------------------------------------------------
