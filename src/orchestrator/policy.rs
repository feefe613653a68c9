//! Polling schedule.

use crate::config::PollingSettings;
use std::time::Duration;

/// Bounded polling with an optional multiplicative backoff.
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    /// Delay before the second poll.
    pub interval: Duration,
    /// Maximum number of `poll_once` calls in one cycle.
    pub max_attempts: u32,
    /// Growth factor applied per attempt; `1.0` keeps the interval fixed.
    pub backoff_factor: f64,
    /// Ceiling for the grown delay.
    pub max_interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(2),
            max_attempts: 60,
            backoff_factor: 1.0,
            max_interval: Duration::from_secs(10),
        }
    }
}

impl PollPolicy {
    /// Delay after the given 1-based attempt.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        if self.backoff_factor <= 1.0 {
            return self.interval;
        }

        let exponent = attempt.saturating_sub(1).min(32) as i32;
        let grown = self.interval.as_secs_f64() * self.backoff_factor.powi(exponent);
        let ceiling = self.max_interval.max(self.interval);
        Duration::from_secs_f64(grown.min(ceiling.as_secs_f64()))
    }
}

impl From<&PollingSettings> for PollPolicy {
    fn from(settings: &PollingSettings) -> Self {
        Self {
            interval: Duration::from_millis(settings.interval_ms),
            max_attempts: settings.max_attempts.max(1),
            backoff_factor: settings.backoff_factor,
            max_interval: Duration::from_millis(settings.max_interval_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_interval() {
        let policy = PollPolicy::default();
        assert_eq!(policy.delay_after(1), Duration::from_secs(2));
        assert_eq!(policy.delay_after(59), Duration::from_secs(2));
    }

    #[test]
    fn test_backoff_is_capped() {
        let policy = PollPolicy {
            backoff_factor: 2.0,
            ..PollPolicy::default()
        };
        assert_eq!(policy.delay_after(1), Duration::from_secs(2));
        assert_eq!(policy.delay_after(2), Duration::from_secs(4));
        assert_eq!(policy.delay_after(3), Duration::from_secs(8));
        assert_eq!(policy.delay_after(4), Duration::from_secs(10));
        assert_eq!(policy.delay_after(40), Duration::from_secs(10));
    }
}
