//! Reconnect policy: capped exponential backoff with jitter.
//!
//! The reference behavior here replaces a fixed unconditional 3-second
//! reconnect delay. Delays grow as `initial_delay * multiplier^(attempt-1)`,
//! capped at `max_delay`, with ±20% jitter so a rack of units that lost
//! power together does not reconnect in lockstep.

use std::time::Duration;

use rand::Rng;
use serde::Deserialize;

/// Configuration for per-channel reconnect behavior.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    /// Delay before the first reconnect attempt.
    #[serde(with = "humantime_serde")]
    pub initial_delay: Duration,
    /// Ceiling on the delay between attempts.
    #[serde(with = "humantime_serde")]
    pub max_delay: Duration,
    /// Backoff multiplier (2.0 doubles the delay each attempt).
    pub backoff_multiplier: f64,
    /// Maximum number of reconnect attempts before the channel parks
    /// until the next roster refresh. 0 means retry forever.
    pub max_attempts: u32,
    /// Whether to apply ±20% jitter to delays.
    pub jitter: bool,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            max_attempts: 10,
            jitter: true,
        }
    }
}

impl ReconnectConfig {
    /// Calculate the delay before a given attempt number (1-based).
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let base = self.initial_delay.as_secs_f64()
            * self
                .backoff_multiplier
                .powi(attempt.saturating_sub(1) as i32);
        let capped = base.min(self.max_delay.as_secs_f64());

        let delay = if self.jitter {
            capped * rand::thread_rng().gen_range(0.8..=1.2)
        } else {
            capped
        };

        Duration::from_secs_f64(delay)
    }

    /// Whether the given attempt number (1-based) should be made at all.
    #[must_use]
    pub fn should_retry(&self, attempt: u32) -> bool {
        self.max_attempts == 0 || attempt <= self.max_attempts
    }
}
