//! Backoff policy for pacing poll-loop restarts.
//!
//! [`BackoffPolicy`] controls how long a slot waits after a failed poll
//! before its consumer is rebuilt. The delay for failure `n` within one
//! loop's lifetime is `first × factor^n`, clamped to `max`, with jitter
//! applied on top. The base delay is derived purely from the failure count,
//! so jitter output never feeds back into later calculations.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use fetchpool::{BackoffPolicy, JitterPolicy};
//!
//! let backoff = BackoffPolicy {
//!     first: Duration::from_millis(100),
//!     max: Duration::from_secs(10),
//!     factor: 2.0,
//!     jitter: JitterPolicy::None,
//! };
//!
//! assert_eq!(backoff.next(0), Duration::from_millis(100));
//! assert_eq!(backoff.next(1), Duration::from_millis(200));
//! // 100ms × 2^10 overflows the cap and clamps to max.
//! assert_eq!(backoff.next(10), Duration::from_secs(10));
//! ```

use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// Restart backoff policy.
#[derive(Clone, Copy, Debug)]
pub struct BackoffPolicy {
    /// Delay after the first failure.
    pub first: Duration,
    /// Maximum delay cap.
    pub max: Duration,
    /// Multiplicative growth factor (`>= 1.0` recommended).
    pub factor: f64,
    /// Jitter applied to the clamped base delay.
    pub jitter: JitterPolicy,
}

impl Default for BackoffPolicy {
    /// Constant 100ms delay capped at 30s, no jitter.
    fn default() -> Self {
        Self {
            first: Duration::from_millis(100),
            max: Duration::from_secs(30),
            factor: 1.0,
            jitter: JitterPolicy::None,
        }
    }
}

impl BackoffPolicy {
    /// Computes the delay for the given failure count (0-indexed).
    ///
    /// The base is `first × factor^failures`, clamped to [`BackoffPolicy::max`];
    /// non-finite or negative intermediate values also clamp to `max`.
    pub fn next(&self, failures: u32) -> Duration {
        let base = self.base_delay(failures);
        match self.jitter {
            JitterPolicy::Decorrelated => {
                self.jitter
                    .apply_decorrelated(self.first.min(self.max), base, self.max)
            }
            _ => self.jitter.apply(base),
        }
    }

    fn base_delay(&self, failures: u32) -> Duration {
        let exponent = failures.min(i32::MAX as u32) as i32;
        let scaled = self.first.as_secs_f64() * self.factor.powi(exponent);
        if scaled.is_finite() && (0.0..=self.max.as_secs_f64()).contains(&scaled) {
            Duration::from_secs_f64(scaled)
        } else {
            self.max
        }
    }
}
