//! Jitter for restart delays.
//!
//! With several consumer slots failing against the same unavailable broker,
//! un-jittered backoff restarts them in lockstep. [`JitterPolicy`] spreads
//! the restart moments:
//!
//! - [`JitterPolicy::None`] — exact backoff delay
//! - [`JitterPolicy::Full`] — random delay in `[0, delay]`
//! - [`JitterPolicy::Equal`] — `delay/2 + random[0, delay/2]`
//! - [`JitterPolicy::Decorrelated`] — grows from the previous delay, capped

use rand::Rng;
use std::time::Duration;

/// Policy controlling randomization of restart delays.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JitterPolicy {
    /// No jitter: use the exact backoff delay. Predictable; fine for a single
    /// slot or for tests.
    None,

    /// Full jitter: random delay in `[0, delay]`. Maximum spreading.
    Full,

    /// Equal jitter: `delay/2 + random[0, delay/2]`. Keeps roughly 75% of the
    /// base delay on average.
    Equal,

    /// Decorrelated jitter: `random[base, prev × 3]` capped at max. Needs the
    /// previous delay as context, see [`JitterPolicy::apply_decorrelated`].
    Decorrelated,
}

impl Default for JitterPolicy {
    fn default() -> Self {
        JitterPolicy::None
    }
}

impl JitterPolicy {
    /// Applies jitter to the given delay.
    ///
    /// `Decorrelated` returns the input unchanged here; it needs the context
    /// of [`apply_decorrelated`](Self::apply_decorrelated).
    pub fn apply(&self, delay: Duration) -> Duration {
        match self {
            JitterPolicy::None => delay,
            JitterPolicy::Full => full_jitter(delay),
            JitterPolicy::Equal => equal_jitter(delay),
            JitterPolicy::Decorrelated => delay,
        }
    }

    /// Applies decorrelated jitter: `random[base, prev × 3]` capped at `max`.
    ///
    /// Falls back to [`apply`](Self::apply) for the other variants.
    pub fn apply_decorrelated(&self, base: Duration, prev: Duration, max: Duration) -> Duration {
        if !matches!(self, JitterPolicy::Decorrelated) {
            return self.apply(prev);
        }

        let mut rng = rand::rng();
        let base_ms = base.as_millis() as u64;
        let prev_ms = prev.as_millis() as u64;
        let max_ms = max.as_millis() as u64;

        let upper = prev_ms.saturating_mul(3).min(max_ms).max(base_ms);
        if base_ms >= upper {
            return base;
        }
        Duration::from_millis(rng.random_range(base_ms..=upper))
    }
}

/// Full jitter: `random[0, delay]`.
fn full_jitter(delay: Duration) -> Duration {
    let ms = delay.as_millis() as u64;
    if ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::rng().random_range(0..=ms))
}

/// Equal jitter: `delay/2 + random[0, delay/2]`.
fn equal_jitter(delay: Duration) -> Duration {
    let ms = delay.as_millis() as u64;
    if ms == 0 {
        return Duration::ZERO;
    }
    let half = ms / 2;
    let jitter = if half == 0 {
        0
    } else {
        rand::rng().random_range(0..=half)
    };
    Duration::from_millis(half + jitter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_is_identity() {
        let delay = Duration::from_millis(250);
        assert_eq!(JitterPolicy::None.apply(delay), delay);
    }

    #[test]
    fn full_stays_in_bounds() {
        let delay = Duration::from_millis(200);
        for _ in 0..64 {
            assert!(JitterPolicy::Full.apply(delay) <= delay);
        }
    }

    #[test]
    fn equal_keeps_at_least_half() {
        let delay = Duration::from_millis(200);
        for _ in 0..64 {
            let jittered = JitterPolicy::Equal.apply(delay);
            assert!(jittered >= Duration::from_millis(100));
            assert!(jittered <= delay);
        }
    }

    #[test]
    fn decorrelated_respects_cap() {
        let base = Duration::from_millis(50);
        let max = Duration::from_millis(400);
        let mut prev = base;
        for _ in 0..64 {
            prev = JitterPolicy::Decorrelated.apply_decorrelated(base, prev, max);
            assert!(prev >= base);
            assert!(prev <= max);
        }
    }

    #[test]
    fn zero_delay_stays_zero() {
        assert_eq!(JitterPolicy::Full.apply(Duration::ZERO), Duration::ZERO);
        assert_eq!(JitterPolicy::Equal.apply(Duration::ZERO), Duration::ZERO);
    }
}
