//! Bounded retry with a fixed delay between attempts.
//!
//! Every remote-service call in this crate goes through one [`Retry`]
//! policy instead of ad hoc sleep loops at each call site. No jitter, no
//! exponential growth: a fixed attempt cap and a fixed delay, matching the
//! transient-failure model of the upstream services.

use std::time::Duration;

/// Retry policy: up to `attempts` tries with `delay` between them.
#[derive(Debug, Clone, Copy)]
pub struct Retry {
    /// Total number of attempts (not retries); must be at least 1.
    pub attempts: u32,
    /// Fixed sleep between consecutive attempts.
    pub delay: Duration,
}

impl Default for Retry {
    /// Three attempts, ten seconds apart — the cap and delay the survey
    /// services were tuned for.
    fn default() -> Self {
        Self {
            attempts: 3,
            delay: Duration::from_secs(10),
        }
    }
}

impl Retry {
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self { attempts, delay }
    }

    /// Runs `f` until it succeeds or the attempt cap is reached; the last
    /// error is returned.
    pub fn run<T, E, F>(&self, mut f: F) -> Result<T, E>
    where
        F: FnMut() -> Result<T, E>,
    {
        let attempts = self.attempts.max(1);
        let mut last_err = None;
        for attempt in 0..attempts {
            if attempt > 0 {
                std::thread::sleep(self.delay);
            }
            match f() {
                Ok(v) => return Ok(v),
                Err(e) => last_err = Some(e),
            }
        }
        Err(last_err.expect("at least one attempt"))
    }
}
