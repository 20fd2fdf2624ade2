//! Bounded retry for provider calls
//!
//! A `RetryPolicy` pairs a maximum attempt count with a backoff function.
//! Waiting goes through a `Sleeper` so tests can run without real delays.

use async_trait::async_trait;
use rand::Rng;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Delay to wait after a failed attempt (1-based)
pub trait Backoff: Send + Sync {
    fn delay(&self, attempt: u32) -> Duration;
}

/// Attempt `n` waits a random time between `low * n` and `high * n` units.
#[derive(Debug, Clone)]
pub struct LinearJitterBackoff {
    pub unit: Duration,
    pub low: f64,
    pub high: f64,
}

impl Default for LinearJitterBackoff {
    fn default() -> Self {
        Self {
            unit: Duration::from_secs(1),
            low: 0.5,
            high: 0.8,
        }
    }
}

impl LinearJitterBackoff {
    pub fn bounds(&self, attempt: u32) -> (Duration, Duration) {
        let n = attempt.max(1) as f64;
        (
            self.unit.mul_f64(self.low * n),
            self.unit.mul_f64(self.high * n),
        )
    }
}

impl Backoff for LinearJitterBackoff {
    fn delay(&self, attempt: u32) -> Duration {
        let n = attempt.max(1) as f64;
        let factor = if self.high > self.low {
            rand::thread_rng().gen_range(self.low..=self.high)
        } else {
            self.low
        };
        self.unit.mul_f64(factor * n)
    }
}

/// Same delay after every attempt
#[derive(Debug, Clone, Copy)]
pub struct FixedBackoff(pub Duration);

impl Backoff for FixedBackoff {
    fn delay(&self, _attempt: u32) -> Duration {
        self.0
    }
}

#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

#[derive(Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    backoff: Arc<dyn Backoff>,
}

impl std::fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .finish()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, LinearJitterBackoff::default())
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: impl Backoff + 'static) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff: Arc::new(backoff),
        }
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.backoff.delay(attempt)
    }

    /// Run `f` until it succeeds or `max_attempts` is reached.
    /// Every error is treated as retriable; the last one is returned.
    pub async fn execute<F, Fut, T, E>(&self, sleeper: &dyn Sleeper, mut f: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match f().await {
                Ok(result) => return Ok(result),
                Err(e) if attempt < self.max_attempts => {
                    let backoff = self.delay_for(attempt);
                    warn!(
                        "Provider call failed (attempt {}/{}): {}. Retrying in {}ms",
                        attempt,
                        self.max_attempts,
                        e,
                        backoff.as_millis()
                    );
                    sleeper.sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
