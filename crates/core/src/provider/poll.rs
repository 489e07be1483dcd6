//! Polling with a doubling backoff delay, for remote transcription jobs.

use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

#[derive(Clone, Debug)]
pub struct PollConfig {
    /// Delay before the first re-poll.
    pub initial_delay: Duration,
    /// Multiplier applied to the delay after every poll.
    pub backoff_multiplier: f64,
    /// Ceiling for the delay between polls.
    pub max_delay: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            backoff_multiplier: 2.0,
            max_delay: Duration::from_secs(60),
        }
    }
}

impl PollConfig {
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay_ms = self.initial_delay.as_millis() as f64
            * self.backoff_multiplier.powi(attempt as i32 - 1);
        Duration::from_millis(delay_ms as u64).min(self.max_delay)
    }
}

/// Poll until `poll` yields a value or fails. There is no overall timeout;
/// callers needing a bounded wait impose one externally.
pub async fn poll_until<F, Fut, T, E>(config: &PollConfig, mut poll: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<Option<T>, E>>,
{
    let mut attempt: u32 = 1;
    loop {
        if let Some(value) = poll().await? {
            return Ok(value);
        }
        let delay = config.delay_for_attempt(attempt);
        debug!(attempt, delay_ms = delay.as_millis() as u64, "job pending, waiting");
        sleep(delay).await;
        attempt = attempt.saturating_add(1);
    }
}
