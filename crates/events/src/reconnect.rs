//! Exponential backoff for re-establishing a dropped bus subscription.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Tunable parameters for the backoff strategy.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt.
    pub initial_delay: Duration,
    /// Upper bound on the delay between attempts.
    pub max_delay: Duration,
    /// Factor by which the delay grows after each failure.
    pub multiplier: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

/// Next backoff delay, clamped to [`ReconnectConfig::max_delay`].
pub fn next_delay(current: Duration, config: &ReconnectConfig) -> Duration {
    let next_ms = (current.as_millis() as f64 * config.multiplier) as u64;
    Duration::from_millis(next_ms).min(config.max_delay)
}

/// Retry `connect` with backoff until it succeeds or `cancel` fires.
///
/// Returns `None` only on cancellation. There is no attempt limit: a
/// broker outage of any length is waited out.
pub async fn retry_with_backoff<T, E, F, Fut>(
    label: &str,
    config: &ReconnectConfig,
    cancel: &CancellationToken,
    mut connect: F,
) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut delay = config.initial_delay;
    let mut attempt = 0u32;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return None,
            _ = tokio::time::sleep(delay) => {}
        }

        attempt += 1;
        tracing::info!(bus = label, attempt, "Reconnecting to bus");

        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!(bus = label, "Reconnect cancelled");
                return None;
            }
            result = connect() => match result {
                Ok(value) => {
                    tracing::info!(bus = label, attempt, "Reconnected to bus");
                    return Some(value);
                }
                Err(e) => {
                    tracing::warn!(
                        bus = label,
                        error = %e,
                        delay_ms = delay.as_millis() as u64,
                        "Reconnect attempt {attempt} failed",
                    );
                }
            }
        }

        delay = next_delay(delay, config);
    }
}
