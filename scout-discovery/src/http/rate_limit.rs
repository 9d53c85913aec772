//! Minimum spacing between successive calls to one external registry

use super::HttpError;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Rate limiter enforcing a minimum interval between requests
///
/// Callers are serialized on the inner lock, so concurrent users of one
/// client never burst past the interval.
pub struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval,
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait if necessary to comply with the rate limit
    pub async fn wait(&self, cancel: &CancellationToken) -> Result<(), HttpError> {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                tracing::debug!("Rate limiting: waiting {:?}", wait_time);
                super::sleep_or_cancel(wait_time, cancel).await?;
            }
        }

        *last = Some(Instant::now());
        Ok(())
    }
}
