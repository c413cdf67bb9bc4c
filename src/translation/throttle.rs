//! Minimum spacing between requests shared by concurrent workers.

use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Enforces a minimum interval between request starts across tasks.
///
/// The lock is held while waiting, so callers are released one at a time.
pub struct RequestThrottle {
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RequestThrottle {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: Mutex::new(None),
        }
    }

    /// Wait until a request may start, then record it as started.
    pub async fn acquire(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_requests_are_spaced() {
        let throttle = Arc::new(RequestThrottle::new(Duration::from_millis(30)));
        let started = Instant::now();

        let handles: Vec<_> = (0..3)
            .map(|_| {
                let throttle = throttle.clone();
                tokio::spawn(async move { throttle.acquire().await })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap();
        }

        assert!(started.elapsed() >= Duration::from_millis(60));
    }

    #[tokio::test]
    async fn test_first_request_is_immediate() {
        let throttle = RequestThrottle::new(Duration::from_secs(10));
        let started = Instant::now();
        throttle.acquire().await;
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
