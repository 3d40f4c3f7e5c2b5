use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Enforces a minimum gap between requests. The first request never waits.
pub struct RateLimiter {
    min_interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RateLimiter {
    /// A non-positive rate disables limiting.
    pub fn new(requests_per_second: f64) -> Self {
        let min_interval = if requests_per_second > 0.0 && requests_per_second.is_finite() {
            Duration::from_secs_f64(1.0 / requests_per_second)
        } else {
            Duration::ZERO
        };
        Self::with_interval(min_interval)
    }

    pub fn with_interval(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: Mutex::new(None),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    pub async fn wait(&self) {
        // Held across the sleep so concurrent callers queue up.
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.min_interval {
                let delay = self.min_interval - elapsed;
                debug!("Rate limited, sleeping {:?}", delay);
                tokio::time::sleep(delay).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_interval_from_rate() {
        assert_eq!(RateLimiter::new(0.5).min_interval(), Duration::from_secs(2));
        assert_eq!(RateLimiter::new(4.0).min_interval(), Duration::from_millis(250));
        assert_eq!(RateLimiter::new(0.0).min_interval(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_first_request_does_not_wait() {
        let limiter = RateLimiter::with_interval(Duration::from_secs(5));
        let start = Instant::now();
        limiter.wait().await;
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_spaces_consecutive_requests() {
        let limiter = Arc::new(RateLimiter::with_interval(Duration::from_millis(50)));
        let start = Instant::now();
        let tasks: Vec<_> = (0..3)
            .map(|_| {
                let limiter = limiter.clone();
                tokio::spawn(async move { limiter.wait().await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }
        assert!(start.elapsed() >= Duration::from_millis(100));
    }
}
