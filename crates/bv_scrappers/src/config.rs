use bv_core::RetryPolicy;
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = "BharatVerse/1.0 (https://github.com/bharatverse)";

#[derive(Debug, Clone)]
pub struct ScraperConfig {
    /// 0.5 means one request every two seconds
    pub requests_per_second: f64,
    pub retry: RetryPolicy,
    pub user_agent: String,
    pub page_timeout: Duration,
    pub max_images: usize,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 0.5,
            retry: RetryPolicy::default(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            page_timeout: Duration::from_secs(30),
            max_images: 10,
        }
    }
}

impl ScraperConfig {
    /// Builds from the `SCRAPING_RATE_LIMIT_SECONDS` / `MAX_SCRAPING_RETRIES` pair.
    pub fn from_settings(rate_limit_seconds: f64, max_retries: u32) -> Self {
        let requests_per_second = if rate_limit_seconds > 0.0 {
            1.0 / rate_limit_seconds
        } else {
            0.0
        };
        Self {
            requests_per_second,
            retry: RetryPolicy {
                max_retries,
                ..RetryPolicy::default()
            },
            ..Self::default()
        }
    }
}
