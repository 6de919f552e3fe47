//! Retry policy and backoff calculation for remote stores

use std::time::Duration;

/// Retry configuration for a remote object store
#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_multiplier: f64,
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
            jitter_factor: 0.1,
        }
    }
}

impl RetryConfig {
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
}

/// Calculate exponential backoff delay with jitter for a 1-based attempt
#[must_use]
pub fn calculate_backoff_delay(retry_config: &RetryConfig, attempt: u32) -> Duration {
    // Precision loss acceptable for backoff calculations
    #[allow(clippy::cast_precision_loss)]
    let base_delay = retry_config
        .initial_delay
        .as_millis()
        .min(u128::from(u64::MAX)) as f64;
    #[allow(clippy::cast_precision_loss)]
    let max_delay = retry_config.max_delay.as_millis().min(u128::from(u64::MAX)) as f64;

    let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
    let delay = (base_delay * retry_config.backoff_multiplier.powi(exponent)).min(max_delay);

    let jitter = delay * retry_config.jitter_factor * (rand::random::<f64>() - 0.5);
    // max(0.0) keeps the value non-negative
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let final_delay = (delay + jitter).max(0.0).round() as u64;

    Duration::from_millis(final_delay)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_grows_and_caps() {
        let config = RetryConfig {
            jitter_factor: 0.0,
            ..RetryConfig::default()
        };
        assert_eq!(calculate_backoff_delay(&config, 1), Duration::from_millis(250));
        assert_eq!(calculate_backoff_delay(&config, 2), Duration::from_millis(500));
        assert_eq!(calculate_backoff_delay(&config, 3), Duration::from_secs(1));
        assert_eq!(calculate_backoff_delay(&config, 20), Duration::from_secs(5));
    }

    #[test]
    fn test_jitter_stays_within_bounds() {
        let config = RetryConfig::default();
        for _ in 0..50 {
            let delay = calculate_backoff_delay(&config, 2);
            assert!(delay >= Duration::from_millis(475) && delay <= Duration::from_millis(525));
        }
    }
}
