//! Retry classification and exponential backoff schedule.

use std::time::Duration;

use crate::sources::ProviderError;

/// Configuration for retry behavior
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryConfig {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Upper bound on any single delay
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(10),
        }
    }
}

impl RetryConfig {
    /// Set the retry count
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = retries;
        self
    }

    /// Delay before retry number `attempt` (0-based): `initial * 2^attempt`, capped
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.initial_delay
            .checked_mul(factor)
            .map_or(self.max_delay, |d| d.min(self.max_delay))
    }
}

/// Transient errors that should trigger a retry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransientError {
    /// Request timeout
    Timeout,
    /// Too many requests (429)
    TooManyRequests,
    /// Service unavailable (503)
    ServiceUnavailable,
}

impl TransientError {
    /// Classify a provider error; `None` means the failure is permanent
    pub fn from_provider_error(err: &ProviderError) -> Option<Self> {
        match err {
            ProviderError::Timeout(_) => Some(TransientError::Timeout),
            ProviderError::HttpStatus { status: 429, .. } => Some(TransientError::TooManyRequests),
            ProviderError::HttpStatus { status: 503, .. } => {
                Some(TransientError::ServiceUnavailable)
            }
            ProviderError::Network(msg) if msg.to_lowercase().contains("timed out") => {
                Some(TransientError::Timeout)
            }
            _ => None,
        }
    }
}
