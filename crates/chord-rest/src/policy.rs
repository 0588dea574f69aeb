//! HTTP 429 handling policy

use std::time::Duration;

/// Delay used when a 429 response names no retry delay
const FALLBACK_RETRY_AFTER: Duration = Duration::from_secs(1);

/// Longest single sleep before a retry
const MAX_RETRY_AFTER: Duration = Duration::from_secs(60);

/// What to do when the API answers 429 Too Many Requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitPolicy {
    /// Return `RateLimited` to the caller immediately
    Surface,
    /// Sleep for the advertised delay and retry, surfacing `RateLimited`
    /// once `max_retries` retries have been spent
    Retry { max_retries: u32 },
}

impl RateLimitPolicy {
    /// Build the policy from a retry count; zero means surface immediately
    #[must_use]
    pub fn from_retries(max_retries: u32) -> Self {
        if max_retries == 0 {
            Self::Surface
        } else {
            Self::Retry { max_retries }
        }
    }

    /// Decide whether attempt number `retries_done + 1` should be made
    #[must_use]
    pub fn should_retry(&self, retries_done: u32) -> bool {
        match self {
            Self::Surface => false,
            Self::Retry { max_retries } => retries_done < *max_retries,
        }
    }

    /// Convert the advertised delay in seconds into a sleep duration
    ///
    /// Delays above [`MAX_RETRY_AFTER`] are clamped to it.
    #[must_use]
    pub fn backoff(retry_after: Option<f64>) -> Duration {
        match retry_after {
            Some(secs) if secs.is_finite() && secs >= 0.0 => Duration::try_from_secs_f64(secs)
                .map_or(MAX_RETRY_AFTER, |delay| delay.min(MAX_RETRY_AFTER)),
            _ => FALLBACK_RETRY_AFTER,
        }
    }
}

impl Default for RateLimitPolicy {
    fn default() -> Self {
        Self::Retry { max_retries: 3 }
    }
}
