// ABOUTME: Configuration for the HTTP session: retry policy, timeout, and User-Agent.
// ABOUTME: SessionBuilder provides a fluent API for constructing HttpSession instances.

use std::time::Duration;

use crate::resource::HttpSession;

/// User-Agent sent with every request unless overridden.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (compatible; HoroscopoScraper/1.0; +https://example.org)";

/// HTTP method a retry policy may apply to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryMethod {
    Get,
    Head,
}

/// When and how long to wait before re-sending a failed request.
///
/// `total` counts retries, so a request is sent at most `total + 1` times.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub total: u32,
    pub backoff_factor: f64,
    pub backoff_max: Duration,
    pub status_forcelist: Vec<u16>,
    pub allowed_methods: Vec<RetryMethod>,
    pub respect_retry_after: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            total: 5,
            backoff_factor: 0.5,
            backoff_max: Duration::from_secs(120),
            status_forcelist: vec![429, 500, 502, 503, 504],
            allowed_methods: vec![RetryMethod::Get],
            respect_retry_after: true,
        }
    }
}

impl RetryPolicy {
    /// Returns true if `status` should be retried.
    pub fn is_retryable_status(&self, status: u16) -> bool {
        self.status_forcelist.contains(&status)
    }

    /// Returns true if requests with `method` may be retried at all.
    pub fn allows(&self, method: RetryMethod) -> bool {
        self.allowed_methods.contains(&method)
    }

    /// Delay before the `retry`-th retry (1-based).
    ///
    /// The first retry goes out immediately; later ones wait
    /// `backoff_factor * 2^(retry - 1)` seconds, capped at `backoff_max`.
    /// A NaN or non-positive factor never waits.
    pub fn backoff(&self, retry: u32) -> Duration {
        if retry <= 1 || self.backoff_factor.is_nan() || self.backoff_factor <= 0.0 {
            return Duration::ZERO;
        }
        let exp = (retry - 1).min(31) as i32;
        let secs = (self.backoff_factor * 2f64.powi(exp)).min(self.backoff_max.as_secs_f64());
        Duration::try_from_secs_f64(secs).unwrap_or(self.backoff_max)
    }
}

/// Configuration options for an [`HttpSession`].
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub timeout: Duration,
    pub user_agent: String,
    pub retry: RetryPolicy,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            retry: RetryPolicy::default(),
        }
    }
}

/// Builder for constructing [`HttpSession`] instances with custom configuration.
#[derive(Debug, Clone)]
pub struct SessionBuilder {
    opts: SessionOptions,
}

impl SessionBuilder {
    /// Create a new SessionBuilder with default options.
    pub fn new() -> Self {
        Self {
            opts: SessionOptions::default(),
        }
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.opts.timeout = timeout;
        self
    }

    /// Set the User-Agent header.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.opts.user_agent = user_agent.into();
        self
    }

    /// Replace the retry policy.
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.opts.retry = retry;
        self
    }

    /// Set the retry budget.
    pub fn retries(mut self, total: u32) -> Self {
        self.opts.retry.total = total;
        self
    }

    /// Set the exponential backoff factor in seconds.
    pub fn backoff_factor(mut self, factor: f64) -> Self {
        self.opts.retry.backoff_factor = factor;
        self
    }

    /// Build the session with the configured options.
    pub fn build(self) -> crate::Result<HttpSession> {
        HttpSession::new(self.opts)
    }
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_matches_session_defaults() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.total, 5);
        assert_eq!(policy.status_forcelist, vec![429, 500, 502, 503, 504]);
        assert!(policy.allows(RetryMethod::Get));
        assert!(!policy.allows(RetryMethod::Head));
        assert!(policy.is_retryable_status(503));
        assert!(!policy.is_retryable_status(404));
    }

    #[test]
    fn backoff_schedule_doubles_after_first_retry() {
        let policy = RetryPolicy::default();
        let secs: Vec<f64> = (1..=5).map(|n| policy.backoff(n).as_secs_f64()).collect();
        assert_eq!(secs, vec![0.0, 1.0, 2.0, 4.0, 8.0]);
    }

    #[test]
    fn backoff_is_capped() {
        let policy = RetryPolicy {
            backoff_max: Duration::from_secs(3),
            ..RetryPolicy::default()
        };
        assert_eq!(policy.backoff(10), Duration::from_secs(3));
    }

    #[test]
    fn huge_or_infinite_factor_waits_the_cap() {
        for factor in [1e20, f64::INFINITY, f64::MAX] {
            let policy = RetryPolicy {
                backoff_factor: factor,
                ..RetryPolicy::default()
            };
            assert_eq!(policy.backoff(2), Duration::from_secs(120), "factor {factor}");
            assert_eq!(policy.backoff(40), Duration::from_secs(120), "factor {factor}");
        }
    }

    #[test]
    fn nan_or_negative_factor_never_sleeps() {
        for factor in [f64::NAN, -1.0, f64::NEG_INFINITY] {
            let policy = RetryPolicy {
                backoff_factor: factor,
                ..RetryPolicy::default()
            };
            assert_eq!(policy.backoff(3), Duration::ZERO, "factor {factor}");
        }
    }

    #[test]
    fn zero_factor_never_sleeps() {
        let policy = RetryPolicy {
            backoff_factor: 0.0,
            ..RetryPolicy::default()
        };
        assert_eq!(policy.backoff(4), Duration::ZERO);
    }

    #[test]
    fn builder_overrides_retry_fields() {
        let builder = SessionBuilder::new()
            .retries(2)
            .backoff_factor(0.0)
            .user_agent("test-agent");
        assert_eq!(builder.opts.retry.total, 2);
        assert_eq!(builder.opts.retry.backoff_factor, 0.0);
        assert_eq!(builder.opts.user_agent, "test-agent");
        assert_eq!(builder.opts.timeout, Duration::from_secs(30));
    }
}
