//! Resolver configuration.

use std::time::Duration;

/// Execution mode for the hierarchy resolver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionMode {
    /// Single control flow, one claim/fetch/enqueue cycle at a time.
    Sequential,
    /// Fixed-size worker pool draining a shared queue.
    Parallel,
}

/// What to do when a group's metadata fetch exhausts its retries.
///
/// This is a single documented policy for the whole run, not a per-call
/// choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeFailurePolicy {
    /// Fail the entire resolution (default).
    FailResolution,
    /// Record the group as a leaf with no parents and continue; the
    /// report counts it as failed.
    TreatAsLeaf,
}

/// Bounded exponential backoff for transient errors.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum attempts per operation, including the first (default: 5).
    pub max_attempts: u32,
    /// Delay before the first retry (default: 500ms).
    pub initial_delay: Duration,
    /// Cap on any single delay (default: 30s).
    pub max_delay: Duration,
    /// Multiplier for exponential growth (default: 2.0).
    pub multiplier: f64,
    /// Whether to add up to 25% jitter to delays (default: true).
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Creates a configuration optimized for testing (short delays, no
    /// jitter).
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(5),
            max_delay: Duration::from_millis(50),
            multiplier: 2.0,
            jitter: false,
        }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("max_attempts must be > 0".to_string());
        }
        if self.initial_delay.is_zero() {
            return Err("initial_delay must be > 0".to_string());
        }
        if self.max_delay < self.initial_delay {
            return Err("max_delay must be >= initial_delay".to_string());
        }
        if self.multiplier < 1.0 {
            return Err("multiplier must be >= 1.0".to_string());
        }
        Ok(())
    }

    /// Backoff delay for a 0-indexed attempt, capped and with jitter
    /// applied when configured.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let base = self.initial_delay.as_millis() as f64 * self.multiplier.powi(attempt as i32);
        let capped = base.min(self.max_delay.as_millis() as f64);

        let final_ms = if self.jitter {
            use rand::Rng;
            let jitter = rand::thread_rng().gen_range(0.0..=capped * 0.25);
            capped + jitter
        } else {
            capped
        };

        Duration::from_millis(final_ms as u64)
    }
}

/// Configuration for a resolution run.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Sequential or parallel hierarchy expansion (default: Parallel).
    pub mode: ResolutionMode,
    /// Worker pool size in parallel mode (default: 8).
    pub worker_count: usize,
    /// Node-fetch failure policy (default: FailResolution).
    pub failure_policy: NodeFailurePolicy,
    /// Retry behavior for transient directory and query failures.
    pub retry: RetryConfig,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            mode: ResolutionMode::Parallel,
            worker_count: 8,
            failure_policy: NodeFailurePolicy::FailResolution,
            retry: RetryConfig::default(),
        }
    }
}

impl ResolverConfig {
    /// Creates a configuration optimized for testing.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            mode: ResolutionMode::Sequential,
            worker_count: 2,
            failure_policy: NodeFailurePolicy::FailResolution,
            retry: RetryConfig::for_testing(),
        }
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.mode == ResolutionMode::Parallel && self.worker_count == 0 {
            return Err("worker_count must be > 0 in parallel mode".to_string());
        }
        self.retry.validate()
    }
}
