//! Configuration for the sync engine.

use std::time::Duration;
use stockroom_core::RecordKind;

/// Configuration for sync operations.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Remote collection holding storage items.
    pub storage_collection: String,
    /// Remote collection holding taken-out items.
    pub taken_out_collection: String,
    /// Whether a retried local-wins push skips records a previous attempt
    /// already upserted, provided the local snapshot has not changed.
    pub resume_partial_push: bool,
    /// Blob key under which an unfinished push cursor is saved, when the
    /// reconciler has a cursor store.
    pub cursor_key: String,
    /// Retry schedule for callers that choose to retry.
    pub retry: RetryConfig,
}

impl SyncConfig {
    /// Creates a new sync configuration with the default collection names.
    pub fn new() -> Self {
        Self {
            storage_collection: RecordKind::Storage.default_collection().to_string(),
            taken_out_collection: RecordKind::TakenOut.default_collection().to_string(),
            resume_partial_push: true,
            cursor_key: "pushCursor.json".to_string(),
            retry: RetryConfig::default(),
        }
    }

    /// Sets both remote collection names.
    pub fn with_collections(
        mut self,
        storage: impl Into<String>,
        taken_out: impl Into<String>,
    ) -> Self {
        self.storage_collection = storage.into();
        self.taken_out_collection = taken_out.into();
        self
    }

    /// Sets whether partial pushes are resumed.
    pub fn with_resume_partial_push(mut self, resume: bool) -> Self {
        self.resume_partial_push = resume;
        self
    }

    /// Sets the blob key of the saved push cursor.
    pub fn with_cursor_key(mut self, key: impl Into<String>) -> Self {
        self.cursor_key = key.into();
        self
    }

    /// Sets the retry configuration.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Returns the remote collection name for a record kind.
    pub fn collection(&self, kind: RecordKind) -> &str {
        match kind {
            RecordKind::Storage => &self.storage_collection,
            RecordKind::TakenOut => &self.taken_out_collection,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration for caller-driven retries.
///
/// The reconciler never retries on its own. A caller that wants to retry a
/// retryable error asks this schedule how long to wait first.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first.
    pub max_attempts: u32,
    /// Initial delay between retries.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f64,
    /// Whether to add jitter to delays.
    pub add_jitter: bool,
}

impl RetryConfig {
    /// Creates a new retry configuration.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::from_millis(200),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
            add_jitter: true,
        }
    }

    /// Creates a configuration with no retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
            add_jitter: false,
        }
    }

    /// Sets the initial delay.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the maximum delay.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the backoff multiplier.
    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Sets whether delays get jitter.
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.add_jitter = jitter;
        self
    }

    /// Calculates the delay for a given attempt (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let base_delay = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        let delay_secs = base_delay.min(self.max_delay.as_secs_f64());

        if self.add_jitter {
            // Add up to 25% jitter
            let jitter = delay_secs * 0.25 * rand_jitter();
            Duration::from_secs_f64(delay_secs + jitter)
        } else {
            Duration::from_secs_f64(delay_secs)
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(3)
    }
}

/// Cheap pseudo-random jitter from the clock; no RNG dependency.
fn rand_jitter() -> f64 {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    f64::from(nanos % 1000) / 1000.0
}
