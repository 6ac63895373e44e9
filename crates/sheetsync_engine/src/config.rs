//! Configuration for the sync engine.

use sheetsync_protocol::WATCHED_TABLE;
use std::time::Duration;

/// Default capacity of the bounded event queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;

/// Configuration for the engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Table whose changes are mirrored.
    pub watched_table: String,
    /// Target spreadsheet.
    pub spreadsheet_id: String,
    /// Tab inside the spreadsheet.
    pub sheet_name: String,
    /// Capacity of the event queue between ingestion and the worker.
    pub queue_capacity: usize,
    /// How long the change-log stream sleeps when it has caught up.
    pub poll_interval: Duration,
    /// Maximum change-log records read per poll.
    pub stream_batch_size: usize,
    /// Retry configuration for mirror writes.
    pub retry: RetryConfig,
}

impl EngineConfig {
    /// Creates a configuration for a spreadsheet.
    pub fn new(spreadsheet_id: impl Into<String>) -> Self {
        Self {
            watched_table: WATCHED_TABLE.to_string(),
            spreadsheet_id: spreadsheet_id.into(),
            sheet_name: "Sheet1".to_string(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            poll_interval: Duration::from_millis(500),
            stream_batch_size: 100,
            retry: RetryConfig::no_retry(),
        }
    }

    /// Sets the sheet name.
    pub fn with_sheet_name(mut self, name: impl Into<String>) -> Self {
        self.sheet_name = name.into();
        self
    }

    /// Sets the event queue capacity.
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    /// Sets the change-log poll interval.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Sets the change-log batch size.
    pub fn with_stream_batch_size(mut self, size: usize) -> Self {
        self.stream_batch_size = size.max(1);
        self
    }

    /// Sets the retry configuration.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new("")
    }
}

/// Configuration for retry behavior.
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

    /// Enables or disables jitter.
    pub fn with_jitter(mut self, enabled: bool) -> Self {
        self.add_jitter = enabled;
        self
    }

    /// Calculates the delay before a given attempt (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let base_delay = self.initial_delay.as_secs_f64()
            * self.backoff_multiplier.powi(attempt.saturating_sub(1) as i32);
        let delay_secs = base_delay.min(self.max_delay.as_secs_f64());

        if self.add_jitter {
            // up to 25%
            let jitter = delay_secs * 0.25 * time_jitter();
            Duration::from_secs_f64(delay_secs + jitter)
        } else {
            Duration::from_secs_f64(delay_secs)
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::no_retry()
    }
}

fn time_jitter() -> f64 {
    let nanos = chrono::Utc::now().timestamp_subsec_nanos();
    (nanos % 1000) as f64 / 1000.0
}
