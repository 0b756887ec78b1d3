use std::time::Duration;

/// Delay schedule for a poll loop.
#[derive(Debug, Clone)]
pub struct PollPolicy {
    /// Head start given to the backend before the first poll.
    pub initial_delay: Duration,
    /// Spacing between polls.
    pub interval: Duration,
    /// Attempt ceiling. `None` polls until a terminal status (or until the
    /// loop is cancelled).
    pub max_attempts: Option<u32>,
}

/// Tunable settings for the orchestration core.
///
/// The defaults reproduce the production cadences; tests shrink the delays
/// to milliseconds so poll loops run at full speed.
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Base URL of the AgriClip backend, without a trailing slash.
    pub base_url: String,
    /// Upper bound for uploaded image size, in bytes.
    pub max_upload_bytes: usize,
    /// Cadence of the chat response poller: 1.5s head start, then 12
    /// attempts at 1s spacing; exhaustion is silent.
    pub chat_poll: PollPolicy,
    /// Cadence of the classification job poller: 3s head start, then every
    /// 2s until the job reaches a terminal state. Deliberately unbounded.
    pub classify_poll: PollPolicy,
}

impl CoreConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Self::default()
        }
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:3000".to_string(),
            max_upload_bytes: 10 * 1024 * 1024,
            chat_poll: PollPolicy {
                initial_delay: Duration::from_millis(1500),
                interval: Duration::from_secs(1),
                max_attempts: Some(12),
            },
            classify_poll: PollPolicy {
                initial_delay: Duration::from_secs(3),
                interval: Duration::from_secs(2),
                max_attempts: None,
            },
        }
    }
}
