use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_LOG_DIR: &str = "job-logs";
pub const DEFAULT_KEEPALIVE: Duration = Duration::from_secs(25);
pub const DEFAULT_SUBSCRIBER_CAPACITY: usize = 1024;
pub const DEFAULT_MAILBOX_CAPACITY: usize = 256;
pub const DEFAULT_HISTORY_BYTES: u64 = 64 * 1024;
/// Shortest keepalive interval a subscription will wait.
pub const MIN_KEEPALIVE: Duration = Duration::from_millis(10);

/// Settings shared by the queue and its log hub.
#[derive(Clone, Debug)]
pub struct QueueConfig {
    /// Directory holding one append-only log file per job.
    pub log_dir: PathBuf,
    /// Idle time after which a subscriber receives a keepalive frame.
    pub keepalive: Duration,
    /// Lines buffered per subscriber before new lines are dropped for it.
    pub subscriber_capacity: usize,
    /// Capacity of the queue's request mailbox.
    pub mailbox_capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            keepalive: DEFAULT_KEEPALIVE,
            subscriber_capacity: DEFAULT_SUBSCRIBER_CAPACITY,
            mailbox_capacity: DEFAULT_MAILBOX_CAPACITY,
        }
    }
}

impl QueueConfig {
    pub fn new(log_dir: impl Into<PathBuf>) -> Self {
        Self {
            log_dir: log_dir.into(),
            ..Self::default()
        }
    }

    pub fn with_keepalive(mut self, keepalive: Duration) -> Self {
        self.keepalive = keepalive.max(MIN_KEEPALIVE);
        self
    }

    pub fn with_subscriber_capacity(mut self, capacity: usize) -> Self {
        self.subscriber_capacity = capacity.max(1);
        self
    }

    pub fn with_mailbox_capacity(mut self, capacity: usize) -> Self {
        self.mailbox_capacity = capacity.max(1);
        self
    }

    /// The same settings with every value raised to what the actors can run with.
    pub(crate) fn clamped(&self) -> Self {
        Self {
            log_dir: self.log_dir.clone(),
            keepalive: self.keepalive.max(MIN_KEEPALIVE),
            subscriber_capacity: self.subscriber_capacity.max(1),
            mailbox_capacity: self.mailbox_capacity.max(1),
        }
    }
}
