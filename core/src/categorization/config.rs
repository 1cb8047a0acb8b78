use categorizer::env::{QueueOverflow, ENV_VARS};
use categorizer::prelude::Duration;

/// The knobs of one manager. `Default` reads them from the environment.
#[derive(Clone, Debug)]
pub struct ManagerConfig {
    pub block_queue_capacity: usize,
    pub block_queue_overflow: QueueOverflow,
    pub feed_poll_interval: Duration,
    pub feed_idle_timeout: Duration,
    pub catchup_backoff_base: Duration,
    pub catchup_backoff_ceil: Duration,
    pub log_filter_page_size: Option<u64>,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        ManagerConfig {
            block_queue_capacity: ENV_VARS.block_queue_capacity(),
            block_queue_overflow: ENV_VARS.block_queue_overflow(),
            feed_poll_interval: ENV_VARS.feed_poll_interval(),
            feed_idle_timeout: ENV_VARS.feed_idle_timeout(),
            catchup_backoff_base: ENV_VARS.catchup_backoff_base(),
            catchup_backoff_ceil: ENV_VARS.catchup_backoff_ceil(),
            log_filter_page_size: ENV_VARS.log_filter_page_size(),
        }
    }
}
