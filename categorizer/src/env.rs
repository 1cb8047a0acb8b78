use envconfig::Envconfig;
use lazy_static::lazy_static;
use std::{str::FromStr, time::Duration};

lazy_static! {
    pub static ref ENV_VARS: EnvVars = EnvVars::from_env().unwrap();
}

/// What the Block Queue does when a block arrives and the queue is full.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QueueOverflow {
    /// Suspend the ingestor until the dispatcher made room.
    Block,
    /// Evict the oldest queued block to make room for the new one.
    DropOldest,
}

impl FromStr for QueueOverflow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "block" => Ok(QueueOverflow::Block),
            "drop_oldest" => Ok(QueueOverflow::DropOldest),
            _ => Err(format!(
                "invalid queue overflow policy `{}`, expected `block` or `drop_oldest`",
                s
            )),
        }
    }
}

#[derive(Clone, Debug)]
pub struct EnvVars {
    inner: Inner,
}

impl EnvVars {
    pub fn from_env() -> Result<Self, envconfig::Error> {
        let inner = Inner::init_from_env()?;
        Ok(Self { inner })
    }

    /// Maximum number of blocks waiting for the live dispatcher.
    pub fn block_queue_capacity(&self) -> usize {
        self.inner.block_queue_capacity.0
    }

    pub fn block_queue_overflow(&self) -> QueueOverflow {
        self.inner.block_queue_overflow
    }

    /// How long the ingestor waits for one broadcast before checking the
    /// feed's idle time.
    pub fn feed_poll_interval(&self) -> Duration {
        Duration::from_millis(self.inner.feed_poll_interval_in_msec)
    }

    /// Silence on the feed after which the subscription is re-armed. The
    /// default is the longest block time among the supported chains.
    pub fn feed_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.inner.feed_idle_timeout_in_sec)
    }

    pub fn catchup_backoff_base(&self) -> Duration {
        Duration::from_millis(self.inner.catchup_backoff_base_in_msec)
    }

    /// Ceiling for the backoff between failed catch-up fetches.
    pub fn catchup_backoff_ceil(&self) -> Duration {
        Duration::from_secs(self.inner.catchup_backoff_ceil_in_sec)
    }

    /// Number of blocks asked from the historical log source at once.
    /// `None` asks for everything up to the live frontier.
    pub fn log_filter_page_size(&self) -> Option<u64> {
        self.inner.log_filter_page_size
    }

    /// Log level filter, in `RUST_LOG` syntax.
    pub fn log_levels(&self) -> Option<&str> {
        self.inner.log_levels.as_deref()
    }
}

#[derive(Clone, Debug, Envconfig)]
struct Inner {
    #[envconfig(from = "CATEGORIZER_BLOCK_QUEUE_CAPACITY", default = "10_000")]
    block_queue_capacity: WithoutUnderscores<usize>,
    #[envconfig(from = "CATEGORIZER_BLOCK_QUEUE_OVERFLOW", default = "block")]
    block_queue_overflow: QueueOverflow,
    #[envconfig(from = "CATEGORIZER_FEED_POLL_INTERVAL_MS", default = "2000")]
    feed_poll_interval_in_msec: u64,
    #[envconfig(from = "CATEGORIZER_FEED_IDLE_TIMEOUT_SECS", default = "20")]
    feed_idle_timeout_in_sec: u64,
    #[envconfig(from = "CATEGORIZER_CATCHUP_BACKOFF_BASE_MS", default = "250")]
    catchup_backoff_base_in_msec: u64,
    #[envconfig(from = "CATEGORIZER_CATCHUP_BACKOFF_CEIL_SECS", default = "30")]
    catchup_backoff_ceil_in_sec: u64,
    #[envconfig(from = "CATEGORIZER_LOG_FILTER_PAGE_SIZE")]
    log_filter_page_size: Option<u64>,
    #[envconfig(from = "CATEGORIZER_LOG")]
    log_levels: Option<String>,
}

#[derive(Copy, Clone, Debug)]
struct WithoutUnderscores<T>(pub T);

impl<T> FromStr for WithoutUnderscores<T>
where
    T: FromStr,
    T::Err: ToString,
{
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match T::from_str(s.replace('_', "").as_str()) {
            Ok(x) => Ok(Self(x)),
            Err(e) => Err(e.to_string()),
        }
    }
}
