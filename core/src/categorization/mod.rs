mod baseline;
mod catchup;
mod config;
mod dispatcher;
mod error;
mod group;
mod ingestor;
mod manager;
mod metrics;
mod publisher;
mod queue;
mod state;
mod worker;

pub use self::baseline::Baseline;
pub use self::catchup::CatchUpEngine;
pub use self::config::ManagerConfig;
pub use self::dispatcher::LiveDispatcher;
pub use self::error::{CategorizeError, IngestError, ManagerError, PublishError};
pub use self::group::WorkerGroup;
pub use self::ingestor::SubscriptionIngestor;
pub use self::manager::{Manager, Placement};
pub use self::metrics::ManagerMetrics;
pub use self::publisher::ResultPublisher;
pub use self::queue::BlockQueue;
pub use self::worker::{Categorized, Worker};
