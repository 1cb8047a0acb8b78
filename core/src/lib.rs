mod categorization;

pub use categorization::{
    Baseline, BlockQueue, CatchUpEngine, Categorized, CategorizeError, IngestError,
    LiveDispatcher, Manager, ManagerConfig, ManagerError, ManagerMetrics, Placement,
    PublishError, ResultPublisher, SubscriptionIngestor, Worker, WorkerGroup,
};
