use categorizer::components::metrics::network_labels;
use categorizer::prelude::{Counter, Gauge, MetricsRegistry};

pub struct ManagerMetrics {
    pub live_workers: Box<Gauge>,
    pub worker_groups: Box<Gauge>,
    pub block_queue_depth: Box<Gauge>,
    pub live_block_number: Box<Gauge>,
    pub dropped_blocks: Box<Counter>,
    pub publish_failures: Box<Counter>,
    pub catchup_fetch_failures: Box<Counter>,
    pub malformed_messages: Box<Counter>,
}

impl ManagerMetrics {
    pub fn new(registry: &MetricsRegistry, network_id: &str) -> Self {
        let live_workers = registry
            .new_gauge(
                "categorizer_live_workers",
                "Number of smartcontract workers fed by the live block feed",
                network_labels(network_id),
            )
            .expect("failed to create `categorizer_live_workers` gauge");
        let worker_groups = registry
            .new_gauge(
                "categorizer_worker_groups",
                "Number of worker groups catching up on historical logs",
                network_labels(network_id),
            )
            .expect("failed to create `categorizer_worker_groups` gauge");
        let block_queue_depth = registry
            .new_gauge(
                "categorizer_block_queue_depth",
                "Number of blocks waiting for the live dispatcher",
                network_labels(network_id),
            )
            .expect("failed to create `categorizer_block_queue_depth` gauge");
        let live_block_number = registry
            .new_gauge(
                "categorizer_live_block_number",
                "Number of the last block dispatched to the live workers",
                network_labels(network_id),
            )
            .expect("failed to create `categorizer_live_block_number` gauge");
        let dropped_blocks = registry
            .new_counter(
                "categorizer_dropped_blocks",
                "Counts blocks evicted from a full block queue",
                network_labels(network_id),
            )
            .expect("failed to create `categorizer_dropped_blocks` counter");
        let publish_failures = registry
            .new_counter(
                "categorizer_publish_failures",
                "Counts categorized results that could not be pushed downstream",
                network_labels(network_id),
            )
            .expect("failed to create `categorizer_publish_failures` counter");
        let catchup_fetch_failures = registry
            .new_counter(
                "categorizer_catchup_fetch_failures",
                "Counts failed historical log fetches",
                network_labels(network_id),
            )
            .expect("failed to create `categorizer_catchup_fetch_failures` counter");
        let malformed_messages = registry
            .new_counter(
                "categorizer_malformed_messages",
                "Counts broadcasts discarded by the subscription ingestor",
                network_labels(network_id),
            )
            .expect("failed to create `categorizer_malformed_messages` counter");

        ManagerMetrics {
            live_workers,
            worker_groups,
            block_queue_depth,
            live_block_number,
            dropped_blocks,
            publish_failures,
            catchup_fetch_failures,
            malformed_messages,
        }
    }

    pub fn mock() -> Self {
        ManagerMetrics::new(&MetricsRegistry::mock(), "mock")
    }
}
