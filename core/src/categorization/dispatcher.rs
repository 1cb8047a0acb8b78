use categorizer::prelude::*;

use super::publisher::ResultPublisher;
use super::queue::BlockQueue;
use super::state::SharedState;

/// Drains the block queue and offers every block to the live workers.
pub struct LiveDispatcher {
    queue: Arc<BlockQueue>,
    state: Arc<SharedState>,
    publisher: Arc<ResultPublisher>,
    logger: Logger,
}

impl LiveDispatcher {
    pub(crate) fn new(
        logger: &Logger,
        queue: Arc<BlockQueue>,
        state: Arc<SharedState>,
        publisher: Arc<ResultPublisher>,
    ) -> Self {
        LiveDispatcher {
            queue,
            state,
            publisher,
            logger: logger.new(o!("component" => "LiveDispatcher")),
        }
    }

    pub async fn run(self) {
        debug!(self.logger, "Starting live dispatcher");
        loop {
            let block = self.queue.pop().await;
            self.dispatch(&block);
        }
    }

    /// Apply the logs of `block` to every live worker that has not seen
    /// the block yet. Returns the number of workers that got logs.
    pub fn dispatch(&self, block: &Block) -> usize {
        let results = {
            let mut live = self.state.live.lock();
            let mut results = vec![];
            for worker in live.workers.iter_mut() {
                if block.number <= worker.categorized_block_number() {
                    continue;
                }
                let logs = block.logs_for(worker.address());
                if logs.is_empty() {
                    continue;
                }
                match worker.categorize(&self.logger, logs) {
                    Ok(Some(categorized)) => results.push(categorized),
                    Ok(None) => {}
                    Err(e) => error!(self.logger, "Failed to categorize block logs";
                        "block_number" => block.number,
                        "error" => e.to_string(),
                    ),
                }
            }
            live.dispatched_through = Some(
                live.dispatched_through
                    .map_or(block.number, |number| number.max(block.number)),
            );
            results
        };
        self.state.metrics.live_block_number.set(block.number as f64);

        let applied = results.len();
        for categorized in results {
            // Failures are logged and counted by the publisher
            self.publisher.publish(categorized).ok();
        }
        trace!(self.logger, "Dispatched block";
            "block_number" => block.number,
            "logs" => block.logs.len(),
            "workers" => applied,
        );
        applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::categorization::metrics::ManagerMetrics;
    use crate::categorization::worker::Worker;
    use categorizer::env::QueueOverflow;
    use categorizer::log::discard;
    use categorizer::mock::{MockDecoder, RecordingSink};

    fn dispatcher(sink: Arc<RecordingSink>) -> LiveDispatcher {
        let metrics = Arc::new(ManagerMetrics::mock());
        let queue = Arc::new(BlockQueue::new(
            &discard(),
            10,
            QueueOverflow::Block,
            metrics.clone(),
        ));
        let state = Arc::new(SharedState::new(metrics.clone()));
        state.baseline.set_once(150);
        let publisher = Arc::new(ResultPublisher::new(&discard(), sink, metrics));
        LiveDispatcher::new(&discard(), queue, state, publisher)
    }

    fn add_worker(dispatcher: &LiveDispatcher, address: &str, watermark: BlockNumber) {
        dispatcher.state.live.lock().workers.push(Worker::new(
            Smartcontract::new("1", address, watermark),
            Arc::new(MockDecoder::default()),
        ));
    }

    #[test]
    fn offers_each_worker_its_own_logs() {
        let sink = RecordingSink::new();
        let dispatcher = dispatcher(sink.clone());
        add_worker(&dispatcher, "0xa", 149);
        add_worker(&dispatcher, "0xb", 149);
        add_worker(&dispatcher, "0xc", 149);

        let block = Block::new(
            "1".into(),
            150,
            0,
            vec![LogEntry::new("0xa", 150), LogEntry::new("0xb", 150)],
        );
        assert_eq!(dispatcher.dispatch(&block), 2);
        assert_eq!(
            sink.categorized(),
            vec![
                ("0xa".to_string(), vec![150]),
                ("0xb".to_string(), vec![150])
            ]
        );
        assert_eq!(dispatcher.state.live_frontier(), Some(151));
    }

    #[test]
    fn blocks_at_or_below_the_watermark_are_skipped() {
        let sink = RecordingSink::new();
        let dispatcher = dispatcher(sink.clone());
        add_worker(&dispatcher, "0xa", 160);

        let block = Block::new("1".into(), 155, 0, vec![LogEntry::new("0xa", 155)]);
        assert_eq!(dispatcher.dispatch(&block), 0);
        assert!(sink.requests().is_empty());
    }

    #[tokio::test]
    async fn run_drains_the_queue() {
        let sink = RecordingSink::new();
        let dispatcher = dispatcher(sink.clone());
        add_worker(&dispatcher, "0xa", 149);
        let queue = dispatcher.queue.clone();

        let handle = tokio::spawn(dispatcher.run());
        for number in 150..153 {
            queue
                .push(Block::new("1".into(), number, 0, vec![LogEntry::new("0xa", number)]))
                .await;
        }
        queue.wait_empty().await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        handle.abort();

        assert_eq!(sink.categorized().len(), 3);
    }
}
