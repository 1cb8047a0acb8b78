use categorizer::env::QueueOverflow;
use categorizer::prelude::*;

use super::metrics::ManagerMetrics;

/// The FIFO between the subscription ingestor and the live dispatcher.
/// What happens when it is full depends on the overflow policy.
pub struct BlockQueue {
    queue: BoundedQueue<Block>,
    overflow: QueueOverflow,
    logger: Logger,
    metrics: Arc<ManagerMetrics>,
}

impl BlockQueue {
    pub fn new(
        logger: &Logger,
        capacity: usize,
        overflow: QueueOverflow,
        metrics: Arc<ManagerMetrics>,
    ) -> Self {
        BlockQueue {
            queue: BoundedQueue::with_capacity(capacity),
            overflow,
            logger: logger.new(o!("component" => "BlockQueue")),
            metrics,
        }
    }

    pub async fn push(&self, block: Block) {
        match self.overflow {
            QueueOverflow::Block => self.queue.push(block).await,
            QueueOverflow::DropOldest => {
                if let Some(evicted) = self.queue.push_evicting(block).await {
                    self.metrics.dropped_blocks.inc();
                    warn!(self.logger, "Block queue is full, dropped the oldest block";
                        "block_number" => evicted.number,
                        "capacity" => self.queue.capacity(),
                    );
                }
            }
        }
        self.metrics.block_queue_depth.set(self.queue.len() as f64);
    }

    /// Take the oldest block, waiting while the queue is empty.
    pub async fn pop(&self) -> Block {
        let block = self.queue.pop().await;
        self.metrics.block_queue_depth.set(self.queue.len() as f64);
        block
    }

    pub async fn wait_empty(&self) {
        self.queue.wait_empty().await
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.queue.capacity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use categorizer::log::discard;

    fn block(number: BlockNumber) -> Block {
        Block::new("1".into(), number, number, vec![])
    }

    #[tokio::test]
    async fn drop_oldest_evicts_and_counts() {
        let metrics = Arc::new(ManagerMetrics::mock());
        let queue = BlockQueue::new(&discard(), 2, QueueOverflow::DropOldest, metrics.clone());

        for number in 1..=3 {
            queue.push(block(number)).await;
        }

        assert_eq!(metrics.dropped_blocks.get(), 1.0);
        assert_eq!(metrics.block_queue_depth.get(), 2.0);
        assert_eq!(queue.pop().await.number, 2);
        assert_eq!(queue.pop().await.number, 3);
        assert_eq!(metrics.block_queue_depth.get(), 0.0);
    }

    #[tokio::test]
    async fn block_policy_keeps_every_block() {
        let metrics = Arc::new(ManagerMetrics::mock());
        let queue = Arc::new(BlockQueue::new(
            &discard(),
            1,
            QueueOverflow::Block,
            metrics.clone(),
        ));
        queue.push(block(1)).await;

        let producer = {
            let queue = queue.clone();
            tokio::spawn(async move { queue.push(block(2)).await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!producer.is_finished());

        assert_eq!(queue.pop().await.number, 1);
        producer.await.unwrap();
        assert_eq!(queue.pop().await.number, 2);
        assert_eq!(metrics.dropped_blocks.get(), 0.0);
    }
}
