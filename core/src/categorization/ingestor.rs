use categorizer::prelude::*;
use tokio::time::Instant;

use super::baseline::Baseline;
use super::error::IngestError;
use super::metrics::ManagerMetrics;
use super::queue::BlockQueue;

/// Turns new-block broadcasts of one network into blocks on the block
/// queue. The first block it enqueues fixes the baseline.
pub struct SubscriptionIngestor<F> {
    network: Network,
    feed: F,
    queue: Arc<BlockQueue>,
    baseline: Arc<Baseline>,
    logger: Logger,
    metrics: Arc<ManagerMetrics>,
    poll_interval: Duration,
    idle_timeout: Duration,
    backoff: ExponentialBackoff,
    last_enqueued: Option<BlockNumber>,
}

impl<F: BroadcastFeed> SubscriptionIngestor<F> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        logger: &Logger,
        network: Network,
        feed: F,
        queue: Arc<BlockQueue>,
        baseline: Arc<Baseline>,
        metrics: Arc<ManagerMetrics>,
        poll_interval: Duration,
        idle_timeout: Duration,
    ) -> Self {
        SubscriptionIngestor {
            logger: logger.new(o!("component" => "SubscriptionIngestor")),
            network,
            feed,
            queue,
            baseline,
            metrics,
            poll_interval,
            idle_timeout,
            backoff: ExponentialBackoff::new(Duration::from_millis(100), idle_timeout),
            last_enqueued: None,
        }
    }

    pub async fn run(mut self) {
        info!(self.logger, "Subscribed to new block broadcasts";
            "network" => &self.network.id,
            "topic" => &self.network.id,
        );

        let mut last_message = Instant::now();
        loop {
            match self.feed.next_message(self.poll_interval).await {
                Ok(Some(message)) => {
                    self.backoff.reset();
                    last_message = Instant::now();
                    self.handle_message(&message).await;
                }
                Ok(None) => {
                    if last_message.elapsed() >= self.idle_timeout {
                        warn!(self.logger, "No block broadcast received, resubscribing";
                            "idle_secs" => last_message.elapsed().as_secs(),
                            "code" => LogCode::BlockIngestionLagging,
                        );
                        if let Err(e) = self.feed.resubscribe().await {
                            warn!(self.logger, "Failed to resubscribe"; "error" => e.to_string());
                        }
                        last_message = Instant::now();
                    }
                }
                Err(e) => {
                    warn!(self.logger, "Trying again after block broadcast feed failed";
                        "error" => e.to_string(),
                        "attempt" => self.backoff.attempt,
                    );
                    self.backoff.sleep_async().await;
                    if let Err(e) = self.feed.resubscribe().await {
                        debug!(self.logger, "Failed to resubscribe"; "error" => e.to_string());
                    }
                }
            }
        }
    }

    /// Parse one broadcast and enqueue its block. Returns whether a block
    /// was enqueued.
    pub async fn handle_message(&mut self, message: &str) -> bool {
        let block = match self.parse(message) {
            Ok(block) => block,
            Err(e) => {
                self.metrics.malformed_messages.inc();
                warn!(self.logger, "Discarding broadcast";
                    "error" => e.to_string(),
                    "code" => LogCode::MalformedMessage,
                );
                return false;
            }
        };

        if let Some(last) = self.last_enqueued {
            if block.number <= last {
                debug!(self.logger, "Discarding block that is not newer than the last one";
                    "block_number" => block.number,
                    "last_block_number" => last,
                );
                return false;
            }
        }

        let number = block.number;
        if self.baseline.set_once(number) {
            info!(self.logger, "Live feed starts at the baseline";
                "baseline" => number,
                "code" => LogCode::BlockIngestionStatus,
            );
        }
        self.last_enqueued = Some(number);
        self.queue.push(block).await;

        let depth = self.queue.len();
        if depth > self.queue.capacity() / 2 {
            warn!(self.logger, "Live dispatcher is falling behind";
                "block_number" => number,
                "queue_depth" => depth,
                "code" => LogCode::BlockIngestionLagging,
            );
        } else {
            debug!(self.logger, "Enqueued block";
                "block_number" => number,
                "queue_depth" => depth,
                "code" => LogCode::BlockIngestionStatus,
            );
        }
        true
    }

    fn parse(&self, message: &str) -> Result<Block, IngestError> {
        let broadcast = Broadcast::parse(message)?;
        if !broadcast.is_ok() {
            return Err(IngestError::Failed(broadcast.reply.message));
        }
        let payload = BlockBroadcast::from_parameters(&broadcast.reply.parameters)?;
        if payload.network_id != self.network.id {
            return Err(IngestError::WrongNetwork {
                expected: self.network.id.clone(),
                got: payload.network_id,
            });
        }
        Ok(payload.into_block())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use categorizer::env::QueueOverflow;
    use categorizer::log::discard;
    use categorizer::mock::block_frame;
    use tokio::sync::mpsc;

    fn ingestor(
        feed: mpsc::Receiver<String>,
    ) -> (SubscriptionIngestor<mpsc::Receiver<String>>, Arc<BlockQueue>) {
        let metrics = Arc::new(ManagerMetrics::mock());
        let queue = Arc::new(BlockQueue::new(
            &discard(),
            16,
            QueueOverflow::Block,
            metrics.clone(),
        ));
        let ingestor = SubscriptionIngestor::new(
            &discard(),
            Network::new("1"),
            feed,
            queue.clone(),
            Arc::new(Baseline::default()),
            metrics,
            Duration::from_millis(100),
            Duration::from_secs(1),
        );
        (ingestor, queue)
    }

    #[tokio::test]
    async fn first_block_sets_the_baseline() {
        let (_tx, rx) = mpsc::channel(4);
        let (mut ingestor, queue) = ingestor(rx);

        assert!(ingestor.handle_message(&block_frame("1", 150, vec![])).await);
        assert!(ingestor.handle_message(&block_frame("1", 151, vec![])).await);

        assert_eq!(ingestor.baseline.get(), Some(150));
        assert_eq!(queue.pop().await.number, 150);
        assert_eq!(queue.pop().await.number, 151);
    }

    #[tokio::test]
    async fn discards_blocks_that_are_not_newer() {
        let (_tx, rx) = mpsc::channel(4);
        let (mut ingestor, queue) = ingestor(rx);

        assert!(ingestor.handle_message(&block_frame("1", 150, vec![])).await);
        assert!(!ingestor.handle_message(&block_frame("1", 150, vec![])).await);
        assert!(!ingestor.handle_message(&block_frame("1", 149, vec![])).await);
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test]
    async fn malformed_and_foreign_broadcasts_are_skipped() {
        let (_tx, rx) = mpsc::channel(4);
        let (mut ingestor, queue) = ingestor(rx);

        assert!(!ingestor.handle_message("1 {not json").await);
        assert!(!ingestor.handle_message(&block_frame("56", 150, vec![])).await);
        let failed = Broadcast::new("1", Reply::fail("node is syncing"))
            .to_frame()
            .unwrap();
        assert!(!ingestor.handle_message(&failed).await);

        assert!(queue.is_empty());
        assert_eq!(ingestor.baseline.get(), None);
        assert_eq!(ingestor.metrics.malformed_messages.get(), 3.0);
    }

    #[tokio::test(start_paused = true)]
    async fn keeps_running_across_idle_periods() {
        let (tx, rx) = mpsc::channel(4);
        let (ingestor, queue) = ingestor(rx);
        let baseline = ingestor.baseline.clone();
        let handle = tokio::spawn(ingestor.run());

        tokio::time::sleep(Duration::from_secs(5)).await;
        tx.send(block_frame("1", 150, vec![])).await.unwrap();
        assert_eq!(queue.pop().await.number, 150);
        assert_eq!(baseline.get(), Some(150));

        handle.abort();
    }
}
