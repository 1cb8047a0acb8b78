use categorizer::prelude::*;

use super::config::ManagerConfig;
use super::group::{Round, WorkerGroup};
use super::publisher::ResultPublisher;
use super::state::SharedState;

/// Walks one worker group from its cursor up to the live frontier with
/// `log_filter` requests, then hands the group's workers to the live
/// dispatcher.
pub struct CatchUpEngine {
    group: Arc<WorkerGroup>,
    state: Arc<SharedState>,
    source: Arc<dyn HistoricalLogSource>,
    publisher: Arc<ResultPublisher>,
    logger: Logger,
    backoff: ExponentialBackoff,
    page_size: Option<u64>,
}

impl CatchUpEngine {
    pub(crate) fn new(
        logger: &Logger,
        group: Arc<WorkerGroup>,
        state: Arc<SharedState>,
        source: Arc<dyn HistoricalLogSource>,
        publisher: Arc<ResultPublisher>,
        config: &ManagerConfig,
    ) -> Self {
        CatchUpEngine {
            logger: logger.new(o!("component" => "CatchUp", "start_block" => group.cursor())),
            group,
            state,
            source,
            publisher,
            backoff: ExponentialBackoff::new(
                config.catchup_backoff_base,
                config.catchup_backoff_ceil,
            ),
            page_size: config.log_filter_page_size,
        }
    }

    /// Runs until the group is promoted. Returns the number of promoted
    /// workers.
    pub async fn run(mut self) -> usize {
        let baseline = self.state.baseline.wait().await;
        debug!(self.logger, "Catching up"; "baseline" => baseline);

        loop {
            if let Some(promoted) = self.state.try_promote(&self.group) {
                info!(self.logger, "Caught up, workers are live";
                    "workers" => promoted,
                    "code" => LogCode::CatchUpPromoted,
                );
                return promoted;
            }

            let frontier = self.state.live_frontier().unwrap_or(baseline);
            let round = self.group.begin_round();
            if round.cursor >= frontier {
                // Members admitted just now; promote on the next pass
                tokio::task::yield_now().await;
                continue;
            }
            self.catch_up(round, frontier).await;
            // A source that answers at once never suspends this loop
            tokio::task::yield_now().await;
        }
    }

    async fn catch_up(&mut self, round: Round, frontier: BlockNumber) {
        let mut to_block = frontier - 1;
        if let Some(page_size) = self.page_size {
            to_block = to_block.min(round.cursor.saturating_add(page_size.max(1) - 1));
        }

        let result = fetch_logs(
            self.source.as_ref(),
            round.addresses.clone(),
            round.cursor,
            Some(to_block),
        )
        .await;

        let result = match result {
            Ok(result) => result,
            Err(e) => {
                self.state.metrics.catchup_fetch_failures.inc();
                warn!(self.logger, "Trying again after fetching historical logs failed";
                    "from_block" => round.cursor,
                    "to_block" => to_block,
                    "error" => e.to_string(),
                    "attempt" => self.backoff.attempt,
                );
                self.backoff.sleep_async().await;
                return;
            }
        };

        let scanned_to = match result.to_block {
            Some(reported) if reported < round.cursor => {
                self.state.metrics.catchup_fetch_failures.inc();
                warn!(self.logger, "Log source scanned nothing, trying again";
                    "from_block" => round.cursor,
                    "reported_to_block" => reported,
                );
                self.backoff.sleep_async().await;
                return;
            }
            Some(reported) => reported.min(to_block),
            None => to_block,
        };
        self.backoff.reset();

        let logs = result.logs.len();
        let results = self
            .group
            .complete_round(&self.logger, &round, result.logs, scanned_to);
        debug!(self.logger, "Applied historical logs";
            "from_block" => round.cursor,
            "to_block" => scanned_to,
            "frontier" => frontier,
            "logs" => logs,
            "workers" => results.len(),
            "code" => LogCode::CatchUpStatus,
        );
        for categorized in results {
            self.publisher.publish(categorized).ok();
        }
    }
}
