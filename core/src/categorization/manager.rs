use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};

use categorizer::prelude::*;
use itertools::Itertools;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::catchup::CatchUpEngine;
use super::config::ManagerConfig;
use super::dispatcher::LiveDispatcher;
use super::error::ManagerError;
use super::group::WorkerGroup;
use super::ingestor::SubscriptionIngestor;
use super::metrics::ManagerMetrics;
use super::publisher::ResultPublisher;
use super::queue::BlockQueue;
use super::state::{SharedState, WorkerGroups};
use super::worker::Worker;

/// Where `Manager::register_workers` put a batch of workers.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Placement {
    /// Straight to the live population.
    Live,
    /// Into the catch-up group created at `start_block`.
    CatchUp {
        start_block: BlockNumber,
        new_group: bool,
    },
}

#[derive(Default)]
struct Tasks {
    ingestor: Option<JoinHandle<()>>,
    dispatcher: Option<JoinHandle<()>>,
    engines: Vec<JoinHandle<usize>>,
}

/// Keeps the smartcontracts of one network categorized. Owns the block
/// queue, the live workers and the worker groups that are still catching
/// up, and runs the tasks that move workers between them.
pub struct Manager {
    network: Network,
    logger: Logger,
    config: ManagerConfig,
    state: Arc<SharedState>,
    queue: Arc<BlockQueue>,
    source: Arc<dyn HistoricalLogSource>,
    publisher: Arc<ResultPublisher>,
    decoders: Option<Arc<dyn DecoderFactory>>,
    metrics: Arc<ManagerMetrics>,
    tasks: Mutex<Tasks>,
    started: AtomicBool,
    stopped: AtomicBool,
}

impl Manager {
    pub fn new(
        logger: &Logger,
        network: Network,
        config: ManagerConfig,
        source: Arc<dyn HistoricalLogSource>,
        sink: Arc<dyn ResultSink>,
        registry: &MetricsRegistry,
    ) -> Self {
        let logger = logger.new(o!("network" => network.id.clone()));
        let metrics = Arc::new(ManagerMetrics::new(registry, &network.id));
        let queue = Arc::new(BlockQueue::new(
            &logger,
            config.block_queue_capacity,
            config.block_queue_overflow,
            metrics.clone(),
        ));
        let publisher = Arc::new(ResultPublisher::new(&logger, sink, metrics.clone()));

        Manager {
            network,
            logger,
            config,
            state: Arc::new(SharedState::new(metrics.clone())),
            queue,
            source,
            publisher,
            decoders: None,
            metrics,
            tasks: Mutex::new(Tasks::default()),
            started: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
        }
    }

    /// Builds the decoders of smartcontracts registered through
    /// `handle_request`.
    pub fn with_decoder_factory(mut self, decoders: Arc<dyn DecoderFactory>) -> Self {
        self.decoders = Some(decoders);
        self
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    /// Start ingesting blocks from `feed` and dispatching them. Returns the
    /// baseline once the first block arrived.
    pub async fn start<F: BroadcastFeed>(&self, feed: F) -> Result<BlockNumber, ManagerError> {
        self.ensure_running()?;
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(ManagerError::AlreadyStarted);
        }

        let ingestor = SubscriptionIngestor::new(
            &self.logger,
            self.network.clone(),
            feed,
            self.queue.clone(),
            self.state.baseline.clone(),
            self.metrics.clone(),
            self.config.feed_poll_interval,
            self.config.feed_idle_timeout,
        );
        let dispatcher = LiveDispatcher::new(
            &self.logger,
            self.queue.clone(),
            self.state.clone(),
            self.publisher.clone(),
        );
        {
            let mut tasks = self.tasks.lock();
            tasks.dispatcher = Some(categorizer::spawn(dispatcher.run()));
            tasks.ingestor = Some(categorizer::spawn(ingestor.run()));
        }

        let baseline = self.state.baseline.wait().await;
        info!(self.logger, "Categorizer is running"; "baseline" => baseline);
        Ok(baseline)
    }

    pub fn baseline(&self) -> Option<BlockNumber> {
        self.state.baseline.get()
    }

    /// Register `workers` that have to see every log from `start_block`
    /// on. Waits for the baseline. Workers starting at or after the live
    /// frontier go live right away, the others catch up in a worker group.
    pub async fn register_workers(
        &self,
        start_block: BlockNumber,
        workers: Vec<Worker>,
    ) -> Result<Placement, ManagerError> {
        if workers.is_empty() {
            return Err(ManagerError::InvalidRegistration(
                "no smartcontracts to register".to_string(),
            ));
        }
        self.check_network(&workers)?;
        self.ensure_running()?;

        let baseline = self.state.baseline.wait().await;

        let mut groups = self.state.groups.lock();
        self.ensure_running()?;
        self.check_not_registered(&groups, &workers)?;
        Ok(self.place(&mut groups, baseline, start_block, workers))
    }

    /// Register workers that each start right after their smartcontract's
    /// watermark. Workers with the same start block are registered
    /// together, earliest first. Either all of them are registered or, if
    /// any of them is rejected, none.
    pub async fn register_smartcontracts(
        &self,
        workers: Vec<Worker>,
    ) -> Result<Vec<Placement>, ManagerError> {
        if workers.is_empty() {
            return Ok(vec![]);
        }
        self.check_network(&workers)?;
        if let Some(worker) = workers
            .iter()
            .find(|worker| worker.next_block_number().is_none())
        {
            return Err(ManagerError::InvalidRegistration(format!(
                "smartcontract {} is categorized up to the last block {}",
                worker.address(),
                worker.categorized_block_number()
            )));
        }
        self.ensure_running()?;

        let baseline = self.state.baseline.wait().await;

        let mut groups = self.state.groups.lock();
        self.ensure_running()?;
        self.check_not_registered(&groups, &workers)?;

        let batches = workers
            .into_iter()
            .into_group_map_by(|worker| worker.next_block_number().unwrap_or(BlockNumber::MAX))
            .into_iter()
            .sorted_by_key(|(start_block, _)| *start_block);
        Ok(batches
            .map(|(start_block, workers)| self.place(&mut groups, baseline, start_block, workers))
            .collect())
    }

    /// Put checked workers live, into an existing worker group or into a
    /// new one. Runs under the `groups` lock.
    fn place(
        &self,
        groups: &mut WorkerGroups,
        baseline: BlockNumber,
        start_block: BlockNumber,
        workers: Vec<Worker>,
    ) -> Placement {
        let count = workers.len();
        {
            let mut live = self.state.live.lock();
            if start_block >= live.frontier(baseline) {
                live.workers.extend(workers);
                self.metrics.live_workers.set(live.workers.len() as f64);
                info!(self.logger, "Registered live workers";
                    "start_block" => start_block,
                    "workers" => count,
                );
                return Placement::Live;
            }
        }

        let workers = match groups.best_for(start_block) {
            Some(group) => match group.join(start_block, workers) {
                Ok(group_start) => {
                    info!(self.logger, "Workers joined a catch-up group";
                        "start_block" => start_block,
                        "group_start_block" => group_start,
                        "workers" => count,
                    );
                    return Placement::CatchUp {
                        start_block: group_start,
                        new_group: false,
                    };
                }
                Err(workers) => workers,
            },
            None => workers,
        };

        let group = Arc::new(WorkerGroup::new(start_block, workers));
        groups.insert(group.clone());
        self.metrics.worker_groups.set(groups.len() as f64);

        let engine = CatchUpEngine::new(
            &self.logger,
            group,
            self.state.clone(),
            self.source.clone(),
            self.publisher.clone(),
            &self.config,
        );
        let mut tasks = self.tasks.lock();
        tasks.engines.retain(|engine| !engine.is_finished());
        tasks.engines.push(categorizer::spawn(engine.run()));

        info!(self.logger, "Started catching up";
            "start_block" => start_block,
            "baseline" => baseline,
            "workers" => count,
        );
        Placement::CatchUp {
            start_block,
            new_group: true,
        }
    }

    fn check_network(&self, workers: &[Worker]) -> Result<(), ManagerError> {
        match workers
            .iter()
            .find(|worker| worker.smartcontract().network_id != self.network.id)
        {
            Some(worker) => Err(ManagerError::InvalidRegistration(format!(
                "smartcontract {} is on network `{}`, not `{}`",
                worker.address(),
                worker.smartcontract().network_id,
                self.network.id
            ))),
            None => Ok(()),
        }
    }

    /// Reject addresses the manager already tracks and addresses that occur
    /// twice in `workers`. Addresses compare case-insensitively.
    fn check_not_registered(
        &self,
        groups: &WorkerGroups,
        workers: &[Worker],
    ) -> Result<(), ManagerError> {
        let mut known: HashSet<String> = groups
            .iter()
            .flat_map(|group| group.smartcontracts())
            .map(|smartcontract| smartcontract.address.to_lowercase())
            .collect();
        known.extend(
            self.state
                .live
                .lock()
                .workers
                .iter()
                .map(|worker| worker.address().to_lowercase()),
        );

        for worker in workers {
            if !known.insert(worker.address().to_lowercase()) {
                return Err(ManagerError::AlreadyRegistered(worker.address().to_string()));
            }
        }
        Ok(())
    }

    /// Answer a `register_smartcontracts` request.
    pub async fn handle_request(&self, request: Request) -> Reply {
        match self.register_from_request(request).await {
            Ok(registered) => Reply::ok(Parameters::new().set("registered", registered)),
            Err(e) => {
                warn!(self.logger, "Rejected registration"; "error" => e.to_string());
                Reply::fail(e.to_string())
            }
        }
    }

    async fn register_from_request(&self, request: Request) -> Result<usize, ManagerError> {
        let (smartcontracts, abis) = match Command::try_from(request)? {
            Command::RegisterSmartcontracts {
                smartcontracts,
                abis,
            } => (smartcontracts, abis),
            other => {
                return Err(ManagerError::InvalidRegistration(format!(
                    "unsupported command `{}`",
                    other.name()
                )))
            }
        };
        if smartcontracts.len() != abis.len() {
            return Err(ManagerError::InvalidRegistration(format!(
                "{} smartcontracts but {} abis",
                smartcontracts.len(),
                abis.len()
            )));
        }
        let decoders = self.decoders.as_ref().ok_or_else(|| {
            ManagerError::InvalidRegistration("no decoder factory configured".to_string())
        })?;

        let workers = smartcontracts
            .into_iter()
            .zip(abis.iter())
            .map(|(smartcontract, abi)| {
                decoders
                    .decoder(abi)
                    .map(|decoder| Worker::new(smartcontract, decoder))
                    .map_err(ManagerError::Decoder)
            })
            .collect::<Result<Vec<_>, _>>()?;

        let registered = workers.len();
        self.register_smartcontracts(workers).await?;
        Ok(registered)
    }

    /// Handle registration requests until `requests` is closed or the
    /// manager is stopped.
    pub async fn serve_registrations(&self, mut requests: mpsc::Receiver<Request>) {
        while let Some(request) = requests.recv().await {
            if self.stopped.load(Ordering::SeqCst) {
                break;
            }
            let reply = self.handle_request(request).await;
            debug!(self.logger, "Handled registration";
                "ok" => reply.is_ok(),
                "message" => &reply.message,
            );
        }
    }

    /// Every smartcontract the manager tracks, live or catching up.
    pub fn smartcontracts(&self) -> Vec<Smartcontract> {
        self.state.smartcontracts()
    }

    pub fn smartcontract_addresses(&self) -> Vec<String> {
        self.smartcontracts()
            .into_iter()
            .map(|smartcontract| smartcontract.address)
            .collect()
    }

    pub fn live_worker_count(&self) -> usize {
        self.state.live.lock().workers.len()
    }

    /// The cursors of the groups still catching up, lowest first.
    pub fn group_cursors(&self) -> Vec<BlockNumber> {
        self.state
            .groups
            .lock()
            .iter()
            .map(|group| group.cursor())
            .sorted()
            .collect()
    }

    /// Stop ingesting, let the dispatcher drain the block queue, then stop
    /// the dispatcher and every catch-up engine.
    pub async fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        let tasks = {
            // Registrations check `stopped` under this lock
            let _groups = self.state.groups.lock();
            std::mem::take(&mut *self.tasks.lock())
        };

        if let Some(ingestor) = tasks.ingestor {
            ingestor.abort();
            ingestor.await.ok();
        }
        if let Some(dispatcher) = tasks.dispatcher {
            self.queue.wait_empty().await;
            dispatcher.abort();
            dispatcher.await.ok();
        }
        for engine in tasks.engines.iter() {
            engine.abort();
        }
        futures03::future::join_all(tasks.engines).await;

        info!(self.logger, "Categorizer stopped";
            "live_workers" => self.live_worker_count(),
            "worker_groups" => self.state.groups.lock().len(),
        );
    }

    fn ensure_running(&self) -> Result<(), ManagerError> {
        if self.stopped.load(Ordering::SeqCst) {
            return Err(ManagerError::Stopped);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use categorizer::log::discard;
    use categorizer::mock::{MockDecoderFactory, MockLogSource, RecordingSink};
    use serde_json::json;

    fn manager() -> Manager {
        Manager::new(
            &discard(),
            Network::new("1"),
            ManagerConfig::default(),
            MockLogSource::new(vec![]),
            RecordingSink::new(),
            &MetricsRegistry::mock(),
        )
        .with_decoder_factory(Arc::new(MockDecoderFactory))
    }

    fn register_request(smartcontracts: serde_json::Value, abis: serde_json::Value) -> Request {
        Request::new(
            Command::REGISTER_SMARTCONTRACTS,
            Parameters::new()
                .set("smartcontracts", smartcontracts)
                .set("abis", abis),
        )
    }

    #[tokio::test]
    async fn registers_from_a_request() {
        let manager = manager();
        manager.state.baseline.set_once(150);

        let reply = manager
            .handle_request(register_request(
                json!([
                    {"network_id": "1", "address": "0xa", "categorized_block_number": 200},
                    {"network_id": "1", "address": "0xb", "categorized_block_number": 300}
                ]),
                json!([{}, {}]),
            ))
            .await;

        assert!(reply.is_ok(), "{:?}", reply);
        assert_eq!(reply.parameters.get("registered"), Some(&json!(2)));
        assert_eq!(manager.live_worker_count(), 2);
    }

    #[tokio::test]
    async fn rejects_mismatched_abis() {
        let manager = manager();
        let reply = manager
            .handle_request(register_request(
                json!([{"network_id": "1", "address": "0xa", "categorized_block_number": 200}]),
                json!([]),
            ))
            .await;
        assert!(!reply.is_ok());
        assert_eq!(manager.smartcontracts(), vec![]);
    }

    #[tokio::test]
    async fn rejects_bad_abis_and_foreign_networks() {
        let manager = manager();
        manager.state.baseline.set_once(150);

        let reply = manager
            .handle_request(register_request(
                json!([{"network_id": "1", "address": "0xa", "categorized_block_number": 200}]),
                json!(["not an abi"]),
            ))
            .await;
        assert!(!reply.is_ok());

        let reply = manager
            .handle_request(register_request(
                json!([{"network_id": "56", "address": "0xa", "categorized_block_number": 200}]),
                json!([{}]),
            ))
            .await;
        assert!(!reply.is_ok());
        assert_eq!(manager.smartcontracts(), vec![]);
    }

    #[tokio::test]
    async fn a_rejected_request_registers_nothing() {
        let manager = manager();
        manager.state.baseline.set_once(150);

        let reply = manager
            .handle_request(register_request(
                json!([
                    {"network_id": "1", "address": "0xa", "categorized_block_number": 99},
                    {"network_id": "1", "address": "0xA", "categorized_block_number": 200}
                ]),
                json!([{}, {}]),
            ))
            .await;

        assert!(!reply.is_ok());
        assert_eq!(reply.message, "smartcontract 0xA is already registered");
        assert_eq!(manager.smartcontracts(), vec![]);
        assert!(manager.group_cursors().is_empty());
        assert_eq!(manager.live_worker_count(), 0);
    }

    #[tokio::test]
    async fn rejects_a_watermark_at_the_last_block() {
        let manager = manager();
        manager.state.baseline.set_once(150);

        let reply = manager
            .handle_request(register_request(
                json!([
                    {"network_id": "1", "address": "0xa", "categorized_block_number": 99},
                    {"network_id": "1", "address": "0xb", "categorized_block_number": u64::MAX}
                ]),
                json!([{}, {}]),
            ))
            .await;

        assert!(!reply.is_ok());
        assert!(reply.message.contains("0xb"), "{}", reply.message);
        assert_eq!(manager.smartcontracts(), vec![]);
    }

    #[tokio::test]
    async fn rejects_unknown_commands() {
        let manager = manager();
        let reply = manager
            .handle_request(Request::new("categorize_everything", Parameters::new()))
            .await;
        assert!(!reply.is_ok());
    }

    #[tokio::test]
    async fn rejects_duplicate_addresses() {
        let manager = manager();
        manager.state.baseline.set_once(150);
        let worker = |address: &str| {
            Worker::new(
                Smartcontract::new("1", address, 199),
                Arc::new(categorizer::mock::MockDecoder::default()),
            )
        };

        manager
            .register_workers(200, vec![worker("0xAbC")])
            .await
            .unwrap();
        let err = manager
            .register_workers(300, vec![worker("0xabc")])
            .await
            .unwrap_err();
        assert!(matches!(err, ManagerError::AlreadyRegistered(_)));
    }

    #[tokio::test]
    async fn refuses_work_once_stopped() {
        let manager = manager();
        manager.stop().await;
        let err = manager
            .register_workers(
                200,
                vec![Worker::new(
                    Smartcontract::new("1", "0xa", 199),
                    Arc::new(categorizer::mock::MockDecoder::default()),
                )],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ManagerError::Stopped));
    }
}
