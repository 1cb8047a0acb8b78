use categorizer::prelude::*;
use parking_lot::Mutex;

use super::baseline::Baseline;
use super::group::WorkerGroup;
use super::metrics::ManagerMetrics;
use super::worker::Worker;

/// The workers fed by the live dispatcher.
#[derive(Default)]
pub(crate) struct LivePopulation {
    pub workers: Vec<Worker>,
    /// The last block the dispatcher handed to the live workers.
    pub dispatched_through: Option<BlockNumber>,
}

impl LivePopulation {
    /// The first block the live workers have not been offered yet.
    pub fn frontier(&self, baseline: BlockNumber) -> BlockNumber {
        match self.dispatched_through {
            Some(number) => baseline.max(number.saturating_add(1)),
            None => baseline,
        }
    }
}

#[derive(Default)]
pub(crate) struct WorkerGroups {
    groups: Vec<Arc<WorkerGroup>>,
}

impl WorkerGroups {
    /// The group a worker starting at `start_block` should join: the one
    /// created at the largest cursor not past `start_block`.
    pub fn best_for(&self, start_block: BlockNumber) -> Option<Arc<WorkerGroup>> {
        self.groups
            .iter()
            .filter(|group| !group.is_promoted())
            .filter(|group| group.start_block() <= start_block)
            .max_by_key(|group| group.start_block())
            .cloned()
    }

    pub fn insert(&mut self, group: Arc<WorkerGroup>) {
        self.groups.push(group);
    }

    pub fn remove(&mut self, group: &Arc<WorkerGroup>) {
        self.groups.retain(|other| !Arc::ptr_eq(other, group));
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<WorkerGroup>> {
        self.groups.iter()
    }
}

/// State shared by the manager, the live dispatcher and the catch-up
/// engines. Locks are always taken in the order `groups`, `live`, a
/// group's own lock.
pub(crate) struct SharedState {
    pub baseline: Arc<Baseline>,
    pub live: Mutex<LivePopulation>,
    pub groups: Mutex<WorkerGroups>,
    pub metrics: Arc<ManagerMetrics>,
}

impl SharedState {
    pub fn new(metrics: Arc<ManagerMetrics>) -> Self {
        SharedState {
            baseline: Arc::new(Baseline::default()),
            live: Mutex::new(LivePopulation::default()),
            groups: Mutex::new(WorkerGroups::default()),
            metrics,
        }
    }

    /// `None` until the baseline is known.
    pub fn live_frontier(&self) -> Option<BlockNumber> {
        let baseline = self.baseline.get()?;
        Some(self.live.lock().frontier(baseline))
    }

    /// Move the members of `group` to the live population if the group
    /// caught up with the live frontier. Returns the number of promoted
    /// workers.
    pub fn try_promote(&self, group: &Arc<WorkerGroup>) -> Option<usize> {
        let baseline = self.baseline.get()?;
        let mut groups = self.groups.lock();
        let mut live = self.live.lock();
        let workers = group.take_for_promotion(live.frontier(baseline))?;

        let promoted = workers.len();
        groups.remove(group);
        live.workers.extend(workers);

        self.metrics.live_workers.set(live.workers.len() as f64);
        self.metrics.worker_groups.set(groups.len() as f64);
        Some(promoted)
    }

    pub fn smartcontracts(&self) -> Vec<Smartcontract> {
        let groups = self.groups.lock();
        let mut smartcontracts: Vec<Smartcontract> =
            groups.iter().flat_map(|group| group.smartcontracts()).collect();
        let live = self.live.lock();
        smartcontracts.extend(live.workers.iter().map(|worker| worker.smartcontract().clone()));
        smartcontracts
    }
}
