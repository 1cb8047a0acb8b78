use categorizer::blockchain::filter_by_address;
use categorizer::prelude::*;
use parking_lot::Mutex;

use super::worker::{decode_logs, Categorized, Worker};

/// Workers catching up on history together. All members share one cursor,
/// the next block the group's catch-up engine fetches logs from. The group
/// is keyed by `start_block`, its cursor when it was created.
pub struct WorkerGroup {
    start_block: BlockNumber,
    state: Mutex<GroupState>,
}

struct GroupState {
    cursor: BlockNumber,
    workers: Vec<Worker>,
    /// Workers that joined since the current round started, with their
    /// start blocks. They take part from the next round on.
    joined: Vec<(BlockNumber, Worker)>,
    promoted: bool,
}

/// What one catch-up round asks the historical log source for.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Round {
    pub cursor: BlockNumber,
    pub addresses: Vec<String>,
}

impl Debug for WorkerGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("WorkerGroup")
            .field("start_block", &self.start_block)
            .field("cursor", &state.cursor)
            .field("workers", &state.workers.len())
            .field("joined", &state.joined.len())
            .field("promoted", &state.promoted)
            .finish()
    }
}

impl WorkerGroup {
    pub fn new(start_block: BlockNumber, workers: Vec<Worker>) -> Self {
        WorkerGroup {
            start_block,
            state: Mutex::new(GroupState {
                cursor: start_block,
                workers,
                joined: vec![],
                promoted: false,
            }),
        }
    }

    pub fn start_block(&self) -> BlockNumber {
        self.start_block
    }

    pub fn cursor(&self) -> BlockNumber {
        self.state.lock().cursor
    }

    pub fn is_promoted(&self) -> bool {
        self.state.lock().promoted
    }

    /// Number of members, including those waiting for the next round.
    pub fn len(&self) -> usize {
        let state = self.state.lock();
        state.workers.len() + state.joined.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn smartcontracts(&self) -> Vec<Smartcontract> {
        let state = self.state.lock();
        state
            .workers
            .iter()
            .chain(state.joined.iter().map(|(_, worker)| worker))
            .map(|worker| worker.smartcontract().clone())
            .collect()
    }

    /// Add `workers` that have to see every log from `start_block` on.
    /// They are handed back if the group was created past `start_block` or
    /// has been promoted. A group whose cursor has moved past `start_block`
    /// rewinds to it before its next fetch. On success, returns the group's
    /// start block.
    pub(crate) fn join(
        &self,
        start_block: BlockNumber,
        workers: Vec<Worker>,
    ) -> Result<BlockNumber, Vec<Worker>> {
        let mut state = self.state.lock();
        if state.promoted || self.start_block > start_block {
            return Err(workers);
        }
        state
            .joined
            .extend(workers.into_iter().map(|worker| (start_block, worker)));
        Ok(self.start_block)
    }

    /// Admit the members that joined since the last round and describe the
    /// next fetch.
    pub(crate) fn begin_round(&self) -> Round {
        let mut state = self.state.lock();
        let joined = std::mem::take(&mut state.joined);
        if let Some(start) = joined.iter().map(|(start, _)| *start).min() {
            state.cursor = state.cursor.min(start);
        }
        state
            .workers
            .extend(joined.into_iter().map(|(_, worker)| worker));
        Round {
            cursor: state.cursor,
            addresses: state
                .workers
                .iter()
                .map(|worker| worker.address().to_string())
                .collect(),
        }
    }

    /// Apply the logs of the blocks `round.cursor..=scanned_to` and move the
    /// cursor past them. Members that joined meanwhile pull the cursor back
    /// to their start block; the watermarks keep the others from seeing a
    /// log twice.
    ///
    /// Decoding runs without the group's lock. Only the group's own engine
    /// changes `workers`, so the members are the same before and after.
    pub(crate) fn complete_round(
        &self,
        logger: &Logger,
        round: &Round,
        logs: Vec<LogEntry>,
        scanned_to: BlockNumber,
    ) -> Vec<Categorized> {
        let logs: Vec<LogEntry> = logs
            .into_iter()
            .filter(|log| log.block_number >= round.cursor && log.block_number <= scanned_to)
            .collect();

        let mut pending = vec![];
        {
            let state = self.state.lock();
            for worker in state.workers.iter() {
                let logs = filter_by_address(&logs, worker.address());
                if logs.is_empty() {
                    continue;
                }
                match worker.pending(logs) {
                    Ok(logs) if logs.is_empty() => {}
                    Ok(logs) => pending.push((
                        worker.address().to_string(),
                        worker.decoder().clone(),
                        logs,
                    )),
                    Err(e) => error!(logger, "Failed to categorize historical logs";
                        "error" => e.to_string()),
                }
            }
        }

        let decoded: Vec<(String, Vec<LogEntry>, usize)> = pending
            .into_iter()
            .map(|(address, decoder, mut logs)| {
                let failures = decode_logs(decoder.as_ref(), logger, &mut logs);
                (address, logs, failures)
            })
            .collect();

        let mut state = self.state.lock();
        let mut results = vec![];
        for (address, logs, failures) in decoded {
            let worker = state
                .workers
                .iter_mut()
                .find(|worker| worker.address() == address);
            if let Some(categorized) = worker.and_then(|worker| worker.apply(logs, failures)) {
                results.push(categorized);
            }
        }

        let rewind = state.joined.iter().map(|(start, _)| *start).min();
        let next = scanned_to + 1;
        state.cursor = rewind.map_or(next, |start| start.min(next));
        results
    }

    /// Hand over all members if the group has caught up with `frontier`
    /// and nobody is waiting to be admitted. The group is unusable
    /// afterwards.
    pub(crate) fn take_for_promotion(&self, frontier: BlockNumber) -> Option<Vec<Worker>> {
        let mut state = self.state.lock();
        if state.promoted || state.cursor < frontier || !state.joined.is_empty() {
            return None;
        }
        state.promoted = true;
        Some(std::mem::take(&mut state.workers))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use categorizer::log::discard;
    use categorizer::mock::MockDecoder;

    fn worker(address: &str, watermark: BlockNumber) -> Worker {
        Worker::new(
            Smartcontract::new("1", address, watermark),
            Arc::new(MockDecoder::default()),
        )
    }

    #[test]
    fn round_applies_logs_and_advances_cursor() {
        let group = WorkerGroup::new(80, vec![worker("0xa", 79), worker("0xb", 79)]);
        let round = group.begin_round();
        assert_eq!(round.cursor, 80);
        assert_eq!(round.addresses, vec!["0xa", "0xb"]);

        let results = group.complete_round(
            &discard(),
            &round,
            vec![LogEntry::new("0xa", 90), LogEntry::new("0xb", 120)],
            149,
        );
        assert_eq!(results.len(), 2);
        assert_eq!(group.cursor(), 150);
    }

    #[test]
    fn logs_outside_the_round_are_ignored() {
        let group = WorkerGroup::new(80, vec![worker("0xa", 79)]);
        let round = group.begin_round();
        let results = group.complete_round(
            &discard(),
            &round,
            vec![LogEntry::new("0xa", 90), LogEntry::new("0xa", 130)],
            100,
        );
        assert_eq!(results[0].smartcontract.categorized_block_number, 90);
        assert_eq!(group.cursor(), 101);
    }

    #[test]
    fn joining_during_a_round_rewinds_the_cursor() {
        let group = WorkerGroup::new(80, vec![worker("0xa", 79)]);
        let round = group.begin_round();

        assert_eq!(group.join(90, vec![worker("0xb", 89)]).unwrap(), 80);
        group.complete_round(&discard(), &round, vec![LogEntry::new("0xa", 95)], 149);
        assert_eq!(group.cursor(), 90);

        let round = group.begin_round();
        assert_eq!(round.addresses, vec!["0xa", "0xb"]);
        let results = group.complete_round(
            &discard(),
            &round,
            vec![LogEntry::new("0xa", 95), LogEntry::new("0xb", 95)],
            149,
        );
        // 0xa saw block 95 in the previous round already
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].smartcontract.address, "0xb");
        assert_eq!(group.cursor(), 150);
    }

    #[test]
    fn cannot_join_a_group_created_past_the_start_block() {
        let group = WorkerGroup::new(100, vec![worker("0xa", 99)]);
        let rejected = group.join(90, vec![worker("0xb", 89)]).unwrap_err();
        assert_eq!(rejected.len(), 1);
        assert_eq!(group.len(), 1);
    }

    #[test]
    fn joining_after_the_cursor_moved_on_rewinds_the_next_round() {
        let group = WorkerGroup::new(80, vec![worker("0xa", 79)]);
        let round = group.begin_round();
        group.complete_round(&discard(), &round, vec![LogEntry::new("0xa", 85)], 89);
        assert_eq!(group.cursor(), 90);

        assert_eq!(group.join(80, vec![worker("0xb", 79)]).unwrap(), 80);
        let round = group.begin_round();
        assert_eq!(round.cursor, 80);
        assert_eq!(group.cursor(), 80);

        let results = group.complete_round(
            &discard(),
            &round,
            vec![LogEntry::new("0xa", 85), LogEntry::new("0xb", 85)],
            89,
        );
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].smartcontract.address, "0xb");
        assert_eq!(group.cursor(), 90);
    }

    #[test]
    fn promotion_happens_once_and_only_when_caught_up() {
        let group = WorkerGroup::new(80, vec![worker("0xa", 79)]);
        assert!(group.take_for_promotion(150).is_none());

        let round = group.begin_round();
        group.complete_round(&discard(), &round, vec![], 149);

        let promoted = group.take_for_promotion(150).unwrap();
        assert_eq!(promoted.len(), 1);
        assert!(group.is_promoted());
        assert!(group.take_for_promotion(150).is_none());
        assert!(group.join(150, vec![worker("0xb", 149)]).is_err());
    }

    #[test]
    fn waiting_members_hold_back_promotion() {
        let group = WorkerGroup::new(150, vec![worker("0xa", 149)]);
        group.join(150, vec![worker("0xb", 149)]).unwrap();
        assert!(group.take_for_promotion(150).is_none());

        group.begin_round();
        assert_eq!(group.take_for_promotion(150).unwrap().len(), 2);
    }
}
