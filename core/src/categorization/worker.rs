use categorizer::blockchain::max_block_number;
use categorizer::prelude::*;

use super::error::CategorizeError;

/// The outcome of applying a batch of logs to a worker: the smartcontract
/// with its advanced watermark and the logs that were applied, in block
/// order.
#[derive(Clone, Debug, PartialEq)]
pub struct Categorized {
    pub smartcontract: Smartcontract,
    pub logs: Vec<LogEntry>,
    pub decode_failures: usize,
}

/// Categorizes the logs of one smartcontract. A worker has exactly one
/// owner at a time: a worker group while it catches up, then the live
/// population.
pub struct Worker {
    smartcontract: Smartcontract,
    decoder: Arc<dyn LogDecoder>,
}

impl Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("smartcontract", &self.smartcontract)
            .finish()
    }
}

impl Worker {
    pub fn new(smartcontract: Smartcontract, decoder: Arc<dyn LogDecoder>) -> Self {
        Worker {
            smartcontract,
            decoder,
        }
    }

    pub fn address(&self) -> &str {
        &self.smartcontract.address
    }

    pub fn smartcontract(&self) -> &Smartcontract {
        &self.smartcontract
    }

    pub fn categorized_block_number(&self) -> BlockNumber {
        self.smartcontract.categorized_block_number
    }

    pub fn next_block_number(&self) -> Option<BlockNumber> {
        self.smartcontract.next_block_number()
    }

    pub fn decoder(&self) -> &Arc<dyn LogDecoder> {
        &self.decoder
    }

    /// Apply `logs` to the smartcontract. Logs at or below the watermark
    /// were applied before and are skipped. Returns `None` if nothing was
    /// left to apply, in which case the watermark is unchanged.
    ///
    /// A log that fails to decode is still applied, without an event.
    pub fn categorize(
        &mut self,
        logger: &Logger,
        logs: Vec<LogEntry>,
    ) -> Result<Option<Categorized>, CategorizeError> {
        let mut logs = self.pending(logs)?;
        let decode_failures = decode_logs(self.decoder.as_ref(), logger, &mut logs);
        Ok(self.apply(logs, decode_failures))
    }

    /// The logs of this smartcontract above the watermark, in block order.
    pub(crate) fn pending(
        &self,
        logs: Vec<LogEntry>,
    ) -> Result<Vec<LogEntry>, CategorizeError> {
        if let Some(foreign) = logs.iter().find(|log| !log.is_for(self.address())) {
            return Err(CategorizeError::ForeignLog {
                address: self.smartcontract.address.clone(),
                log_address: foreign.address.clone(),
                block_number: foreign.block_number,
            });
        }

        let watermark = self.categorized_block_number();
        let mut logs: Vec<LogEntry> = logs
            .into_iter()
            .filter(|log| log.block_number > watermark)
            .collect();
        logs.sort_by_key(|log| (log.block_number, log.log_index));
        Ok(logs)
    }

    /// Advance the watermark over logs that were decoded already. Logs the
    /// watermark has passed in the meantime are dropped.
    pub(crate) fn apply(
        &mut self,
        logs: Vec<LogEntry>,
        decode_failures: usize,
    ) -> Option<Categorized> {
        let watermark = self.categorized_block_number();
        let logs: Vec<LogEntry> = logs
            .into_iter()
            .filter(|log| log.block_number > watermark)
            .collect();
        let new_watermark = max_block_number(&logs)?;

        self.smartcontract.categorized_block_number = new_watermark;
        Some(Categorized {
            smartcontract: self.smartcontract.clone(),
            logs,
            decode_failures,
        })
    }
}

/// Decode `logs` in place and return how many failed.
pub(crate) fn decode_logs(
    decoder: &dyn LogDecoder,
    logger: &Logger,
    logs: &mut [LogEntry],
) -> usize {
    let mut decode_failures = 0;
    for log in logs.iter_mut() {
        match decoder.decode(log) {
            Ok(event) => log.event = Some(event),
            Err(e) => {
                decode_failures += 1;
                debug!(logger, "Failed to decode log";
                    "address" => &log.address,
                    "block_number" => log.block_number,
                    "log_index" => log.log_index,
                    "error" => format!("{:#}", e),
                );
            }
        }
    }
    decode_failures
}
