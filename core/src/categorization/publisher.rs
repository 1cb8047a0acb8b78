use categorizer::prelude::*;

use super::error::PublishError;
use super::metrics::ManagerMetrics;
use super::worker::Categorized;

/// Pushes categorized logs downstream, one `categorized` request per
/// smartcontract and batch. Pushing never blocks; a result that cannot be
/// delivered is logged and dropped.
pub struct ResultPublisher {
    sink: Arc<dyn ResultSink>,
    logger: Logger,
    metrics: Arc<ManagerMetrics>,
}

impl ResultPublisher {
    pub fn new(logger: &Logger, sink: Arc<dyn ResultSink>, metrics: Arc<ManagerMetrics>) -> Self {
        ResultPublisher {
            sink,
            logger: logger.new(o!("component" => "ResultPublisher")),
            metrics,
        }
    }

    pub fn publish(&self, categorized: Categorized) -> Result<(), PublishError> {
        let address = categorized.smartcontract.address.clone();
        let block_number = categorized.smartcontract.categorized_block_number;
        let logs = categorized.logs.len();

        let result = Command::Categorized {
            smartcontracts: vec![categorized.smartcontract],
            logs: categorized.logs,
        }
        .into_request()
        .map_err(PublishError::from)
        .and_then(|request| self.sink.push(request).map_err(PublishError::from));

        match &result {
            Ok(()) => trace!(self.logger, "Published categorized logs";
                "address" => &address,
                "block_number" => block_number,
                "logs" => logs,
            ),
            Err(e) => {
                self.metrics.publish_failures.inc();
                error!(self.logger, "Failed to publish categorized logs";
                    "address" => &address,
                    "block_number" => block_number,
                    "logs" => logs,
                    "error" => e.to_string(),
                    "code" => LogCode::PublishFailure,
                );
            }
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use categorizer::log::discard;
    use categorizer::mock::RecordingSink;

    fn categorized() -> Categorized {
        Categorized {
            smartcontract: Smartcontract::new("1", "0xabc", 120),
            logs: vec![LogEntry::new("0xabc", 101), LogEntry::new("0xabc", 120)],
            decode_failures: 0,
        }
    }

    #[test]
    fn pushes_a_categorized_request() {
        let sink = RecordingSink::new();
        let publisher =
            ResultPublisher::new(&discard(), sink.clone(), Arc::new(ManagerMetrics::mock()));

        publisher.publish(categorized()).unwrap();

        let requests = sink.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].command, "categorized");
        assert_eq!(
            sink.categorized(),
            vec![("0xabc".to_string(), vec![101, 120])]
        );
    }

    #[test]
    fn failures_are_counted_not_fatal() {
        let sink = RecordingSink::new();
        sink.set_failing(true);
        let metrics = Arc::new(ManagerMetrics::mock());
        let publisher = ResultPublisher::new(&discard(), sink.clone(), metrics.clone());

        assert!(matches!(
            publisher.publish(categorized()),
            Err(PublishError::Transport(_))
        ));
        assert_eq!(metrics.publish_failures.get(), 1.0);

        sink.set_failing(false);
        publisher.publish(categorized()).unwrap();
        assert_eq!(sink.requests().len(), 1);
    }
}
