pub use prometheus::core::Collector;
pub use prometheus::{labels, Counter, Error as PrometheusError, Gauge, Opts, Registry};

use slog::{error, o, Logger};
use std::collections::HashMap;
use std::sync::Arc;

pub fn network_labels(network_id: &str) -> HashMap<String, String> {
    labels! { String::from("network") => String::from(network_id), }
}

/// Registers metrics with a Prometheus registry. Failing to register a
/// metric is logged and counted, never fatal.
#[derive(Clone)]
pub struct MetricsRegistry {
    logger: Logger,
    registry: Arc<Registry>,
    register_errors: Box<Counter>,
}

impl MetricsRegistry {
    pub fn new(logger: Logger, registry: Arc<Registry>) -> Self {
        let register_errors = Self::gen_register_errors_counter(registry.clone());

        MetricsRegistry {
            logger: logger.new(o!("component" => String::from("MetricsRegistry"))),
            registry,
            register_errors,
        }
    }

    /// A registry that is not exported anywhere, for tests.
    pub fn mock() -> Self {
        MetricsRegistry::new(crate::log::discard(), Arc::new(Registry::new()))
    }

    fn gen_register_errors_counter(registry: Arc<Registry>) -> Box<Counter> {
        let opts = Opts::new(
            String::from("metrics_register_errors"),
            String::from("Counts Prometheus metrics register errors"),
        );
        let counter = Box::new(
            Counter::with_opts(opts).expect("failed to create `metrics_register_errors` counter"),
        );
        // Several registries can share one Prometheus registry; only the
        // first one gets to register the counter.
        let _ = registry.register(counter.clone());
        counter
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn register(&self, name: &str, c: Box<dyn Collector>) {
        let err = match self.registry.register(c) {
            Ok(()) => return,
            Err(err) => err,
        };
        self.register_errors.inc();
        match err {
            PrometheusError::AlreadyReg => {
                error!(
                    self.logger,
                    "registering metric [{}] because it was already registered", name,
                );
            }
            err => {
                error!(self.logger, "registering metric [{}] failed: {}", name, err);
            }
        }
    }

    pub fn new_gauge(
        &self,
        name: &str,
        help: &str,
        const_labels: HashMap<String, String>,
    ) -> Result<Box<Gauge>, PrometheusError> {
        let opts = Opts::new(name, help).const_labels(const_labels);
        let gauge = Box::new(Gauge::with_opts(opts)?);
        self.register(name, gauge.clone());
        Ok(gauge)
    }

    pub fn new_counter(
        &self,
        name: &str,
        help: &str,
        const_labels: HashMap<String, String>,
    ) -> Result<Box<Counter>, PrometheusError> {
        let opts = Opts::new(name, help).const_labels(const_labels);
        let counter = Box::new(Counter::with_opts(opts)?);
        self.register(name, counter.clone());
        Ok(counter)
    }
}
