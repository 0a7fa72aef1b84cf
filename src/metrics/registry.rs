//! Shared scrape registry using prometheus-client.
//!
//! Holds every collector created by the exporters plus the exporter's own
//! cycle count and duration metrics.

use parking_lot::Mutex;
use prometheus_client::encoding::text::encode;
use prometheus_client::encoding::{EncodeLabelSet, EncodeLabelValue};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::histogram::{exponential_buckets, Histogram};
use prometheus_client::registry::{Metric, Registry};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

const CYCLES_TOTAL: &str = "rustexporter_export_cycles";
const CYCLE_DURATION: &str = "rustexporter_export_cycle_duration_seconds";

/// A metric name was registered twice.
#[derive(Debug, Error)]
#[error("metric '{0}' is already registered")]
pub struct DuplicateMetric(pub String);

/// Labels for cycle outcome metrics.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct CycleLabels {
    pub exporter: String,
    pub result: CycleResult,
}

/// Labels for cycle duration metrics.
#[derive(Clone, Debug, Hash, PartialEq, Eq, EncodeLabelSet)]
pub struct ExporterLabels {
    pub exporter: String,
}

/// Result of an export cycle.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, EncodeLabelValue)]
pub enum CycleResult {
    Success,
    Failure,
}

/// Registry shared between the scrape server and all exporters.
#[derive(Clone)]
pub struct MetricsRegistry {
    inner: Arc<MetricsRegistryInner>,
}

struct MetricsRegistryInner {
    /// Export cycles by outcome.
    cycles_total: Family<CycleLabels, Counter>,
    /// Export cycle duration histogram (in seconds).
    cycle_duration_seconds: Family<ExporterLabels, Histogram>,
    /// Collectors register into it lazily.
    state: Mutex<RegistryState>,
}

struct RegistryState {
    registry: Registry,
    /// Every name registered so far. `Registry` itself accepts duplicates.
    names: HashSet<String>,
}

impl MetricsRegistry {
    /// Create a new registry with the self-metrics already registered.
    pub fn new() -> Self {
        let mut registry = Registry::default();

        let cycles_total = Family::<CycleLabels, Counter>::default();
        let cycle_duration_seconds =
            Family::<ExporterLabels, Histogram>::new_with_constructor(|| {
                // Buckets: 5ms .. ~100s
                Histogram::new(exponential_buckets(0.005, 2.5, 12))
            });

        registry.register(
            CYCLES_TOTAL,
            "Total number of export cycles run",
            cycles_total.clone(),
        );
        registry.register(
            CYCLE_DURATION,
            "Export cycle duration in seconds",
            cycle_duration_seconds.clone(),
        );
        let names = [CYCLES_TOTAL, CYCLE_DURATION]
            .into_iter()
            .map(String::from)
            .collect();

        Self {
            inner: Arc::new(MetricsRegistryInner {
                cycles_total,
                cycle_duration_seconds,
                state: Mutex::new(RegistryState { registry, names }),
            }),
        }
    }

    /// Register a metric for scraping under its full name.
    ///
    /// Fails if the name is taken, whether by another exporter or by the
    /// self-metrics. A duplicate would make the whole scrape unparseable.
    pub fn register(&self, name: &str, help: &str, metric: impl Metric) -> Result<(), DuplicateMetric> {
        let mut state = self.inner.state.lock();
        if !state.names.insert(name.to_string()) {
            return Err(DuplicateMetric(name.to_string()));
        }
        state.registry.register(name, help, metric);
        Ok(())
    }

    /// Record the outcome and duration of one export cycle.
    pub fn record_cycle(&self, exporter: &str, result: CycleResult, duration: Duration) {
        let labels = CycleLabels {
            exporter: exporter.to_string(),
            result,
        };
        self.inner.cycles_total.get_or_create(&labels).inc();

        let exporter_labels = ExporterLabels {
            exporter: exporter.to_string(),
        };
        self.inner
            .cycle_duration_seconds
            .get_or_create(&exporter_labels)
            .observe(duration.as_secs_f64());
    }

    /// Number of cycles recorded for an exporter with the given outcome.
    pub fn cycle_count(&self, exporter: &str, result: CycleResult) -> u64 {
        let labels = CycleLabels {
            exporter: exporter.to_string(),
            result,
        };
        self.inner.cycles_total.get_or_create(&labels).get()
    }

    /// Encode everything in the Prometheus text format.
    pub fn encode(&self) -> Result<String, std::fmt::Error> {
        let mut buffer = String::new();
        let state = self.inner.state.lock();
        encode(&mut buffer, &state.registry)?;
        Ok(buffer)
    }
}

impl Default for MetricsRegistry {
    fn default() -> Self {
        Self::new()
    }
}
