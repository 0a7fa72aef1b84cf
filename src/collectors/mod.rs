//! Per-exporter collector mapping.
//!
//! Each exporter owns one [`Collectors`] map from metric name to
//! [`Collector`]. Entries are created lazily on first observation, registered
//! into the shared scrape registry once, and never removed, so a name keeps
//! pointing at the same collector for the exporter's whole lifetime.

mod batch;
mod names;

pub use batch::{Batch, ReportError};
pub use names::{is_valid_label_name, is_valid_metric_name, prefixed, sanitize_metric_name};

use crate::metrics::{DuplicateMetric, MetricsRegistry};
use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use prometheus_client::metrics::counter::Counter;
use prometheus_client::metrics::family::Family;
use prometheus_client::metrics::gauge::Gauge;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::AtomicU64;
use std::sync::Arc;

/// Label set of one series. Empty for unlabelled metrics.
pub type Labels = Vec<(String, String)>;

type GaugeFamily = Family<Labels, Gauge<f64, AtomicU64>>;
type CounterFamily = Family<Labels, Counter<f64, AtomicU64>>;

/// Kind of a collector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    #[default]
    Gauge,
    Counter,
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricKind::Gauge => f.write_str("gauge"),
            MetricKind::Counter => f.write_str("counter"),
        }
    }
}

#[derive(Clone)]
enum Series {
    Gauge(GaugeFamily),
    Counter(CounterFamily),
}

/// One named metric exposed for scraping.
pub struct Collector {
    name: String,
    help: String,
    series: Series,
    /// Label sets that have been written at least once.
    observed: DashSet<Labels>,
}

impl Collector {
    fn new(name: &str, help: &str, kind: MetricKind) -> Self {
        let series = match kind {
            MetricKind::Gauge => Series::Gauge(GaugeFamily::default()),
            MetricKind::Counter => Series::Counter(CounterFamily::default()),
        };
        Self {
            name: name.to_string(),
            help: help.to_string(),
            series,
            observed: DashSet::new(),
        }
    }

    /// Metric name, without the exporter prefix.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Help text given at creation.
    pub fn help(&self) -> &str {
        &self.help
    }

    pub fn kind(&self) -> MetricKind {
        match self.series {
            Series::Gauge(_) => MetricKind::Gauge,
            Series::Counter(_) => MetricKind::Counter,
        }
    }

    /// Current reading of one series, or `None` if it was never written.
    pub fn value(&self, labels: &Labels) -> Option<f64> {
        if !self.observed.contains(labels) {
            return None;
        }
        let value = match &self.series {
            Series::Gauge(family) => family.get_or_create(labels).get(),
            Series::Counter(family) => family.get_or_create(labels).get(),
        };
        Some(value)
    }

    /// Reading of the unlabelled series.
    pub fn get(&self) -> Option<f64> {
        self.value(&Labels::new())
    }

    /// Label sets written so far.
    pub fn label_sets(&self) -> Vec<Labels> {
        self.observed.iter().map(|l| l.key().clone()).collect()
    }

    // Callers validate the value before reaching here.
    fn apply(&self, labels: &Labels, value: f64) {
        match &self.series {
            Series::Gauge(family) => {
                family.get_or_create(labels).set(value);
            }
            Series::Counter(family) => {
                family.get_or_create(labels).inc_by(value);
            }
        }
        self.observed.insert(labels.clone());
    }

    fn register_into(&self, registry: &MetricsRegistry, full_name: &str) -> Result<(), DuplicateMetric> {
        match &self.series {
            Series::Gauge(family) => registry.register(full_name, &self.help, family.clone()),
            Series::Counter(family) => registry.register(full_name, &self.help, family.clone()),
        }
    }
}

impl fmt::Debug for Collector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collector")
            .field("name", &self.name)
            .field("kind", &self.kind())
            .field("series", &self.observed.len())
            .finish()
    }
}

/// Concurrent name -> collector mapping owned by one exporter.
pub struct Collectors {
    prefix: Option<String>,
    entries: DashMap<String, Arc<Collector>>,
    registry: MetricsRegistry,
}

impl Collectors {
    /// Create an empty mapping whose collectors register into `registry`
    /// under `<prefix>_<name>`.
    pub fn new(prefix: Option<String>, registry: MetricsRegistry) -> Self {
        Self {
            prefix,
            entries: DashMap::new(),
            registry,
        }
    }

    /// Metric name prefix applied at registration.
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Return the collector for `name`, creating and registering it on first
    /// use. Creation is atomic per name: concurrent callers get the same
    /// instance.
    pub fn get_or_create(
        &self,
        name: &str,
        help: &str,
        kind: MetricKind,
    ) -> Result<Arc<Collector>, ReportError> {
        if !is_valid_metric_name(name) {
            return Err(ReportError::InvalidName(name.to_string()));
        }

        match self.entries.entry(name.to_string()) {
            Entry::Occupied(entry) => {
                let existing = entry.get();
                if existing.kind() != kind {
                    return Err(ReportError::KindMismatch {
                        name: name.to_string(),
                        existing: existing.kind(),
                        requested: kind,
                    });
                }
                Ok(Arc::clone(existing))
            }
            Entry::Vacant(entry) => {
                let collector = Arc::new(Collector::new(name, help, kind));
                let full_name = prefixed(self.prefix.as_deref(), name);
                collector
                    .register_into(&self.registry, &full_name)
                    .map_err(|e| ReportError::DuplicateMetric(e.0))?;
                tracing::debug!(metric = %full_name, kind = %kind, "registered collector");
                entry.insert(Arc::clone(&collector));
                Ok(collector)
            }
        }
    }

    /// Start staging a set of observations to apply together.
    pub fn batch(&self) -> Batch<'_> {
        Batch::new(self)
    }

    pub fn get(&self, name: &str) -> Option<Arc<Collector>> {
        self.entries.get(name).map(|entry| Arc::clone(entry.value()))
    }

    /// Kind of an existing collector.
    pub fn kind_of(&self, name: &str) -> Option<MetricKind> {
        self.entries.get(name).map(|entry| entry.kind())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sorted metric names.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.entries.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Point-in-time copy of every `(name, collector)` pair, sorted by name.
    pub fn snapshot(&self) -> Vec<(String, Arc<Collector>)> {
        let mut pairs: Vec<(String, Arc<Collector>)> = self
            .entries
            .iter()
            .map(|e| (e.key().clone(), Arc::clone(e.value())))
            .collect();
        pairs.sort_by(|a, b| a.0.cmp(&b.0));
        pairs
    }
}

impl fmt::Debug for Collectors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Collectors")
            .field("prefix", &self.prefix)
            .field("names", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collectors() -> Collectors {
        Collectors::new(Some("test".to_string()), MetricsRegistry::new())
    }

    #[test]
    fn test_get_or_create_is_stable() {
        let collectors = collectors();
        let first = collectors
            .get_or_create("value", "A value", MetricKind::Gauge)
            .unwrap();
        let second = collectors
            .get_or_create("value", "A value", MetricKind::Gauge)
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(collectors.len(), 1);
    }

    #[test]
    fn test_kind_mismatch() {
        let collectors = collectors();
        collectors
            .get_or_create("value", "A value", MetricKind::Gauge)
            .unwrap();
        let err = collectors
            .get_or_create("value", "A value", MetricKind::Counter)
            .unwrap_err();

        assert!(matches!(err, ReportError::KindMismatch { .. }));
        assert_eq!(collectors.kind_of("value"), Some(MetricKind::Gauge));
    }

    #[test]
    fn test_invalid_name_rejected() {
        let collectors = collectors();
        let err = collectors
            .get_or_create("bad-name", "", MetricKind::Gauge)
            .unwrap_err();
        assert!(matches!(err, ReportError::InvalidName(_)));
        assert!(collectors.is_empty());
    }

    #[test]
    fn test_value_unobserved_series() {
        let collectors = collectors();
        let collector = collectors
            .get_or_create("value", "A value", MetricKind::Gauge)
            .unwrap();
        assert_eq!(collector.get(), None);

        collector.apply(&Labels::new(), 42.0);
        assert_eq!(collector.get(), Some(42.0));
        assert_eq!(collector.value(&vec![("host".into(), "a".into())]), None);
    }

    #[test]
    fn test_registered_with_prefix() {
        let registry = MetricsRegistry::new();
        let collectors = Collectors::new(Some("cluster".to_string()), registry.clone());
        let collector = collectors
            .get_or_create("hosts", "Number of hosts", MetricKind::Gauge)
            .unwrap();
        collector.apply(&Labels::new(), 4.0);

        let text = registry.encode().unwrap();
        assert!(text.contains("# HELP cluster_hosts Number of hosts"));
        assert!(text.contains("# TYPE cluster_hosts gauge"));
    }

    #[test]
    fn test_snapshot_sorted() {
        let collectors = collectors();
        for name in ["b", "a", "c"] {
            collectors.get_or_create(name, "", MetricKind::Gauge).unwrap();
        }
        let names: Vec<String> = collectors.snapshot().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
        assert_eq!(collectors.names(), names);
    }

    #[test]
    fn test_concurrent_first_registration() {
        let collectors = Arc::new(collectors());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let collectors = Arc::clone(&collectors);
                std::thread::spawn(move || {
                    collectors
                        .get_or_create("x", "Shared", MetricKind::Counter)
                        .unwrap()
                })
            })
            .collect();

        let created: Vec<Arc<Collector>> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(collectors.len(), 1);
        for c in &created[1..] {
            assert!(Arc::ptr_eq(&created[0], c));
        }
    }

    #[test]
    fn test_name_taken_by_other_exporter() {
        let registry = MetricsRegistry::new();
        let first = Collectors::new(None, registry.clone());
        let second = Collectors::new(None, registry.clone());

        first.get_or_create("value", "", MetricKind::Gauge).unwrap();
        let err = second
            .get_or_create("value", "", MetricKind::Gauge)
            .unwrap_err();
        assert!(matches!(err, ReportError::DuplicateMetric(ref n) if n == "value"));
        assert!(second.is_empty());

        let clashing = Collectors::new(Some("rustexporter".to_string()), registry.clone());
        let err = clashing
            .get_or_create("export_cycles", "", MetricKind::Counter)
            .unwrap_err();
        assert!(matches!(err, ReportError::DuplicateMetric(ref n) if n == "rustexporter_export_cycles"));

        let text = registry.encode().unwrap();
        assert_eq!(text.matches("# TYPE value gauge").count(), 1);
    }
}
