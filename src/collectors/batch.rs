//! Staged observations applied to a [`Collectors`] map all at once.
//!
//! A batch is validated in full before any collector is touched, so a
//! rejected report leaves every previously written value in place.

use super::{is_valid_label_name, is_valid_metric_name, Collector, Collectors, Labels, MetricKind};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use thiserror::Error;

/// Errors a metric reporter can surface.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("invalid metric name '{0}'")]
    InvalidName(String),

    #[error("invalid label name '{label}' on metric '{metric}'")]
    InvalidLabel { metric: String, label: String },

    #[error("metric '{name}' is a {existing}, cannot report it as a {requested}")]
    KindMismatch {
        name: String,
        existing: MetricKind,
        requested: MetricKind,
    },

    #[error("metric '{name}' received non-finite value {value}")]
    NonFinite { name: String, value: f64 },

    #[error("counter '{name}' cannot be incremented by negative value {value}")]
    NegativeIncrement { name: String, value: f64 },

    #[error("field '{0}' is missing or null")]
    MissingField(String),

    #[error("field '{pointer}' is not numeric: {found}")]
    NotNumeric { pointer: String, found: String },

    #[error("metric '{0}' is already registered by another exporter")]
    DuplicateMetric(String),

    #[error("series {name}{labels:?} reported more than once")]
    DuplicateSeries { name: String, labels: Labels },

    #[error("{0}")]
    Rejected(String),
}

#[derive(Debug, Clone)]
struct Staged {
    name: String,
    help: String,
    kind: MetricKind,
    labels: Labels,
    value: f64,
}

/// A set of pending observations.
#[derive(Debug)]
#[must_use = "a batch does nothing until committed"]
pub struct Batch<'a> {
    collectors: &'a Collectors,
    staged: Vec<Staged>,
}

impl<'a> Batch<'a> {
    pub(super) fn new(collectors: &'a Collectors) -> Self {
        Self {
            collectors,
            staged: Vec::new(),
        }
    }

    /// Set an unlabelled gauge.
    pub fn set_gauge(&mut self, name: impl Into<String>, help: impl Into<String>, value: f64) -> &mut Self {
        self.set_gauge_with(name, help, Labels::new(), value)
    }

    /// Set one labelled gauge series.
    pub fn set_gauge_with(
        &mut self,
        name: impl Into<String>,
        help: impl Into<String>,
        labels: Labels,
        value: f64,
    ) -> &mut Self {
        self.push(name.into(), help.into(), MetricKind::Gauge, labels, value)
    }

    /// Increment an unlabelled counter.
    pub fn inc_counter(&mut self, name: impl Into<String>, help: impl Into<String>, by: f64) -> &mut Self {
        self.inc_counter_with(name, help, Labels::new(), by)
    }

    /// Increment one labelled counter series.
    pub fn inc_counter_with(
        &mut self,
        name: impl Into<String>,
        help: impl Into<String>,
        labels: Labels,
        by: f64,
    ) -> &mut Self {
        self.push(name.into(), help.into(), MetricKind::Counter, labels, by)
    }

    /// Stage an observation of the given kind.
    pub fn observe(
        &mut self,
        kind: MetricKind,
        name: impl Into<String>,
        help: impl Into<String>,
        labels: Labels,
        value: f64,
    ) -> &mut Self {
        self.push(name.into(), help.into(), kind, labels, value)
    }

    fn push(&mut self, name: String, help: String, kind: MetricKind, labels: Labels, value: f64) -> &mut Self {
        self.staged.push(Staged {
            name,
            help,
            kind,
            labels,
            value,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.staged.len()
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    /// Validate and apply every staged observation.
    ///
    /// Returns the number of observations written. On error nothing is
    /// written; collectors for valid names may already have been created.
    pub fn commit(self) -> Result<usize, ReportError> {
        self.validate()?;

        let mut resolved: HashMap<&str, Arc<Collector>> = HashMap::new();
        for staged in &self.staged {
            if !resolved.contains_key(staged.name.as_str()) {
                let collector =
                    self.collectors
                        .get_or_create(&staged.name, &staged.help, staged.kind)?;
                resolved.insert(staged.name.as_str(), collector);
            }
        }

        for staged in &self.staged {
            if let Some(collector) = resolved.get(staged.name.as_str()) {
                collector.apply(&staged.labels, staged.value);
            }
        }

        Ok(self.staged.len())
    }

    fn validate(&self) -> Result<(), ReportError> {
        let mut kinds: HashMap<&str, MetricKind> = HashMap::new();
        let mut series: HashSet<(&str, &Labels)> = HashSet::new();

        for staged in &self.staged {
            if !is_valid_metric_name(&staged.name) {
                return Err(ReportError::InvalidName(staged.name.clone()));
            }

            for (label, _) in &staged.labels {
                if !is_valid_label_name(label) {
                    return Err(ReportError::InvalidLabel {
                        metric: staged.name.clone(),
                        label: label.clone(),
                    });
                }
            }

            if !staged.value.is_finite() {
                return Err(ReportError::NonFinite {
                    name: staged.name.clone(),
                    value: staged.value,
                });
            }

            if staged.kind == MetricKind::Counter && staged.value < 0.0 {
                return Err(ReportError::NegativeIncrement {
                    name: staged.name.clone(),
                    value: staged.value,
                });
            }

            let existing = kinds
                .get(staged.name.as_str())
                .copied()
                .or_else(|| self.collectors.kind_of(&staged.name));
            if let Some(existing) = existing
                && existing != staged.kind
            {
                return Err(ReportError::KindMismatch {
                    name: staged.name.clone(),
                    existing,
                    requested: staged.kind,
                });
            }
            kinds.insert(staged.name.as_str(), staged.kind);

            if !series.insert((staged.name.as_str(), &staged.labels)) {
                return Err(ReportError::DuplicateSeries {
                    name: staged.name.clone(),
                    labels: staged.labels.clone(),
                });
            }
        }

        Ok(())
    }
}
