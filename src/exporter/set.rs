//! A group of exporters run together.

use super::{ExportError, Exporter};
use crate::collectors::Collectors;
use crate::config::{Config, ReporterConfig};
use crate::metrics::MetricsRegistry;
use crate::provider::ContentProvider;
use crate::reporter::{FieldReporter, FlattenReporter, MetricReporter};
use async_trait::async_trait;
use futures::future::join_all;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

/// Object-safe view of an [`Exporter`], whatever its response type.
#[async_trait]
pub trait Export: Send + Sync {
    fn name(&self) -> &str;

    fn collectors(&self) -> &Collectors;

    async fn export(&self, suffix: Option<&str>) -> Result<(), ExportError>;
}

#[async_trait]
impl<T, R> Export for Exporter<T, R>
where
    T: DeserializeOwned + Send + 'static,
    R: MetricReporter<T> + 'static,
{
    fn name(&self) -> &str {
        Exporter::name(self)
    }

    fn collectors(&self) -> &Collectors {
        Exporter::collectors(self)
    }

    async fn export(&self, suffix: Option<&str>) -> Result<(), ExportError> {
        Exporter::export(self, suffix).await
    }
}

/// An exporter plus the suffix it is run with.
#[derive(Clone)]
pub struct ExportTarget {
    pub exporter: Arc<dyn Export>,
    pub suffix: Option<String>,
}

/// Outcome of running every target once.
#[derive(Debug, Default)]
pub struct ExportSummary {
    pub succeeded: usize,
    pub failed: Vec<(String, ExportError)>,
}

impl ExportSummary {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

/// All exporters of one process.
#[derive(Clone, Default)]
pub struct ExporterSet {
    targets: Vec<ExportTarget>,
}

impl ExporterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build one `serde_json::Value` exporter per configured entry.
    pub fn from_config(
        config: &Config,
        provider: Arc<dyn ContentProvider>,
        registry: &MetricsRegistry,
    ) -> Self {
        let mut set = Self::new();
        let limit = config.global.log_content_limit;

        for entry in &config.exporters {
            let exporter: Arc<dyn Export> = match &entry.reporter {
                ReporterConfig::Flatten { include } => Arc::new(
                    Exporter::<Value, _>::new(
                        entry.name.clone(),
                        entry.endpoint.clone(),
                        Arc::clone(&provider),
                        FlattenReporter::with_include(include.clone()),
                        registry.clone(),
                        entry.prefix.clone(),
                    )
                    .with_log_content_limit(limit),
                ),
                ReporterConfig::Fields { metrics } => Arc::new(
                    Exporter::<Value, _>::new(
                        entry.name.clone(),
                        entry.endpoint.clone(),
                        Arc::clone(&provider),
                        FieldReporter::new(metrics.clone()),
                        registry.clone(),
                        entry.prefix.clone(),
                    )
                    .with_log_content_limit(limit),
                ),
            };

            debug!(
                exporter = %entry.name,
                endpoint = %entry.endpoint,
                suffix = ?entry.suffix,
                "configured exporter"
            );
            set.add(exporter, entry.suffix.clone());
        }

        set
    }

    pub fn add(&mut self, exporter: Arc<dyn Export>, suffix: Option<String>) {
        self.targets.push(ExportTarget { exporter, suffix });
    }

    pub fn targets(&self) -> &[ExportTarget] {
        &self.targets
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Run one cycle for every target concurrently.
    ///
    /// Failures were already logged by each exporter; they are collected
    /// here so the caller can decide what to do with them.
    pub async fn export_all(&self) -> ExportSummary {
        let results = join_all(self.targets.iter().map(|target| async move {
            let result = target.exporter.export(target.suffix.as_deref()).await;
            (target.exporter.name().to_string(), result)
        }))
        .await;

        let mut summary = ExportSummary::default();
        for (name, result) in results {
            match result {
                Ok(()) => summary.succeeded += 1,
                Err(e) => summary.failed.push((name, e)),
            }
        }

        info!(
            succeeded = summary.succeeded,
            failed = summary.failed.len(),
            "export round complete"
        );
        summary
    }
}
