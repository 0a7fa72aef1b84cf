//! Scrape registry, self-metrics, and the metrics endpoint.

mod registry;
mod server;

pub use registry::{CycleLabels, CycleResult, DuplicateMetric, ExporterLabels, MetricsRegistry};
pub use server::MetricsServer;
