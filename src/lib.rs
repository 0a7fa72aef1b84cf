//! rustexporter - Prometheus metrics from JSON HTTP endpoints
//!
//! Each [`Exporter`](exporter::Exporter) is bound to one endpoint and one
//! response type. An export cycle fetches the endpoint, deserializes the body,
//! and hands it to a [`MetricReporter`](reporter::MetricReporter) that updates
//! the exporter's [`Collectors`](collectors::Collectors). The collectors are
//! registered into a shared registry served on `/metrics`.

pub mod collectors;
pub mod config;
pub mod exporter;
pub mod metrics;
pub mod provider;
pub mod reporter;
pub mod util;

pub use config::Config;
pub use exporter::{ExportError, Exporter};
