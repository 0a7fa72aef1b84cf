//! Exporters: fetch a JSON endpoint, deserialize it, report metrics.

mod cycle;
mod set;
mod timer;

pub use cycle::{compose_url, ExportError, Exporter, DEFAULT_LOG_CONTENT_LIMIT};
pub use set::{Export, ExportSummary, ExportTarget, ExporterSet};
pub use timer::CycleTimer;
