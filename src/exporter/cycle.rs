//! The export cycle.
//!
//! One cycle: validate suffix -> fetch -> deserialize -> report -> finalize.

use super::timer::CycleTimer;
use crate::collectors::{Collectors, ReportError};
use crate::metrics::MetricsRegistry;
use crate::provider::{ContentProvider, FetchError};
use crate::reporter::{short_type_name, MetricReporter};
use crate::util::CycleId;
use serde::de::DeserializeOwned;
use std::marker::PhantomData;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, info_span, warn, Instrument};

/// Default number of content bytes included in error events.
pub const DEFAULT_LOG_CONTENT_LIMIT: usize = 4096;

/// Errors from one export cycle.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("invalid endpoint url suffix '{0}': must be non-empty and start with '/'")]
    InvalidSuffix(String),

    #[error("failed to fetch content: {0}")]
    Transport(#[from] FetchError),

    #[error("failed to deserialize content: {0}")]
    Deserialization(#[from] serde_json::Error),

    #[error("failed to report metrics: {0}")]
    Reporting(#[from] ReportError),
}

/// Append a validated suffix to `base`.
///
/// `None` yields `base` unchanged. A present suffix must be non-empty and
/// start with `/`.
pub fn compose_url(base: &str, suffix: Option<&str>) -> Result<String, ExportError> {
    match suffix {
        None => Ok(base.to_string()),
        Some(s) if s.starts_with('/') => Ok(format!("{}{}", base, s)),
        Some(s) => Err(ExportError::InvalidSuffix(s.to_string())),
    }
}

/// Cut `content` to at most `limit` bytes on a char boundary.
fn truncate_content(content: &str, limit: usize) -> (&str, bool) {
    if content.len() <= limit {
        return (content, false);
    }
    let mut end = limit;
    while !content.is_char_boundary(end) {
        end -= 1;
    }
    (&content[..end], true)
}

/// Exporter bound to one endpoint and one response type `T`.
///
/// `R` maps each deserialized `T` onto this exporter's [`Collectors`].
pub struct Exporter<T, R> {
    name: String,
    endpoint_url: String,
    provider: Arc<dyn ContentProvider>,
    reporter: R,
    collectors: Collectors,
    registry: MetricsRegistry,
    log_content_limit: usize,
    _component: PhantomData<fn() -> T>,
}

impl<T, R> Exporter<T, R>
where
    T: DeserializeOwned,
    R: MetricReporter<T>,
{
    /// Create an exporter. Collectors register into `registry` under the
    /// optional `prefix`.
    pub fn new(
        name: impl Into<String>,
        endpoint_url: impl Into<String>,
        provider: Arc<dyn ContentProvider>,
        reporter: R,
        registry: MetricsRegistry,
        prefix: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            endpoint_url: endpoint_url.into(),
            provider,
            reporter,
            collectors: Collectors::new(prefix, registry.clone()),
            registry,
            log_content_limit: DEFAULT_LOG_CONTENT_LIMIT,
            _component: PhantomData,
        }
    }

    /// Cap the raw content included in error events. `0` omits it.
    pub fn with_log_content_limit(mut self, limit: usize) -> Self {
        self.log_content_limit = limit;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }

    pub fn collectors(&self) -> &Collectors {
        &self.collectors
    }

    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    /// Run one export cycle against `endpoint_url + suffix`.
    ///
    /// An invalid suffix fails before any timing, start event, or I/O.
    /// Every other failure is logged with the content seen so far and then
    /// returned; nothing is retried.
    pub async fn export(&self, suffix: Option<&str>) -> Result<(), ExportError> {
        let url = match compose_url(&self.endpoint_url, suffix) {
            Ok(url) => url,
            Err(e) => {
                warn!(exporter = %self.name, error = %e, "rejected export request");
                return Err(e);
            }
        };

        let span = info_span!(
            "export",
            cycle = %CycleId::next(),
            exporter = %self.name,
            reporter = short_type_name::<R>()
        );
        self.run_cycle(url).instrument(span).await
    }

    async fn run_cycle(&self, url: String) -> Result<(), ExportError> {
        let mut timer = CycleTimer::start(&self.name, &self.registry);
        info!(url = %url, "export cycle started");

        let mut content = String::new();
        let result = self.fetch_and_report(&url, &mut content).await;

        match &result {
            Ok(()) => timer.succeed(),
            Err(e) => {
                let (logged, truncated) = truncate_content(&content, self.log_content_limit);
                error!(
                    exporter = %self.name,
                    operation = "export",
                    error = %e,
                    content = %logged,
                    content_bytes = content.len(),
                    content_truncated = truncated,
                    "failed to export metrics"
                );
            }
        }

        result
    }

    async fn fetch_and_report(&self, url: &str, content: &mut String) -> Result<(), ExportError> {
        *content = self.provider.get_response_content(url).await?;
        let component: T = serde_json::from_str(content)?;
        self.reporter.report(&component, &self.collectors)?;
        Ok(())
    }
}

impl<T, R> std::fmt::Debug for Exporter<T, R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Exporter")
            .field("name", &self.name)
            .field("endpoint_url", &self.endpoint_url)
            .field("reporter", &short_type_name::<R>())
            .field("collectors", &self.collectors.len())
            .finish()
    }
}
