//! Export cycle timing guard.

use crate::metrics::{CycleResult, MetricsRegistry};
use std::time::{Duration, Instant};
use tracing::info;

/// Times one export cycle and reports it when dropped.
///
/// The finish event and self-metrics are emitted from `Drop`, so they fire
/// exactly once whether the cycle returns, fails, or is cancelled mid-fetch.
pub struct CycleTimer<'a> {
    exporter: &'a str,
    registry: &'a MetricsRegistry,
    start: Instant,
    result: CycleResult,
}

impl<'a> CycleTimer<'a> {
    /// Start timing. The cycle counts as failed unless [`succeed`] is called.
    ///
    /// [`succeed`]: CycleTimer::succeed
    pub fn start(exporter: &'a str, registry: &'a MetricsRegistry) -> Self {
        Self {
            exporter,
            registry,
            start: Instant::now(),
            result: CycleResult::Failure,
        }
    }

    pub fn succeed(&mut self) {
        self.result = CycleResult::Success;
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Drop for CycleTimer<'_> {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        self.registry.record_cycle(self.exporter, self.result, elapsed);
        info!(
            exporter = %self.exporter,
            result = ?self.result,
            elapsed = %humantime::format_duration(elapsed),
            elapsed_ms = elapsed.as_secs_f64() * 1000.0,
            "export cycle finished"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timer_records_failure_by_default() {
        let registry = MetricsRegistry::new();
        {
            let _timer = CycleTimer::start("cluster", &registry);
        }
        assert_eq!(registry.cycle_count("cluster", CycleResult::Failure), 1);
        assert_eq!(registry.cycle_count("cluster", CycleResult::Success), 0);
    }

    #[test]
    fn test_timer_records_success() {
        let registry = MetricsRegistry::new();
        {
            let mut timer = CycleTimer::start("cluster", &registry);
            std::thread::sleep(Duration::from_millis(5));
            assert!(timer.elapsed() >= Duration::from_millis(5));
            timer.succeed();
        }
        assert_eq!(registry.cycle_count("cluster", CycleResult::Success), 1);
        assert_eq!(registry.cycle_count("cluster", CycleResult::Failure), 0);
    }
}
