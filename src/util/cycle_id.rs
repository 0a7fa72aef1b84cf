//! Export cycle identifiers.
//!
//! Every cycle gets a process-unique id so events from overlapping cycles
//! can be told apart in the logs.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static CYCLE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Identifier of one export cycle, formatted as `cycle-{counter:016x}`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CycleId(u64);

impl CycleId {
    /// Take the next id.
    pub fn next() -> Self {
        Self(CYCLE_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for CycleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cycle-{:016x}", self.0)
    }
}
