//! Utility functions and helpers.

mod cycle_id;
mod logging;
mod shutdown;

pub use cycle_id::CycleId;
pub use logging::init_logging;
pub use shutdown::ShutdownSignal;
