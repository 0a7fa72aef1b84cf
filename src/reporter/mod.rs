//! Metric reporters.
//!
//! A reporter turns one deserialized response into observations on the
//! exporter's [`Collectors`]. It is the only part of an exporter that knows
//! the source schema.

mod fields;
mod flatten;

pub use fields::{FieldMapping, FieldReporter};
pub use flatten::FlattenReporter;

use crate::collectors::{Collectors, ReportError};

/// Maps a domain object of type `T` onto collectors.
///
/// Called once per successful fetch. Implementations must not keep the
/// object after returning, and should stage their writes through
/// [`Collectors::batch`] so a rejected object leaves no half-written state.
pub trait MetricReporter<T>: Send + Sync {
    fn report(&self, component: &T, collectors: &Collectors) -> Result<(), ReportError>;
}

impl<T, F> MetricReporter<T> for F
where
    F: Fn(&T, &Collectors) -> Result<(), ReportError> + Send + Sync,
{
    fn report(&self, component: &T, collectors: &Collectors) -> Result<(), ReportError> {
        self(component, collectors)
    }
}

/// Short name of a type, without its module path.
pub(crate) fn short_type_name<T: ?Sized>() -> &'static str {
    let full = std::any::type_name::<T>();
    let base = full.split('<').next().unwrap_or(full);
    base.rsplit("::").next().unwrap_or(base)
}
