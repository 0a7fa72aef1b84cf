//! Reporter that exposes every numeric leaf of a JSON document.

use super::MetricReporter;
use crate::collectors::{sanitize_metric_name, Collectors, ReportError};
use serde_json::Value;

/// Reports each number in the document as a gauge named after its path.
///
/// `{"metrics": {"cpu": {"load": 0.4}}}` becomes `metrics_cpu_load 0.4`.
/// Array elements use their index (`hosts[1].cores` -> `hosts_1_cores`),
/// booleans report `0`/`1`, strings and nulls are skipped. Two paths that
/// sanitize to the same name (`a.b` and `a_b`) reject the whole report.
#[derive(Debug, Clone, Default)]
pub struct FlattenReporter {
    /// Dotted path prefixes to keep. Empty keeps everything.
    include: Vec<String>,
}

impl FlattenReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Only report leaves under one of the given dotted paths.
    pub fn with_include(include: Vec<String>) -> Self {
        Self { include }
    }

    fn included(&self, path: &str) -> bool {
        if self.include.is_empty() {
            return true;
        }
        self.include.iter().any(|prefix| {
            path == prefix
                || path
                    .strip_prefix(prefix.as_str())
                    .is_some_and(|rest| rest.starts_with('.') || rest.starts_with('['))
        })
    }
}

impl MetricReporter<Value> for FlattenReporter {
    fn report(&self, component: &Value, collectors: &Collectors) -> Result<(), ReportError> {
        let mut leaves = Vec::new();
        collect_leaves(component, String::new(), &mut leaves);

        let mut batch = collectors.batch();
        for (path, value) in leaves {
            if !self.included(&path) {
                continue;
            }
            let name = if path.is_empty() {
                "value".to_string()
            } else {
                sanitize_metric_name(&path)
            };
            batch.set_gauge(name, format!("Value of {}", display_path(&path)), value);
        }
        batch.commit()?;
        Ok(())
    }
}

fn display_path(path: &str) -> &str {
    if path.is_empty() { "the document" } else { path }
}

fn collect_leaves(value: &Value, path: String, out: &mut Vec<(String, f64)>) {
    match value {
        Value::Number(n) => {
            if let Some(v) = n.as_f64() {
                out.push((path, v));
            }
        }
        Value::Bool(b) => out.push((path, if *b { 1.0 } else { 0.0 })),
        Value::Object(map) => {
            for (key, child) in map {
                let child_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", path, key)
                };
                collect_leaves(child, child_path, out);
            }
        }
        Value::Array(items) => {
            for (i, child) in items.iter().enumerate() {
                collect_leaves(child, format!("{}[{}]", path, i), out);
            }
        }
        Value::Null | Value::String(_) => {}
    }
}
