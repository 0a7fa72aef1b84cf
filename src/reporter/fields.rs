//! Reporter driven by an explicit list of JSON pointers.

use super::MetricReporter;
use crate::collectors::{Collectors, Labels, MetricKind, ReportError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// One field to export.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct FieldMapping {
    /// RFC 6901 pointer into the response, e.g. `/metrics/cpu/load`.
    pub pointer: String,

    /// Metric name (without the exporter prefix).
    pub name: String,

    /// Gauge values are overwritten. Counter values are added on every
    /// cycle, so a counter mapping must point at a per-cycle delta; map a
    /// field that is already a running total as a gauge.
    #[serde(default)]
    pub kind: MetricKind,

    #[serde(default)]
    pub help: String,

    /// Constant labels for this series.
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

/// Reports a fixed set of fields. Every field must be present and numeric,
/// otherwise the whole report is rejected.
#[derive(Debug, Clone, Default)]
pub struct FieldReporter {
    mappings: Vec<FieldMapping>,
}

impl FieldReporter {
    pub fn new(mappings: Vec<FieldMapping>) -> Self {
        Self { mappings }
    }

    pub fn mappings(&self) -> &[FieldMapping] {
        &self.mappings
    }
}

impl MetricReporter<Value> for FieldReporter {
    fn report(&self, component: &Value, collectors: &Collectors) -> Result<(), ReportError> {
        let mut batch = collectors.batch();

        for mapping in &self.mappings {
            let value = match component.pointer(&mapping.pointer) {
                None | Some(Value::Null) => {
                    return Err(ReportError::MissingField(mapping.pointer.clone()));
                }
                Some(Value::Bool(b)) => {
                    if *b {
                        1.0
                    } else {
                        0.0
                    }
                }
                Some(Value::Number(n)) => n.as_f64().ok_or_else(|| ReportError::NotNumeric {
                    pointer: mapping.pointer.clone(),
                    found: n.to_string(),
                })?,
                Some(other) => {
                    return Err(ReportError::NotNumeric {
                        pointer: mapping.pointer.clone(),
                        found: json_type(other).to_string(),
                    });
                }
            };

            let labels: Labels = mapping
                .labels
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            batch.observe(mapping.kind, &mapping.name, &mapping.help, labels, value);
        }

        batch.commit()?;
        Ok(())
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricsRegistry;
    use serde_json::json;

    fn mapping(pointer: &str, name: &str, kind: MetricKind) -> FieldMapping {
        FieldMapping {
            pointer: pointer.to_string(),
            name: name.to_string(),
            kind,
            help: String::new(),
            labels: BTreeMap::new(),
        }
    }

    fn collectors() -> Collectors {
        Collectors::new(None, MetricsRegistry::new())
    }

    #[test]
    fn test_field_reporter_maps_fields() {
        let mut labelled = mapping("/hosts/0/load", "host_load", MetricKind::Gauge);
        labelled.labels.insert("host".to_string(), "h0".to_string());

        let reporter = FieldReporter::new(vec![
            mapping("/value", "value", MetricKind::Gauge),
            mapping("/requests", "requests", MetricKind::Counter),
            labelled,
        ]);
        let doc = json!({"value": 42, "requests": 5, "hosts": [{"load": 0.25}]});

        let collectors = collectors();
        reporter.report(&doc, &collectors).unwrap();
        reporter.report(&doc, &collectors).unwrap();

        assert_eq!(collectors.len(), 3);
        assert_eq!(collectors.get("value").unwrap().get(), Some(42.0));
        assert_eq!(collectors.get("requests").unwrap().get(), Some(10.0));
        let host = vec![("host".to_string(), "h0".to_string())];
        assert_eq!(collectors.get("host_load").unwrap().value(&host), Some(0.25));
    }

    #[test]
    fn test_missing_field_rejects_report() {
        let reporter = FieldReporter::new(vec![
            mapping("/value", "value", MetricKind::Gauge),
            mapping("/absent", "absent", MetricKind::Gauge),
        ]);
        let collectors = collectors();

        let err = reporter.report(&json!({"value": 1}), &collectors).unwrap_err();
        assert!(matches!(err, ReportError::MissingField(ref p) if p == "/absent"));
        assert!(collectors.is_empty());
    }

    #[test]
    fn test_null_field_is_missing() {
        let reporter = FieldReporter::new(vec![mapping("/value", "value", MetricKind::Gauge)]);
        let err = reporter
            .report(&json!({"value": null}), &collectors())
            .unwrap_err();
        assert!(matches!(err, ReportError::MissingField(_)));
    }

    #[test]
    fn test_non_numeric_field() {
        let reporter = FieldReporter::new(vec![mapping("/value", "value", MetricKind::Gauge)]);
        let err = reporter
            .report(&json!({"value": "42"}), &collectors())
            .unwrap_err();
        assert!(matches!(err, ReportError::NotNumeric { ref found, .. } if found == "string"));
    }

    #[test]
    fn test_mapping_from_yaml() {
        let yaml = r#"
pointer: /metrics/load
name: load
kind: counter
labels:
  cluster: c1
"#;
        let m: FieldMapping = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(m.kind, MetricKind::Counter);
        assert_eq!(m.labels.get("cluster").map(String::as_str), Some("c1"));
        assert!(m.help.is_empty());
    }

    #[test]
    fn test_counter_mapping_adds_each_cycle() {
        let reporter = FieldReporter::new(vec![mapping("/delta", "requests", MetricKind::Counter)]);
        let collectors = collectors();

        for delta in [3, 0, 4] {
            reporter.report(&json!({"delta": delta}), &collectors).unwrap();
        }
        assert_eq!(collectors.get("requests").unwrap().get(), Some(7.0));
    }

    #[test]
    fn test_duplicate_mapping_rejected() {
        let reporter = FieldReporter::new(vec![
            mapping("/a", "value", MetricKind::Gauge),
            mapping("/b", "value", MetricKind::Gauge),
        ]);
        let collectors = collectors();

        let err = reporter
            .report(&json!({"a": 1, "b": 2}), &collectors)
            .unwrap_err();
        assert!(matches!(err, ReportError::DuplicateSeries { ref name, .. } if name == "value"));
        assert!(collectors.is_empty());
    }
}
