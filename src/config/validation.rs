//! Configuration validation.

use crate::collectors::{is_valid_label_name, is_valid_metric_name};
use crate::config::{Config, ReporterConfig};
use crate::exporter::compose_url;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};

/// Validate the configuration.
///
/// Checks for:
/// - At least one exporter
/// - Unique, non-empty exporter names
/// - `http://` endpoints without a trailing slash
/// - Suffixes that start with '/'
/// - Valid metric prefixes, field metric names, labels and pointers
/// - Distinct prefixes per exporter (no prefix counts as one value)
/// - Distinct `(name, labels)` pairs within a fields reporter
/// - A known log level and a non-zero client timeout
///
/// # Returns
///
/// `Ok(())` if valid, or an error message describing the problem.
pub fn validate_config(config: &Config) -> Result<(), String> {
    let mut errors = Vec::new();

    if config.exporters.is_empty() {
        errors.push("at least one exporter must be defined".to_string());
    }

    let mut names = HashSet::new();
    let mut prefixes: HashMap<Option<&str>, &str> = HashMap::new();

    for exporter in &config.exporters {
        if exporter.name.is_empty() {
            errors.push("exporter name cannot be empty".to_string());
        }

        if !names.insert(&exporter.name) {
            errors.push(format!("duplicate exporter name: {}", exporter.name));
        }

        if !exporter.endpoint.starts_with("http://") {
            errors.push(format!(
                "exporter '{}' endpoint '{}' must start with http://",
                exporter.name, exporter.endpoint
            ));
        } else if exporter.endpoint.ends_with('/') {
            errors.push(format!(
                "exporter '{}' endpoint '{}' must not end with '/'",
                exporter.name, exporter.endpoint
            ));
        }

        if let Err(e) = compose_url(&exporter.endpoint, exporter.suffix.as_deref()) {
            errors.push(format!("exporter '{}': {}", exporter.name, e));
        }

        if let Some(prefix) = &exporter.prefix {
            if !is_valid_metric_name(prefix) {
                errors.push(format!(
                    "exporter '{}' has invalid metric prefix '{}'",
                    exporter.name, prefix
                ));
            }
        }

        // Exporters sharing a prefix would register the same metric names.
        match prefixes.entry(exporter.prefix.as_deref()) {
            Entry::Occupied(entry) => {
                let prefix = match exporter.prefix.as_deref() {
                    Some(p) => format!("metric prefix '{}'", p),
                    None => "an empty metric prefix".to_string(),
                };
                errors.push(format!(
                    "exporters '{}' and '{}' share {}",
                    entry.get(),
                    exporter.name,
                    prefix
                ));
            }
            Entry::Vacant(entry) => {
                entry.insert(&exporter.name);
            }
        }

        if let ReporterConfig::Fields { metrics } = &exporter.reporter {
            let mut series = HashSet::new();

            if metrics.is_empty() {
                errors.push(format!(
                    "exporter '{}' uses the fields reporter but maps no metrics",
                    exporter.name
                ));
            }

            for mapping in metrics {
                if !is_valid_metric_name(&mapping.name) {
                    errors.push(format!(
                        "exporter '{}' has invalid metric name '{}'",
                        exporter.name, mapping.name
                    ));
                }
                if !mapping.pointer.is_empty() && !mapping.pointer.starts_with('/') {
                    errors.push(format!(
                        "exporter '{}' metric '{}' has invalid pointer '{}' (must start with '/')",
                        exporter.name, mapping.name, mapping.pointer
                    ));
                }
                if !series.insert((&mapping.name, &mapping.labels)) {
                    errors.push(format!(
                        "exporter '{}' maps metric '{}' with labels {:?} more than once",
                        exporter.name, mapping.name, mapping.labels
                    ));
                }
                for label in mapping.labels.keys() {
                    if !is_valid_label_name(label) {
                        errors.push(format!(
                            "exporter '{}' metric '{}' has invalid label name '{}'",
                            exporter.name, mapping.name, label
                        ));
                    }
                }
            }
        }
    }

    if !config.global.metrics.path.starts_with('/') {
        errors.push(format!(
            "metrics path '{}' must start with '/'",
            config.global.metrics.path
        ));
    }

    if config.client.timeout.is_zero() {
        errors.push("client timeout must be greater than zero".to_string());
    }

    // Validate log level
    let valid_levels = ["trace", "debug", "info", "warn", "error"];
    if !valid_levels.contains(&config.global.log_level.to_lowercase().as_str()) {
        errors.push(format!(
            "invalid log level '{}', must be one of: {}",
            config.global.log_level,
            valid_levels.join(", ")
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors.join("; "))
    }
}
