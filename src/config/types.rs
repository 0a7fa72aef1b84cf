//! Configuration data types.

use crate::exporter::DEFAULT_LOG_CONTENT_LIMIT;
use crate::reporter::FieldMapping;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Global settings
    #[serde(default)]
    pub global: GlobalConfig,

    /// HTTP client settings shared by all exporters
    #[serde(default)]
    pub client: ClientConfig,

    /// Exporter definitions (one per endpoint)
    #[serde(default)]
    pub exporters: Vec<ExporterConfig>,
}

/// Global configuration settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GlobalConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,

    /// Bytes of response content included in export error events (0 = none)
    #[serde(default = "default_log_content_limit")]
    pub log_content_limit: usize,

    /// Metrics endpoint configuration
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: LogFormat::Json,
            log_content_limit: default_log_content_limit(),
            metrics: MetricsConfig::default(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
}

/// Metrics endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MetricsConfig {
    /// Address to bind metrics server
    #[serde(default = "default_metrics_address")]
    pub address: SocketAddr,

    /// Path for metrics endpoint
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            address: default_metrics_address(),
            path: default_metrics_path(),
        }
    }
}

/// HTTP client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    /// Overall request timeout (connect, headers and body)
    #[serde(default = "default_client_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: default_client_timeout(),
        }
    }
}

/// One exporter bound to one endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExporterConfig {
    /// Unique name, used in logs and self-metrics
    pub name: String,

    /// Base endpoint url
    pub endpoint: String,

    /// Suffix appended to the endpoint on every cycle (must start with '/')
    #[serde(default)]
    pub suffix: Option<String>,

    /// Prefix for every metric this exporter registers
    #[serde(default)]
    pub prefix: Option<String>,

    /// How responses are mapped to metrics
    #[serde(default)]
    pub reporter: ReporterConfig,
}

/// Reporter selection.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ReporterConfig {
    /// Every numeric leaf becomes a gauge
    Flatten {
        #[serde(default)]
        include: Vec<String>,
    },
    /// Explicit JSON pointer mappings
    Fields { metrics: Vec<FieldMapping> },
}

impl Default for ReporterConfig {
    fn default() -> Self {
        ReporterConfig::Flatten {
            include: Vec::new(),
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> LogFormat {
    LogFormat::Json
}

fn default_log_content_limit() -> usize {
    DEFAULT_LOG_CONTENT_LIMIT
}

fn default_metrics_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 9100))
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

fn default_client_timeout() -> Duration {
    Duration::from_secs(10)
}

/// Custom serde module for humantime durations.
mod humantime_serde {
    use serde::{self, Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let s = humantime::format_duration(*duration).to_string();
        serializer.serialize_str(&s)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        humantime::parse_duration(&s).map_err(serde::de::Error::custom)
    }
}
