//! rustexporter - Prometheus metrics from JSON HTTP endpoints
//!
//! Usage:
//!     rustexporter --config <path>
//!
//! See --help for more options.

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use rustexporter::config::{load_config, Config, ReporterConfig};
use rustexporter::exporter::ExporterSet;
use rustexporter::metrics::{MetricsRegistry, MetricsServer};
use rustexporter::provider::HttpContentProvider;
use rustexporter::util::{init_logging, ShutdownSignal};

/// Expose JSON HTTP endpoints as Prometheus metrics.
#[derive(Parser, Debug)]
#[command(name = "rustexporter")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, value_name = "FILE")]
    config: PathBuf,

    /// Override log level (trace, debug, info, warn, error)
    #[arg(short, long, value_name = "LEVEL")]
    log_level: Option<String>,

    /// Validate configuration and exit
    #[arg(long)]
    validate: bool,

    /// Run every exporter once, print the metrics and exit
    #[arg(long, conflicts_with = "validate")]
    once: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(&cli.config).with_context(|| {
        format!(
            "failed to load configuration from '{}'",
            cli.config.display()
        )
    })?;

    // CLI overrides config
    let log_level = cli
        .log_level
        .as_deref()
        .unwrap_or(&config.global.log_level);

    init_logging(log_level, &config.global.log_format)
        .context("failed to initialize logging")?;

    if cli.validate {
        info!("Configuration is valid");
        println!("Configuration is valid.");
        println!("  Exporters: {}", config.exporters.len());
        for exporter in &config.exporters {
            let reporter = match &exporter.reporter {
                ReporterConfig::Flatten { .. } => "flatten".to_string(),
                ReporterConfig::Fields { metrics } => format!("fields ({})", metrics.len()),
            };
            println!(
                "    - {} -> {}{} [{}]",
                exporter.name,
                exporter.endpoint,
                exporter.suffix.as_deref().unwrap_or(""),
                reporter
            );
        }
        return Ok(());
    }

    info!(
        config_path = %cli.config.display(),
        exporters = config.exporters.len(),
        "rustexporter starting"
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to create tokio runtime")?;

    runtime.block_on(async {
        if cli.once {
            run_once(config).await
        } else {
            run(config).await
        }
    })
}

fn build(config: &Config) -> (MetricsRegistry, ExporterSet) {
    let registry = MetricsRegistry::new();
    let provider = Arc::new(HttpContentProvider::new(config.client.timeout));
    let exporters = ExporterSet::from_config(config, provider, &registry);
    (registry, exporters)
}

/// Run one round of exports and print the encoded registry.
async fn run_once(config: Config) -> Result<()> {
    let (registry, exporters) = build(&config);

    let summary = exporters.export_all().await;
    let text = registry.encode().context("failed to encode metrics")?;
    print!("{}", text);

    if !summary.is_success() {
        for (name, error) in &summary.failed {
            warn!(exporter = %name, error = %error, "export failed");
        }
        bail!(
            "{} of {} exporters failed",
            summary.failed.len(),
            exporters.len()
        );
    }
    Ok(())
}

/// Serve scrapes until Ctrl+C.
async fn run(config: Config) -> Result<()> {
    let (registry, exporters) = build(&config);
    let shutdown = ShutdownSignal::new();

    let server = MetricsServer::new(
        config.global.metrics.address,
        config.global.metrics.path.clone(),
        registry,
        exporters,
    );
    let listener = server.bind().await.with_context(|| {
        format!(
            "failed to bind metrics server on {}",
            config.global.metrics.address
        )
    })?;

    let handle = tokio::spawn(server.serve(listener, shutdown.subscribe()));

    info!("rustexporter is running");
    info!("press Ctrl+C to stop");

    shutdown.shutdown_on_ctrl_c().await;
    handle.await.context("metrics server task failed")?;

    info!("rustexporter shut down complete");
    Ok(())
}
