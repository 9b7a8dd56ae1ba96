//! Danglewatch - Certificate Transparency Dangling DNS Monitor

use anyhow::Result;
use clap::Parser;
use danglewatch::{app::App, cli::Cli, config::Config, internal_metrics::MetricsBuilder};
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration by layering sources: defaults, file, environment, and CLI args.
    let config = match Config::load(&cli) {
        Ok(config) => config,
        Err(err) => {
            tracing_subscriber::fmt()
                .with_env_filter(EnvFilter::new("error"))
                .with_writer(std::io::stderr)
                .init();
            error!("Failed to load configuration: {:#}", err);
            std::process::exit(1);
        }
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    info!("Danglewatch starting up...");
    info!("-------------------- Configuration --------------------");
    info!("Log Level: {}", config.log_level);
    info!("Targets File: {}", config.paths.targets_file.display());
    info!("Output Directory: {}", config.paths.output_dir.display());
    info!("Ledger File: {}", config.paths.ledger_file.display());
    info!("Source URL: {}", config.source.url);
    info!("Lookback: {} day(s)", config.source.lookback_days);
    info!("Max Records per Target: {}", config.source.max_records);
    info!("Source Attempts: {}", config.source.retry_attempts);
    info!(
        "DNS Resolver: {}",
        config.dns.resolver.as_deref().unwrap_or("System Default")
    );
    info!("DNS Timeout: {}ms", config.dns.timeout_ms);
    info!("Probe Timeout: {}ms", config.probe.timeout_ms);
    info!("Probe Concurrency: {}", config.probe.concurrency);
    match &config.notification.hook {
        Some(hook) => info!("Notification Hook: {}", hook.display()),
        None => info!("Notification Hook: Disabled"),
    }
    info!("Cycle Interval: {}s", config.scheduler.interval_seconds);
    info!(
        "Metrics: {}",
        if config.metrics.enabled {
            config.metrics.listen_address.to_string()
        } else {
            "Disabled".to_string()
        }
    );
    info!("-------------------------------------------------------");

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let metrics_task = match MetricsBuilder::new(config.metrics.clone())
        .build(shutdown_rx.clone())
        .await
    {
        Ok(Some((server, addr))) => {
            info!("Metrics server listening on http://{}/metrics", addr);
            Some(tokio::spawn(server.run()))
        }
        Ok(None) => None,
        Err(e) => {
            warn!("Metrics disabled: {:#}", e);
            None
        }
    };

    let mut app = match App::builder(config).build().await {
        Ok(app) => app,
        Err(e) => {
            error!("Failed to start: {:#}", e);
            std::process::exit(1);
        }
    };

    if cli.once {
        tokio::select! {
            result = app.run_once() => {
                if let Err(e) = result {
                    error!("Cycle failed: {:#}", e);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted. Shutting down...");
            }
        }
    } else {
        tokio::select! {
            result = app.run(shutdown_rx) => {
                if let Err(e) = result {
                    error!("Scheduler stopped: {:#}", e);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted. Shutting down...");
            }
        }
    }

    let _ = shutdown_tx.send(true);
    if let Some(handle) = metrics_task {
        if let Err(e) = handle.await {
            error!("Metrics task panicked: {:?}", e);
        }
    }

    info!("Exiting.");
    Ok(())
}
