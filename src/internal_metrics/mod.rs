//! # Internal Metrics Module
//!
//! Metrics are recorded through the `metrics` facade macros at their call
//! sites. This module registers their descriptions and, when enabled, installs
//! a Prometheus recorder served by [`server::MetricsServer`].
//!
//! When metrics are disabled no recorder is installed and every macro call is
//! a no-op.

pub mod server;

use crate::config::MetricsConfig;
use crate::internal_metrics::server::MetricsServer;
use anyhow::{Context, Result};
use metrics::Unit;
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::watch;

/// Registers descriptions for every metric the application emits.
pub fn describe_metrics() {
    metrics::describe_counter!("cycles_total", Unit::Count, "Total number of completed discovery cycles, labeled by mode.");
    metrics::describe_counter!("cycle_failures_total", Unit::Count, "Total number of cycles that ended in an error or panic.");
    metrics::describe_counter!("certificates_examined_total", Unit::Count, "Total number of certificate records routed through the pipeline.");
    metrics::describe_counter!("source_failures_total", Unit::Count, "Total number of certificate source queries that yielded no batch.");
    metrics::describe_counter!("domains_discovered_total", Unit::Count, "Total number of new subdomains recorded in the ledger, labeled by mode.");
    metrics::describe_counter!("dangling_domains_total", Unit::Count, "Total number of domains classified as dangling.");
    metrics::describe_counter!("ledger_write_failures_total", Unit::Count, "Total number of ledger entries that could not be persisted.");
    metrics::describe_counter!("output_write_failures_total", Unit::Count, "Total number of result lines that could not be written.");
    metrics::describe_counter!("hook_failures_total", Unit::Count, "Total number of failed notification hook invocations.");
    metrics::describe_counter!("dns_queries_total", Unit::Count, "Total number of DNS queries performed, labeled by their outcome.");
    metrics::describe_histogram!("cycle_duration_seconds", Unit::Seconds, "Wall-clock duration of a discovery cycle.");
    metrics::describe_histogram!("probe_duration_seconds", Unit::Seconds, "Duration of a full DNS and HTTP liveness probe.");
    metrics::describe_histogram!("dns_resolution_duration_seconds", Unit::Seconds, "A histogram of the latency for DNS resolutions.");
}

/// Builder for the metrics system.
pub struct MetricsBuilder {
    config: MetricsConfig,
}

impl MetricsBuilder {
    /// Creates a new `MetricsBuilder` with the given configuration.
    pub fn new(config: MetricsConfig) -> Self {
        Self { config }
    }

    /// Installs the Prometheus recorder and returns a server ready to be
    /// spawned, with the address it is bound to.
    ///
    /// Returns `Ok(None)` when metrics are disabled.
    pub async fn build(
        self,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Result<Option<(MetricsServer, SocketAddr)>> {
        if !self.config.enabled {
            return Ok(None);
        }

        let recorder = PrometheusBuilder::new()
            .set_buckets_for_metric(
                Matcher::Suffix("duration_seconds".to_string()),
                &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0],
            )?
            .build_recorder();
        let handle = recorder.handle();

        // Bind before installing the recorder so a bad address leaves the
        // global recorder untouched.
        let listener = TcpListener::bind(self.config.listen_address)
            .await
            .with_context(|| {
                format!("Failed to bind metrics server to {}", self.config.listen_address)
            })?;
        let addr = listener.local_addr()?;

        metrics::set_global_recorder(recorder)
            .map_err(|e| anyhow::anyhow!("Failed to install Prometheus recorder: {}", e))?;
        describe_metrics();

        Ok(Some((MetricsServer::new(listener, handle, shutdown_rx), addr)))
    }
}
