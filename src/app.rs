//! The main application logic, decoupled from the entry point.

use crate::{
    baseline::BaselineGate,
    config::{Config, SchedulerConfig},
    core::{CertificateSource, CycleReport, DnsResolver, HttpProbe, NotificationSink, TargetDomain},
    dns::HickoryDnsResolver,
    engine::{DiscoveryEngine, EngineSettings},
    ledger::SeenDomainLedger,
    liveness::{LivenessProber, ReqwestHttpProbe},
    network::CrtShClient,
    notification::{CommandHook, NoopSink},
    outputs::ResultWriter,
    targets::TargetRegistry,
};
use anyhow::{anyhow, Result};
use chrono::Local;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, instrument};

/// A fully wired monitor, ready to run cycles.
pub struct App {
    engine: DiscoveryEngine,
    scheduler: SchedulerConfig,
}

impl App {
    /// Creates a new `AppBuilder` to construct an `App`.
    pub fn builder(config: Config) -> AppBuilder {
        AppBuilder::new(config)
    }

    pub fn engine(&self) -> &DiscoveryEngine {
        &self.engine
    }

    /// Runs a single cycle, converting a panic inside it into an error.
    pub async fn run_once(&mut self) -> Result<CycleReport> {
        let outcome = AssertUnwindSafe(self.engine.run_cycle()).catch_unwind().await;
        match outcome {
            Ok(Ok(report)) => Ok(report),
            Ok(Err(e)) => {
                metrics::counter!("cycle_failures_total").increment(1);
                Err(e)
            }
            Err(panic) => {
                metrics::counter!("cycle_failures_total").increment(1);
                Err(anyhow!("cycle panicked: {}", panic_message(panic.as_ref())))
            }
        }
    }

    /// Runs cycles until the shutdown signal fires.
    ///
    /// A failed cycle never stops the loop; it only switches the pause to the
    /// error cooldown. Shutdown is observed between cycles and during the pause.
    pub async fn run(mut self, mut shutdown_rx: watch::Receiver<bool>) -> Result<()> {
        let mut cycle: u64 = 0;
        loop {
            if *shutdown_rx.borrow() {
                break;
            }
            cycle += 1;
            info!(
                "=== Cycle #{} at {} ===",
                cycle,
                Local::now().format("%Y-%m-%d %H:%M:%S")
            );

            let pause = match self.run_once().await {
                Ok(report) => {
                    info!(
                        cycle,
                        baseline = report.baseline,
                        new_domains = report.new_domains,
                        dangling = report.dangling,
                        failed_targets = report.targets_failed,
                        "Cycle complete"
                    );
                    self.scheduler.interval()
                }
                Err(e) => {
                    error!(cycle, error = ?e, "Cycle failed");
                    self.scheduler.error_cooldown()
                }
            };

            info!("Sleeping {}s...", pause.as_secs());
            tokio::select! {
                biased;
                _ = shutdown_rx.changed() => break,
                _ = tokio::time::sleep(pause) => {}
            }
        }
        info!("Scheduler stopped after {} cycle(s).", cycle);
        Ok(())
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Builder for the main application.
///
/// Every external collaborator can be overridden, which is how the integration
/// tests run whole cycles without touching the network.
pub struct AppBuilder {
    config: Config,
    targets_override: Option<Vec<TargetDomain>>,
    certificate_source_override: Option<Arc<dyn CertificateSource>>,
    dns_resolver_override: Option<Arc<dyn DnsResolver>>,
    http_probe_override: Option<Arc<dyn HttpProbe>>,
    notification_override: Option<Arc<dyn NotificationSink>>,
}

impl AppBuilder {
    /// Creates a new `AppBuilder` with the given configuration.
    pub fn new(config: Config) -> Self {
        Self {
            config,
            targets_override: None,
            certificate_source_override: None,
            dns_resolver_override: None,
            http_probe_override: None,
            notification_override: None,
        }
    }

    /// Uses these targets instead of reading the targets file.
    pub fn targets(mut self, targets: Vec<TargetDomain>) -> Self {
        self.targets_override = Some(targets);
        self
    }

    pub fn certificate_source_override(mut self, source: Arc<dyn CertificateSource>) -> Self {
        self.certificate_source_override = Some(source);
        self
    }

    /// Overrides the DNS resolver for testing.
    pub fn dns_resolver_override(mut self, resolver: Arc<dyn DnsResolver>) -> Self {
        self.dns_resolver_override = Some(resolver);
        self
    }

    pub fn http_probe_override(mut self, probe: Arc<dyn HttpProbe>) -> Self {
        self.http_probe_override = Some(probe);
        self
    }

    pub fn notification_override(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.notification_override = Some(sink);
        self
    }

    /// Loads on-disk state and wires every component into a runnable `App`.
    ///
    /// A missing or empty targets file is fatal. A missing ledger is not.
    #[instrument(skip_all)]
    pub async fn build(self) -> Result<App> {
        let config = self.config;

        let targets = match self.targets_override {
            Some(targets) => targets,
            None => TargetRegistry::load(&config.paths.targets_file)?,
        };
        let names: Vec<&str> = targets.iter().map(TargetDomain::as_str).collect();
        info!("Monitoring {} target(s): {}", targets.len(), names.join(", "));

        let writer = ResultWriter::new(&config.paths.output_dir);
        writer.ensure_dir()?;

        let ledger = SeenDomainLedger::load(&config.paths.ledger_file);
        info!("Loaded {} known subdomains", ledger.len());

        let gate = BaselineGate::new(&config.paths.baseline_marker);
        if gate.is_baseline() {
            info!("First run: recording existing subdomains without alerting");
        }

        let source: Arc<dyn CertificateSource> = match self.certificate_source_override {
            Some(source) => source,
            None => Arc::new(CrtShClient::from_config(&config.source)?),
        };

        let resolver: Arc<dyn DnsResolver> = match self.dns_resolver_override {
            Some(resolver) => resolver,
            None => {
                let (resolver, nameservers) = HickoryDnsResolver::from_config(&config.dns)?;
                let nameservers: Vec<String> = nameservers.iter().map(ToString::to_string).collect();
                info!("Resolving through {}", nameservers.join(", "));
                Arc::new(resolver)
            }
        };

        let http: Arc<dyn HttpProbe> = match self.http_probe_override {
            Some(probe) => probe,
            None => Arc::new(ReqwestHttpProbe::from_config(&config.probe)?),
        };

        let notifier: Arc<dyn NotificationSink> = match self.notification_override {
            Some(sink) => sink,
            None => match CommandHook::from_config(&config.notification) {
                Some(hook) => Arc::new(hook),
                None => Arc::new(NoopSink),
            },
        };

        let settings = EngineSettings {
            max_records: config.source.max_records,
            target_delay: config.scheduler.target_delay(),
            probe_concurrency: config.probe.concurrency,
        };

        let engine = DiscoveryEngine::new(
            targets,
            source,
            LivenessProber::new(resolver, http),
            notifier,
            gate,
            writer,
            ledger,
            settings,
        );

        Ok(App {
            engine,
            scheduler: config.scheduler,
        })
    }
}
