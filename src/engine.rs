//! The discovery engine: one cycle over all targets.
//!
//! The engine exclusively owns the mutable discovery state: the set of
//! certificate ids processed during this process lifetime, the seen-domain
//! ledger, and the result files. Dedup decisions are made sequentially for the
//! whole cycle before any probing starts, so a domain is never recorded or
//! probed twice.

use crate::{
    baseline::BaselineGate,
    classifier,
    core::{
        normalize_name, CertificateRecord, CertificateSource, CycleReport, DiscoveryResult,
        NotificationSink, TargetDomain, Verdict,
    },
    ledger::SeenDomainLedger,
    liveness::LivenessProber,
    network::prepare_batch,
    outputs::ResultWriter,
};
use anyhow::Result;
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// Tunables for a discovery cycle.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub max_records: usize,
    pub target_delay: Duration,
    pub probe_concurrency: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_records: 15,
            target_delay: Duration::from_secs(2),
            probe_concurrency: 1,
        }
    }
}

/// A newly discovered domain waiting for its liveness probe.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingProbe {
    target: TargetDomain,
    domain: String,
}

pub struct DiscoveryEngine {
    targets: Vec<TargetDomain>,
    source: Arc<dyn CertificateSource>,
    prober: LivenessProber,
    notifier: Arc<dyn NotificationSink>,
    gate: BaselineGate,
    writer: ResultWriter,
    ledger: SeenDomainLedger,
    processed_certs: HashSet<String>,
    settings: EngineSettings,
}

impl DiscoveryEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        targets: Vec<TargetDomain>,
        source: Arc<dyn CertificateSource>,
        prober: LivenessProber,
        notifier: Arc<dyn NotificationSink>,
        gate: BaselineGate,
        writer: ResultWriter,
        ledger: SeenDomainLedger,
        settings: EngineSettings,
    ) -> Self {
        Self {
            targets,
            source,
            prober,
            notifier,
            gate,
            writer,
            ledger,
            processed_certs: HashSet::new(),
            settings,
        }
    }

    pub fn ledger(&self) -> &SeenDomainLedger {
        &self.ledger
    }

    /// Runs one full cycle over every target.
    ///
    /// Baseline mode is read from the gate at the start of each call. Source
    /// failures and write failures are absorbed; only a failure to persist the
    /// baseline marker is returned as an error.
    #[instrument(skip_all, fields(baseline))]
    pub async fn run_cycle(&mut self) -> Result<CycleReport> {
        let start_time = Instant::now();
        let baseline = self.gate.is_baseline();
        tracing::Span::current().record("baseline", baseline);

        let mut report = CycleReport {
            baseline,
            ..Default::default()
        };
        let mut pending = Vec::new();

        let targets = self.targets.clone();
        let total = targets.len();
        for (idx, target) in targets.iter().enumerate() {
            info!("[{}/{}] {}...", idx + 1, total, target);

            let records = match self.source.fetch(target).await {
                Ok(records) => records,
                Err(e) => {
                    warn!(target = %target, error = %e, "Certificate source failed, skipping target this cycle");
                    metrics::counter!("source_failures_total").increment(1);
                    report.targets_failed += 1;
                    Vec::new()
                }
            };

            let batch = prepare_batch(records, self.settings.max_records);
            for record in &batch {
                let new_domains = self.discover(record, target, &mut report);
                if !baseline {
                    pending.extend(new_domains.into_iter().map(|domain| PendingProbe {
                        target: target.clone(),
                        domain,
                    }));
                }
            }
            report.targets_processed += 1;

            if idx + 1 < total && !self.settings.target_delay.is_zero() {
                tokio::time::sleep(self.settings.target_delay).await;
            }
        }

        let mode = if baseline { "baseline" } else { "steady" };
        metrics::counter!("domains_discovered_total", "mode" => mode).increment(report.new_domains as u64);

        if baseline {
            self.gate.mark_complete()?;
            self.writer.purge(&self.targets);
            info!(
                recorded = report.new_domains,
                "Initialization complete, alerts enabled from the next cycle"
            );
        } else {
            self.probe_all(pending, &mut report).await;
            info!("Sending notifications via {}", self.notifier.name());
            if let Err(e) = self.notifier.notify().await {
                warn!(error = %e, "Notification hook failed");
                metrics::counter!("hook_failures_total").increment(1);
            }
        }

        let elapsed = start_time.elapsed();
        metrics::histogram!("cycle_duration_seconds").record(elapsed.as_secs_f64());
        metrics::counter!("cycles_total", "mode" => mode).increment(1);
        info!("Cycle done in {}s", elapsed.as_secs());
        Ok(report)
    }

    /// Applies certificate-id and ledger dedup to one record, recording every
    /// genuinely new subdomain. Returns the names recorded.
    fn discover(
        &mut self,
        record: &CertificateRecord,
        target: &TargetDomain,
        report: &mut CycleReport,
    ) -> Vec<String> {
        if record.id.is_empty() || !self.processed_certs.insert(record.id.clone()) {
            return Vec::new();
        }
        report.certificates_examined += 1;
        metrics::counter!("certificates_examined_total").increment(1);

        let mut recorded = Vec::new();
        for name in record.subject_names() {
            let domain = normalize_name(name);
            if domain.is_empty() || !target.covers(&domain) || self.ledger.contains(&domain) {
                continue;
            }
            self.ledger.record(&domain);
            report.new_domains += 1;
            if report.baseline {
                debug!(domain = %domain, "Baseline: recorded without probing");
            } else {
                info!(domain = %domain, "FOUND");
            }
            recorded.push(domain);
        }
        recorded
    }

    /// Probes pending domains with bounded concurrency and writes each result.
    ///
    /// Writes happen on this task as results arrive, so lines are never
    /// interleaved regardless of probe concurrency.
    async fn probe_all(&mut self, pending: Vec<PendingProbe>, report: &mut CycleReport) {
        if pending.is_empty() {
            return;
        }

        let prober = self.prober.clone();
        let mut results = stream::iter(pending)
            .map(|item| {
                let prober = prober.clone();
                async move {
                    let liveness = prober.probe(&item.domain).await;
                    let verdict = classifier::verdict(&liveness);
                    (
                        item.target,
                        DiscoveryResult {
                            domain: item.domain,
                            liveness,
                            verdict,
                        },
                    )
                }
            })
            .buffer_unordered(self.settings.probe_concurrency.max(1));

        while let Some((target, result)) = results.next().await {
            report.probed += 1;
            log_result(&result);
            if result.verdict == Verdict::Dangling {
                report.dangling += 1;
                metrics::counter!("dangling_domains_total").increment(1);
            }
            match self.writer.append(&target, &result) {
                Ok(()) => report.lines_written += 1,
                Err(e) => {
                    warn!(target = %target, error = ?e, "Failed to write result line");
                    metrics::counter!("output_write_failures_total").increment(1);
                }
            }
        }
    }
}

fn log_result(result: &DiscoveryResult) {
    match result.liveness.dns_ip {
        Some(ip) => info!(domain = %result.domain, "  DNS ok: {}", ip),
        None => info!(domain = %result.domain, "  DNS failed: NXDOMAIN"),
    }
    if let Some(http) = result.liveness.http {
        info!(domain = %result.domain, "  HTTP: {}", http);
    }
    if result.verdict == Verdict::Dangling {
        warn!(domain = %result.domain, "  DANGLING DNS DETECTED");
    }
}
