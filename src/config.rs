//! Configuration management for danglewatch
//!
//! This module defines the main `Config` struct and its sub-structs,
//! responsible for holding all application settings. It uses the `figment`
//! crate to layer built-in defaults, a `danglewatch.toml` file, environment
//! variables, and command-line arguments, in that order of precedence.

use crate::cli::Cli;
use anyhow::{bail, ensure, Result};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Config file read from the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "danglewatch.toml";

/// The main configuration struct for the application.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct Config {
    /// The logging level for the application.
    pub log_level: String,
    /// Locations of the target list and on-disk state.
    pub paths: PathsConfig,
    /// Timing of the polling loop.
    pub scheduler: SchedulerConfig,
    /// Configuration for the certificate transparency source.
    pub source: SourceConfig,
    /// Configuration for DNS resolution.
    pub dns: DnsConfig,
    /// Configuration for the HTTP liveness probe.
    pub probe: ProbeConfig,
    /// Configuration for the notification hook.
    pub notification: NotificationConfig,
    /// Configuration for the Prometheus endpoint.
    pub metrics: MetricsConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct PathsConfig {
    /// File listing the monitored domains, one per line.
    pub targets_file: PathBuf,
    /// Directory holding one result file per target.
    pub output_dir: PathBuf,
    /// Append-only ledger of already-seen subdomains.
    pub ledger_file: PathBuf,
    /// Marker file whose presence ends baseline mode.
    pub baseline_marker: PathBuf,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SchedulerConfig {
    /// Pause after a successful cycle.
    pub interval_seconds: u64,
    /// Pause after a failed cycle.
    pub error_cooldown_seconds: u64,
    /// Pause between targets within a cycle, to stay under the source's rate limits.
    pub target_delay_ms: u64,
}

impl SchedulerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_seconds)
    }

    pub fn error_cooldown(&self) -> Duration {
        Duration::from_secs(self.error_cooldown_seconds)
    }

    pub fn target_delay(&self) -> Duration {
        Duration::from_millis(self.target_delay_ms)
    }
}

/// Configuration for the certificate transparency source.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SourceConfig {
    /// The aggregator endpoint.
    pub url: String,
    /// Only certificates issued within this many days are requested.
    pub lookback_days: u32,
    /// Most recent records processed per target per cycle.
    pub max_records: usize,
    /// Request timeout in seconds.
    pub timeout_seconds: u64,
    /// Total attempts per target query (1 disables retry, at most 3).
    pub retry_attempts: u32,
    /// Delay between attempts in seconds.
    pub retry_delay_seconds: u64,
}

/// Configuration for DNS resolution.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct DnsConfig {
    /// The DNS resolver to use, as `ip:port`. Uses the system resolvers when unset.
    pub resolver: Option<String>,
    /// The timeout for a DNS lookup in milliseconds.
    pub timeout_ms: u64,
}

/// Configuration for the HTTP liveness probe.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ProbeConfig {
    /// Per-attempt timeout in milliseconds.
    pub timeout_ms: u64,
    /// Maximum redirects followed per attempt.
    pub max_redirects: usize,
    /// Maximum number of domains probed at once.
    pub concurrency: usize,
}

/// Configuration for the notification hook.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct NotificationConfig {
    /// Executable run once per steady-state cycle. Disabled when unset.
    pub hook: Option<PathBuf>,
    /// The hook is killed after this many seconds.
    pub timeout_seconds: u64,
}

/// Configuration for the metrics system.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct MetricsConfig {
    /// Whether to serve Prometheus metrics.
    pub enabled: bool,
    /// The address the `/metrics` endpoint listens on.
    pub listen_address: SocketAddr,
}

impl Config {
    /// Loads the configuration, layering defaults, the TOML file, environment
    /// variables (e.g. `DANGLEWATCH_SOURCE__LOOKBACK_DAYS=3`) and CLI arguments.
    pub fn load(cli: &Cli) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        figment = match &cli.config {
            Some(path) => {
                if !path.exists() {
                    bail!("Config file not found at specified path: {}", path.display());
                }
                figment.merge(Toml::file(path))
            }
            None => figment.merge(Toml::file(DEFAULT_CONFIG_FILE)),
        };

        let config: Config = figment
            .merge(Env::prefixed("DANGLEWATCH_").split("__"))
            .merge(cli.clone())
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects values the rest of the application cannot work with.
    pub fn validate(&self) -> Result<()> {
        ensure!(
            (1..=3).contains(&self.source.retry_attempts),
            "source.retry_attempts must be between 1 and 3, got {}",
            self.source.retry_attempts
        );
        ensure!(self.source.max_records > 0, "source.max_records must be greater than 0");
        ensure!(self.probe.concurrency > 0, "probe.concurrency must be greater than 0");
        ensure!(self.dns.timeout_ms > 0, "dns.timeout_ms must be greater than 0");
        ensure!(self.probe.timeout_ms > 0, "probe.timeout_ms must be greater than 0");
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            paths: PathsConfig {
                targets_file: PathBuf::from("domains.txt"),
                output_dir: PathBuf::from("results"),
                ledger_file: PathBuf::from("seen_domains.txt"),
                baseline_marker: PathBuf::from(".first_run_complete"),
            },
            scheduler: SchedulerConfig {
                interval_seconds: 300,
                error_cooldown_seconds: 60,
                target_delay_ms: 2000,
            },
            source: SourceConfig {
                url: "https://crt.sh/".to_string(),
                lookback_days: 2,
                max_records: 15,
                timeout_seconds: 30,
                retry_attempts: 1,
                retry_delay_seconds: 5,
            },
            dns: DnsConfig {
                resolver: None,
                timeout_ms: 3000,
            },
            probe: ProbeConfig {
                timeout_ms: 5000,
                max_redirects: 10,
                concurrency: 1,
            },
            notification: NotificationConfig {
                hook: Some(PathBuf::from("./notify.sh")),
                timeout_seconds: 120,
            },
            metrics: MetricsConfig {
                enabled: false,
                listen_address: ([127, 0, 0, 1], 9090).into(),
            },
        }
    }
}
