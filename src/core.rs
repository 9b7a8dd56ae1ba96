//! Core domain types and service traits for danglewatch
//!
//! This module defines the fundamental data structures and trait contracts
//! that govern component interactions throughout the application.

use crate::dns::DnsError;
use crate::notification::HookError;
use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use serde_with::{serde_as, DefaultOnNull};
use std::fmt;
use std::net::IpAddr;

/// A monitored domain, trimmed and lowercased.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TargetDomain(String);

impl TargetDomain {
    pub fn new(raw: &str) -> Self {
        Self(raw.trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The name of this target's result file inside the output directory.
    pub fn output_file_name(&self) -> String {
        self.0.replace('.', "_")
    }

    /// Returns `true` if `name` is this domain or one of its subdomains.
    ///
    /// `name` must already be normalized. The match requires a label boundary,
    /// so `evilexample.com` is not considered part of `example.com`.
    pub fn covers(&self, name: &str) -> bool {
        name == self.0
            || name
                .strip_suffix(self.0.as_str())
                .is_some_and(|prefix| prefix.ends_with('.'))
    }
}

impl fmt::Display for TargetDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalizes a certificate subject name: trims, lowercases, and strips any
/// leading wildcard labels.
pub fn normalize_name(raw: &str) -> String {
    raw.trim().to_lowercase().trim_start_matches("*.").to_string()
}

/// A single issuance record as returned by the certificate aggregator.
#[serde_as]
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CertificateRecord {
    /// Opaque identifier of the issuance record. Not unique per domain.
    #[serde(default, deserialize_with = "deserialize_id")]
    pub id: String,
    /// One or more newline-separated subject names.
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub name_value: String,
    /// Only used for ordering; never parsed.
    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub entry_timestamp: String,
}

impl CertificateRecord {
    /// Iterates over the non-empty subject names carried by this record.
    pub fn subject_names(&self) -> impl Iterator<Item = &str> {
        self.name_value
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
    }
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Number(u64),
        Text(String),
        Missing(()),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Number(n) => n.to_string(),
        RawId::Text(s) => s,
        RawId::Missing(()) => String::new(),
    })
}

/// Transport-level classification of a failed HTTP probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpErrorKind {
    Timeout,
    Refused,
    Error,
}

impl fmt::Display for HttpErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            HttpErrorKind::Timeout => "timeout",
            HttpErrorKind::Refused => "refused",
            HttpErrorKind::Error => "error",
        })
    }
}

/// The outcome of the HTTP half of a liveness probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpOutcome {
    /// The endpoint answered with this status code, whatever its value.
    Responded(u16),
    Failed(HttpErrorKind),
}

impl fmt::Display for HttpOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpOutcome::Responded(status) => write!(f, "{}", status),
            HttpOutcome::Failed(kind) => write!(f, "{}", kind),
        }
    }
}

/// Combined DNS and HTTP result for a discovered domain.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LivenessOutcome {
    pub dns_ip: Option<IpAddr>,
    /// `None` when the HTTP check was skipped because DNS did not resolve.
    pub http: Option<HttpOutcome>,
}

impl LivenessOutcome {
    pub fn unresolved() -> Self {
        Self::default()
    }

    pub fn resolved(ip: IpAddr, http: HttpOutcome) -> Self {
        Self {
            dns_ip: Some(ip),
            http: Some(http),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Ok,
    Dangling,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Verdict::Ok => "OK",
            Verdict::Dangling => "DANGLING",
        })
    }
}

/// The persisted unit for a domain discovered in steady state.
///
/// Renders as `domain|dns_result|http_result|verdict`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveryResult {
    pub domain: String,
    pub liveness: LivenessOutcome,
    pub verdict: Verdict,
}

impl fmt::Display for DiscoveryResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dns = self
            .liveness
            .dns_ip
            .map(|ip| ip.to_string())
            .unwrap_or_else(|| "N/A".to_string());
        let http = self
            .liveness
            .http
            .map(|http| http.to_string())
            .unwrap_or_else(|| "N/A".to_string());
        write!(f, "{}|{}|{}|{}", self.domain, dns, http, self.verdict)
    }
}

/// Summary of a single discovery cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub baseline: bool,
    pub targets_processed: usize,
    pub targets_failed: usize,
    pub certificates_examined: usize,
    pub new_domains: usize,
    pub probed: usize,
    pub dangling: usize,
    pub lines_written: usize,
}

// =============================================================================
// Service Traits
// =============================================================================

/// Queries the certificate transparency aggregator.
#[async_trait]
pub trait CertificateSource: Send + Sync {
    /// Fetches recent certificate records for names under `target`.
    ///
    /// # Returns
    /// * `Ok(records)` in whatever order the source produced them
    /// * `Err` for network, status, or parse failures; callers treat this as
    ///   an empty batch for this cycle
    async fn fetch(&self, target: &TargetDomain) -> Result<Vec<CertificateRecord>>;
}

/// Resolves domain names to an address.
#[async_trait]
pub trait DnsResolver: Send + Sync {
    /// Resolves a domain to a single address, preferring IPv4.
    ///
    /// # Returns
    /// * `Ok(IpAddr)` on successful resolution
    /// * `Err` for any failure, including NXDOMAIN and timeouts
    async fn resolve(&self, domain: &str) -> Result<IpAddr, DnsError>;
}

/// Checks whether a domain answers over HTTP(S).
#[async_trait]
pub trait HttpProbe: Send + Sync {
    async fn probe(&self, domain: &str) -> HttpOutcome;
}

/// Receives the once-per-cycle notification trigger.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// A short, descriptive name used for logging.
    fn name(&self) -> &str;

    async fn notify(&self) -> Result<(), HookError>;
}
