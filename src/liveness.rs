//! DNS and HTTP(S) reachability probing for discovered domains.
//!
//! The HTTP side is an ordered list of [`ProbeAttempt`]s. Each attempt yields
//! an [`AttemptResult`]; [`fold_attempts`] turns the sequence into a single
//! [`HttpOutcome`]. Attempts stop at the first conclusive result.

use crate::{
    config::ProbeConfig,
    core::{DnsResolver, HttpErrorKind, HttpOutcome, HttpProbe, LivenessOutcome},
};
use anyhow::Result;
use async_trait::async_trait;
use reqwest::redirect::Policy;
use std::{error::Error as StdError, fmt, io, sync::Arc, time::Duration, time::Instant};
use tracing::{debug, trace};

/// URL scheme used by a single probe attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeAttempt {
    Https,
    Http,
}

impl ProbeAttempt {
    /// The reference order: HTTPS first, plain HTTP as the fallback.
    pub fn default_order() -> Vec<ProbeAttempt> {
        vec![ProbeAttempt::Https, ProbeAttempt::Http]
    }

    pub fn url_for(&self, domain: &str) -> String {
        format!("{}://{}/", self, domain)
    }
}

impl fmt::Display for ProbeAttempt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ProbeAttempt::Https => "https",
            ProbeAttempt::Http => "http",
        })
    }
}

/// The classified result of one probe attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptResult {
    Responded(u16),
    Timeout,
    Refused,
    Error,
}

impl AttemptResult {
    /// Conclusive results end the attempt list; `Error` moves on to the next attempt.
    pub fn is_conclusive(&self) -> bool {
        !matches!(self, AttemptResult::Error)
    }
}

/// Folds attempt results, in order, into the final HTTP outcome.
pub fn fold_attempts<I>(results: I) -> HttpOutcome
where
    I: IntoIterator<Item = AttemptResult>,
{
    results
        .into_iter()
        .find_map(|result| match result {
            AttemptResult::Responded(status) => Some(HttpOutcome::Responded(status)),
            AttemptResult::Timeout => Some(HttpOutcome::Failed(HttpErrorKind::Timeout)),
            AttemptResult::Refused => Some(HttpOutcome::Failed(HttpErrorKind::Refused)),
            AttemptResult::Error => None,
        })
        .unwrap_or(HttpOutcome::Failed(HttpErrorKind::Error))
}

/// Maps a request failure onto the attempt result space.
///
/// Timeouts are checked first because reqwest reports connect timeouts as
/// both timeout and connect errors.
pub fn classify_error(err: &reqwest::Error) -> AttemptResult {
    if err.is_timeout() {
        AttemptResult::Timeout
    } else if err.is_connect() || has_connection_io_error(err) {
        AttemptResult::Refused
    } else {
        AttemptResult::Error
    }
}

fn has_connection_io_error(err: &reqwest::Error) -> bool {
    let mut source = err.source();
    while let Some(cause) = source {
        if let Some(io_err) = cause.downcast_ref::<io::Error>() {
            if matches!(
                io_err.kind(),
                io::ErrorKind::ConnectionRefused
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
            ) {
                return true;
            }
        }
        source = cause.source();
    }
    false
}

/// HTTP probe backed by reqwest, sending `HEAD` requests.
///
/// Certificate validation is disabled: the probe measures reachability, not trust.
pub struct ReqwestHttpProbe {
    client: reqwest::Client,
    attempts: Vec<ProbeAttempt>,
}

impl ReqwestHttpProbe {
    pub fn from_config(config: &ProbeConfig) -> Result<Self> {
        Self::new(
            Duration::from_millis(config.timeout_ms),
            config.max_redirects,
            ProbeAttempt::default_order(),
        )
    }

    pub fn new(timeout: Duration, max_redirects: usize, attempts: Vec<ProbeAttempt>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .danger_accept_invalid_certs(true)
            .redirect(Policy::limited(max_redirects))
            .user_agent(concat!("danglewatch/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, attempts })
    }

    async fn attempt(&self, attempt: ProbeAttempt, domain: &str) -> AttemptResult {
        let url = attempt.url_for(domain);
        match self.client.head(&url).send().await {
            Ok(response) => AttemptResult::Responded(response.status().as_u16()),
            Err(e) => {
                let result = classify_error(&e);
                trace!(url = %url, error = %e, ?result, "Probe attempt failed");
                result
            }
        }
    }
}

#[async_trait]
impl HttpProbe for ReqwestHttpProbe {
    async fn probe(&self, domain: &str) -> HttpOutcome {
        let mut results = Vec::with_capacity(self.attempts.len());
        for attempt in &self.attempts {
            let result = self.attempt(*attempt, domain).await;
            results.push(result);
            if result.is_conclusive() {
                break;
            }
        }
        fold_attempts(results)
    }
}

/// Runs the DNS check, then the HTTP check when DNS resolves.
#[derive(Clone)]
pub struct LivenessProber {
    resolver: Arc<dyn DnsResolver>,
    http: Arc<dyn HttpProbe>,
}

impl LivenessProber {
    pub fn new(resolver: Arc<dyn DnsResolver>, http: Arc<dyn HttpProbe>) -> Self {
        Self { resolver, http }
    }

    pub async fn probe(&self, domain: &str) -> LivenessOutcome {
        let start_time = Instant::now();
        let outcome = match self.resolver.resolve(domain).await {
            Ok(ip) => {
                let http = self.http.probe(domain).await;
                LivenessOutcome::resolved(ip, http)
            }
            Err(e) => {
                debug!(domain, error = %e, "DNS did not resolve, skipping HTTP probe");
                LivenessOutcome::unresolved()
            }
        };
        metrics::histogram!("probe_duration_seconds").record(start_time.elapsed().as_secs_f64());
        outcome
    }
}
