//! Client for the crt.sh certificate transparency aggregator.
//!
//! This module builds the per-target query, parses the JSON response into
//! [`CertificateRecord`]s, and orders a batch for processing.

use crate::{
    config::SourceConfig,
    core::{CertificateRecord, CertificateSource, TargetDomain},
};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, NaiveDate, Utc};
use std::time::Duration;
use tracing::{debug, warn};

/// Upper bound on attempts for a single target query.
pub const MAX_ATTEMPTS: u32 = 3;

/// Parses a crt.sh JSON response body.
///
/// # Returns
/// * `Ok(Vec<CertificateRecord>)` for a JSON array of records
/// * `Err` if the body is not valid JSON or not an array
pub fn parse_records(body: &str) -> Result<Vec<CertificateRecord>> {
    let records: Vec<CertificateRecord> = serde_json::from_str(body)?;
    Ok(records)
}

/// Sorts records newest first by `entry_timestamp` and keeps at most `limit`.
///
/// Missing timestamps compare as the empty string and therefore sort last.
pub fn prepare_batch(mut records: Vec<CertificateRecord>, limit: usize) -> Vec<CertificateRecord> {
    records.sort_by(|a, b| b.entry_timestamp.cmp(&a.entry_timestamp));
    records.truncate(limit);
    records
}

/// The `minNotBefore` lower bound for a query issued on `today`.
pub fn min_not_before(today: NaiveDate, lookback_days: u32) -> String {
    (today - ChronoDuration::days(i64::from(lookback_days)))
        .format("%Y-%m-%d")
        .to_string()
}

/// Certificate source querying crt.sh over HTTPS.
pub struct CrtShClient {
    client: reqwest::Client,
    base_url: String,
    lookback_days: u32,
    attempts: u32,
    retry_delay: Duration,
}

impl CrtShClient {
    pub fn from_config(config: &SourceConfig) -> Result<Self> {
        Self::new(
            config.url.clone(),
            config.lookback_days,
            Duration::from_secs(config.timeout_seconds),
            config.retry_attempts,
            Duration::from_secs(config.retry_delay_seconds),
        )
    }

    /// Creates a new crt.sh client.
    ///
    /// # Arguments
    /// * `base_url` - The aggregator endpoint, e.g. `https://crt.sh/`
    /// * `lookback_days` - How far back the issuance window reaches
    /// * `timeout` - Per-request timeout
    /// * `attempts` - Total attempts per query, clamped to `1..=MAX_ATTEMPTS`
    /// * `retry_delay` - Pause between attempts
    pub fn new(
        base_url: String,
        lookback_days: u32,
        timeout: Duration,
        attempts: u32,
        retry_delay: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("danglewatch/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url,
            lookback_days,
            attempts: attempts.clamp(1, MAX_ATTEMPTS),
            retry_delay,
        })
    }

    async fn query(&self, target: &TargetDomain) -> Result<Vec<CertificateRecord>> {
        let pattern = format!("%.{}", target);
        let min_date = min_not_before(Utc::now().date_naive(), self.lookback_days);

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("q", pattern.as_str()),
                ("output", "json"),
                ("minNotBefore", min_date.as_str()),
            ])
            .send()
            .await
            .with_context(|| format!("crt.sh request failed for {}", target))?;

        let status = response.status();
        if !status.is_success() {
            return Err(anyhow!("crt.sh returned status {} for {}", status, target));
        }

        let body = response
            .text()
            .await
            .with_context(|| format!("Failed to read crt.sh response for {}", target))?;
        parse_records(&body).with_context(|| format!("Malformed crt.sh response for {}", target))
    }
}

#[async_trait]
impl CertificateSource for CrtShClient {
    async fn fetch(&self, target: &TargetDomain) -> Result<Vec<CertificateRecord>> {
        let mut attempt = 1;
        loop {
            match self.query(target).await {
                Ok(records) => {
                    debug!(target = %target, count = records.len(), "Fetched certificates");
                    return Ok(records);
                }
                Err(e) if attempt < self.attempts => {
                    warn!(
                        target = %target,
                        attempt,
                        error = %e,
                        "crt.sh query failed, retrying in {}s",
                        self.retry_delay.as_secs()
                    );
                    attempt += 1;
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
