//! The durable set of subdomains that have already been accounted for.
//!
//! Backed by an append-only file with one domain per line, loaded fully into
//! memory at startup. Persistence is best-effort: the in-memory set is always
//! updated, and a failed append is logged and dropped.

use std::collections::HashSet;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing::{debug, warn};

#[derive(Debug)]
pub struct SeenDomainLedger {
    path: PathBuf,
    seen: HashSet<String>,
}

impl SeenDomainLedger {
    /// Loads the ledger from `path`. A missing or unreadable file yields an
    /// empty ledger.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let seen = match fs::read_to_string(&path) {
            Ok(content) => content
                .lines()
                .map(|line| line.trim().to_lowercase())
                .filter(|line| !line.is_empty())
                .collect(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No ledger file yet, starting empty");
                HashSet::new()
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read ledger, starting empty");
                HashSet::new()
            }
        };
        Self { path, seen }
    }

    pub fn contains(&self, domain: &str) -> bool {
        self.seen.contains(domain)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Adds `domain` to the ledger.
    ///
    /// Returns `false` if the domain was already present, in which case nothing
    /// is written.
    pub fn record(&mut self, domain: &str) -> bool {
        if !self.seen.insert(domain.to_string()) {
            return false;
        }
        if let Err(e) = self.append(domain) {
            warn!(domain, path = %self.path.display(), error = %e, "Failed to persist ledger entry");
            metrics::counter!("ledger_write_failures_total").increment(1);
        }
        true
    }

    fn append(&self, domain: &str) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(format!("{}\n", domain).as_bytes())
    }
}
