//! The first-run gate.
//!
//! While the marker file is absent the monitor is in baseline mode: new
//! subdomains are recorded in the ledger without probing or alerting. The
//! marker is written once, at the end of the first complete cycle.

use anyhow::{Context, Result};
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct BaselineGate {
    marker: PathBuf,
}

impl BaselineGate {
    pub fn new(marker: impl Into<PathBuf>) -> Self {
        Self {
            marker: marker.into(),
        }
    }

    pub fn marker_path(&self) -> &Path {
        &self.marker
    }

    /// Checks the marker on disk. Never cached, so external changes and
    /// restarts are observed on the next call.
    pub fn is_baseline(&self) -> bool {
        !self.marker.exists()
    }

    /// Writes the marker with the current timestamp, ending baseline mode.
    pub fn mark_complete(&self) -> Result<()> {
        fs::write(&self.marker, Utc::now().to_rfc3339()).with_context(|| {
            format!("Failed to write baseline marker {}", self.marker.display())
        })
    }
}
