//! Per-target result files.
//!
//! Each target gets one append-only file in the output directory, named after
//! the domain with `.` replaced by `_`. Lines are written with a single
//! `write_all` each, so concurrent writers never interleave within a line.

use crate::core::{DiscoveryResult, TargetDomain};
use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct ResultWriter {
    dir: PathBuf,
}

impl ResultWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Creates the output directory if needed.
    pub fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create output directory {}", self.dir.display()))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, target: &TargetDomain) -> PathBuf {
        self.dir.join(target.output_file_name())
    }

    pub fn append(&self, target: &TargetDomain, result: &DiscoveryResult) -> Result<()> {
        let path = self.path_for(target);
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        file.write_all(format!("{}\n", result).as_bytes())
            .with_context(|| format!("Failed to write {}", path.display()))
    }

    /// Deletes the result files of the given targets.
    ///
    /// Run after the baseline cycle so that result files only ever contain
    /// steady-state discoveries. Removal failures are logged, not returned.
    pub fn purge(&self, targets: &[TargetDomain]) {
        for target in targets {
            let path = self.path_for(target);
            match fs::remove_file(&path) {
                Ok(()) => debug!(path = %path.display(), "Removed baseline result file"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => warn!(path = %path.display(), error = %e, "Failed to remove result file"),
            }
        }
    }
}
