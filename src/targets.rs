//! Loading of the monitored target domains.

use crate::core::TargetDomain;
use std::{fs, io, path::Path, path::PathBuf};
use thiserror::Error;

/// Startup configuration failures for the target list. Always fatal.
#[derive(Error, Debug)]
pub enum TargetsError {
    #[error("Targets file not found: {0}")]
    Missing(PathBuf),

    #[error("Failed to read targets file {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Targets file {0} contains no domains")]
    Empty(PathBuf),
}

pub struct TargetRegistry;

impl TargetRegistry {
    /// Loads target domains from a file, one per line.
    ///
    /// Blank lines and lines starting with `#` are skipped. Duplicates are kept.
    pub fn load(path: &Path) -> Result<Vec<TargetDomain>, TargetsError> {
        let content = fs::read_to_string(path).map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                TargetsError::Missing(path.to_path_buf())
            } else {
                TargetsError::Unreadable {
                    path: path.to_path_buf(),
                    source,
                }
            }
        })?;

        let targets = Self::parse(&content);
        if targets.is_empty() {
            return Err(TargetsError::Empty(path.to_path_buf()));
        }
        Ok(targets)
    }

    pub fn parse(content: &str) -> Vec<TargetDomain> {
        content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(TargetDomain::new)
            .collect()
    }
}
