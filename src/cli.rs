//! Command-Line Interface (CLI) argument parsing.
//!
//! This module defines the command-line arguments for the application using the
//! `clap` crate. These arguments are parsed at startup and then merged with
//! the configuration from the `danglewatch.toml` file and environment variables.

use clap::Parser;
use figment::{
    value::{Dict, Map, Tag, Value},
    Error, Metadata, Profile, Provider,
};
use std::path::PathBuf;

/// Watches certificate transparency logs for new subdomains and flags dangling DNS.
#[derive(Parser, Debug, Clone, Default)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// File listing the domains to monitor.
    #[arg(short, long, value_name = "FILE")]
    pub targets: Option<PathBuf>,

    /// Directory for per-target result files.
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Seconds to wait between cycles.
    #[arg(long, value_name = "SECONDS")]
    pub interval: Option<u64>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Run a single cycle and exit.
    #[arg(long)]
    pub once: bool,
}

/// Inserts `value` under `section.key`, creating the section dict if needed.
fn insert_nested(dict: &mut Dict, section: &str, key: &str, value: Value) {
    let entry = dict
        .entry(section.to_string())
        .or_insert_with(|| Value::Dict(Tag::Default, Dict::new()));
    if let Value::Dict(_, inner) = entry {
        inner.insert(key.to_string(), value);
    }
}

impl Provider for Cli {
    fn metadata(&self) -> Metadata {
        Metadata::named("Command-Line Arguments")
    }

    fn data(&self) -> Result<Map<Profile, Dict>, Error> {
        let mut dict = Dict::new();

        if let Some(path) = &self.targets {
            insert_nested(&mut dict, "paths", "targets_file", Value::from(path.display().to_string()));
        }

        if let Some(dir) = &self.output_dir {
            insert_nested(&mut dict, "paths", "output_dir", Value::from(dir.display().to_string()));
        }

        if let Some(interval) = self.interval {
            insert_nested(&mut dict, "scheduler", "interval_seconds", Value::from(interval));
        }

        if let Some(level) = &self.log_level {
            dict.insert("log_level".into(), Value::from(level.clone()));
        }

        let mut map = Map::new();
        map.insert(Profile::Default, dict);
        Ok(map)
    }
}
