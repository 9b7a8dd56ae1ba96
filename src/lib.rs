//! Danglewatch - Certificate Transparency Dangling DNS Monitor
//!
//! Polls a certificate transparency aggregator for new certificates issued to
//! a set of monitored domains, records every subdomain it has seen, and probes
//! the new ones for DNS records that point at nothing listening.

pub mod app;
pub mod baseline;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod core;
pub mod dns;
pub mod engine;
pub mod internal_metrics;
pub mod ledger;
pub mod liveness;
pub mod network;
pub mod notification;
pub mod outputs;
pub mod targets;

// Re-export core types for convenience
pub use core::*;
