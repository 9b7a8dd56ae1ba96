#![allow(dead_code)]
//! A scripted certificate source.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use danglewatch::core::{CertificateRecord, CertificateSource, TargetDomain};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub enum Scripted {
    Records(Vec<CertificateRecord>),
    Fail(String),
    Panic,
}

/// Answers each fetch for a target with the next scripted response.
///
/// Once a target's script runs out, it answers with an empty batch.
#[derive(Debug, Clone, Default)]
pub struct FakeCertificateSource {
    scripts: Arc<Mutex<HashMap<String, VecDeque<Scripted>>>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl FakeCertificateSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, target: &str, response: Scripted) -> &Self {
        self.scripts
            .lock()
            .unwrap()
            .entry(target.to_string())
            .or_default()
            .push_back(response);
        self
    }

    pub fn push_records(&self, target: &str, records: Vec<CertificateRecord>) -> &Self {
        self.push(target, Scripted::Records(records))
    }

    pub fn push_failure(&self, target: &str) -> &Self {
        self.push(target, Scripted::Fail("HTTP 503".to_string()))
    }

    /// Targets fetched so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl CertificateSource for FakeCertificateSource {
    async fn fetch(&self, target: &TargetDomain) -> Result<Vec<CertificateRecord>> {
        self.calls.lock().unwrap().push(target.to_string());
        let next = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(target.as_str())
            .and_then(|queue| queue.pop_front());
        match next {
            Some(Scripted::Records(records)) => Ok(records),
            Some(Scripted::Fail(reason)) => Err(anyhow!(reason)),
            Some(Scripted::Panic) => panic!("scripted source panic for {}", target),
            None => Ok(Vec::new()),
        }
    }
}
