use crate::{core::DnsResolver, dns::DnsError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::{Arc, Mutex};

/// Fake DNS resolver for testing.
///
/// Domains without a configured answer fail with NXDOMAIN.
#[derive(Debug, Clone, Default)]
pub struct FakeDnsResolver {
    answers: Arc<Mutex<HashMap<String, IpAddr>>>,
    call_count: Arc<Mutex<HashMap<String, u32>>>,
}

impl FakeDnsResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes `domain` resolve to `ip`.
    pub fn add_answer(&self, domain: &str, ip: &str) {
        let ip: IpAddr = ip.parse().expect("invalid IP in test fixture");
        self.answers.lock().unwrap().insert(domain.to_string(), ip);
    }

    /// Get the number of times a domain was queried
    pub fn get_call_count(&self, domain: &str) -> u32 {
        let call_count = self.call_count.lock().unwrap();
        call_count.get(domain).copied().unwrap_or(0)
    }
}

#[async_trait]
impl DnsResolver for FakeDnsResolver {
    async fn resolve(&self, domain: &str) -> Result<IpAddr, DnsError> {
        *self
            .call_count
            .lock()
            .unwrap()
            .entry(domain.to_string())
            .or_insert(0) += 1;

        self.answers
            .lock()
            .unwrap()
            .get(domain)
            .copied()
            .ok_or_else(|| DnsError::Resolution(format!("NXDOMAIN: {}", domain)))
    }
}
