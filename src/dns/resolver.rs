use crate::{config::DnsConfig, core::DnsResolver, dns::DnsError};
use anyhow::Result;
use async_trait::async_trait;
use hickory_resolver::{
    config::{NameServerConfig, ResolverConfig, ResolverOpts},
    name_server::TokioConnectionProvider,
    proto::xfer::Protocol,
    system_conf, Resolver, TokioResolver,
};
use std::{
    net::{IpAddr, SocketAddr},
    time::{Duration, Instant},
};
use tracing::{trace, warn};

/// DNS resolver implementation using hickory-resolver
pub struct HickoryDnsResolver {
    resolver: TokioResolver,
    timeout: Duration,
}

impl HickoryDnsResolver {
    /// Creates a new DNS resolver from the application's DNS configuration.
    ///
    /// Returns the resolver and the deduplicated list of nameservers it will
    /// query, for startup logging.
    pub fn from_config(config: &DnsConfig) -> Result<(Self, Vec<SocketAddr>)> {
        let resolver_config = if let Some(resolver_addr_str) = &config.resolver {
            // If a specific resolver is provided, use it exclusively.
            let mut custom_config = ResolverConfig::new();
            let socket_addr: SocketAddr = resolver_addr_str.parse()?;
            custom_config.add_name_server(NameServerConfig::new(socket_addr, Protocol::Udp));
            custom_config
        } else {
            let (system_config, _) = system_conf::read_system_conf()?;
            if system_config.name_servers().is_empty() {
                warn!("No system DNS servers found, falling back to Cloudflare DNS.");
                ResolverConfig::cloudflare()
            } else {
                system_config
            }
        };

        // Drop search domains: certificate names are always fully qualified.
        let mut resolver_config_with_no_search = ResolverConfig::new();
        for ns in resolver_config.name_servers() {
            resolver_config_with_no_search.add_name_server(ns.clone());
        }

        let mut nameservers: Vec<_> = resolver_config_with_no_search
            .name_servers()
            .iter()
            .map(|ns| ns.socket_addr)
            .collect();
        nameservers.sort();
        nameservers.dedup();

        let timeout = Duration::from_millis(config.timeout_ms);
        let mut resolver_opts = ResolverOpts::default();
        resolver_opts.ndots = 1;
        resolver_opts.timeout = timeout;
        resolver_opts.attempts = 1;

        let resolver = Resolver::builder_with_config(
            resolver_config_with_no_search,
            TokioConnectionProvider::default(),
        )
        .with_options(resolver_opts)
        .build();

        Ok((Self { resolver, timeout }, nameservers))
    }
}

#[async_trait]
impl DnsResolver for HickoryDnsResolver {
    async fn resolve(&self, domain: &str) -> Result<IpAddr, DnsError> {
        let start_time = Instant::now();

        // The resolver has its own per-query timeout; this bounds the whole
        // lookup including retries across nameservers.
        let result = tokio::time::timeout(self.timeout, self.resolver.lookup_ip(domain)).await;
        metrics::histogram!("dns_resolution_duration_seconds")
            .record(start_time.elapsed().as_secs_f64());

        let lookup = match result {
            Ok(Ok(lookup)) => lookup,
            Ok(Err(e)) => {
                trace!(domain, error = %e, "DNS lookup failed");
                metrics::counter!("dns_queries_total", "status" => "failure").increment(1);
                return Err(DnsError::Resolution(e.to_string()));
            }
            Err(_) => {
                trace!(domain, "DNS lookup timed out");
                metrics::counter!("dns_queries_total", "status" => "timeout").increment(1);
                return Err(DnsError::Timeout(self.timeout.as_millis() as u64));
            }
        };

        let addresses: Vec<IpAddr> = lookup.iter().collect();
        match pick_address(&addresses) {
            Some(ip) => {
                metrics::counter!("dns_queries_total", "status" => "success").increment(1);
                Ok(ip)
            }
            None => {
                metrics::counter!("dns_queries_total", "status" => "nxdomain").increment(1);
                Err(DnsError::NoRecords(domain.to_string()))
            }
        }
    }
}

/// Picks the first IPv4 address, falling back to the first address of any family.
fn pick_address(addresses: &[IpAddr]) -> Option<IpAddr> {
    addresses
        .iter()
        .find(|ip| ip.is_ipv4())
        .or_else(|| addresses.first())
        .copied()
}
