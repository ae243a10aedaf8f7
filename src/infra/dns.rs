//! DNS resolution infrastructure.
//!
//! Provides a trait-based abstraction for DNS resolution so the relay can be
//! pointed at a fixed address in tests.

use hickory_resolver::{config::*, TokioAsyncResolver};
use std::{future::Future, net::IpAddr, sync::Arc};
use tokio::sync::OnceCell;

use crate::error::RelayError;

/// Addresses a host resolved to, in resolver order.
#[derive(Debug)]
pub struct DnsResult {
    pub ips: Vec<IpAddr>,
}

/// Trait for DNS resolution.
pub trait DnsResolver: Send + Sync {
    /// Resolves a hostname to one or more IP addresses.
    fn resolve(&self, host: &str) -> impl Future<Output = Result<DnsResult, RelayError>> + Send;
}

/// Global DNS resolver instance, shared by every relay call.
static DNS_RESOLVER: OnceCell<Arc<TokioAsyncResolver>> = OnceCell::const_new();

async fn get_resolver() -> Arc<TokioAsyncResolver> {
    DNS_RESOLVER
        .get_or_init(|| async {
            let resolver = TokioAsyncResolver::tokio_from_system_conf().unwrap_or_else(|e| {
                tracing::debug!("System resolver config unavailable ({}), using defaults", e);
                TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default())
            });
            Arc::new(resolver)
        })
        .await
        .clone()
}

/// DNS resolver implementation using hickory-resolver.
#[derive(Debug, Default, Clone, Copy)]
pub struct HickoryDnsResolver;

impl HickoryDnsResolver {
    pub fn new() -> Self {
        Self
    }
}

impl DnsResolver for HickoryDnsResolver {
    async fn resolve(&self, host: &str) -> Result<DnsResult, RelayError> {
        // Literal addresses skip the lookup
        if let Ok(ip) = host.parse::<IpAddr>() {
            return Ok(DnsResult { ips: vec![ip] });
        }

        let resolver = get_resolver().await;
        let response = resolver
            .lookup_ip(host)
            .await
            .map_err(|e| RelayError::Dns(format!("{}: {}", host, e)))?;

        let ips: Vec<IpAddr> = response.iter().collect();
        if ips.is_empty() {
            return Err(RelayError::Dns(format!("{}: lookup returned no addresses", host)));
        }
        Ok(DnsResult { ips })
    }
}
