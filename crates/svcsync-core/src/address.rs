//! Address classification and resolution
//!
//! An external address is either an IP literal, a DNS name, or neither.
//! Classification is purely syntactic; [`SystemResolver`] turns DNS names
//! into IPv4 addresses using the operating system resolver.

use async_trait::async_trait;
use regex::Regex;
use std::net::{IpAddr, Ipv4Addr};
use std::sync::LazyLock;

use crate::error::{Error, Result};
use crate::traits::AddressResolver;

static DNS_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([a-zA-Z0-9]([a-zA-Z0-9\-]{0,61}[a-zA-Z0-9])?\.)+[a-zA-Z]{2,}$")
        .expect("DNS name pattern is valid")
});

/// What kind of address a service exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressKind {
    /// An IPv4 or IPv6 literal
    IpLiteral(IpAddr),
    /// A syntactically valid DNS hostname
    DnsName,
    /// Neither; such services are skipped without an error
    Unrecognized,
}

/// Returns true if `address` parses as an IPv4 or IPv6 literal
pub fn is_ip_literal(address: &str) -> bool {
    address.parse::<IpAddr>().is_ok()
}

/// Returns true if `address` is a dotted hostname with an alphabetic TLD
///
/// IP literals are never DNS names. Single-label names such as `localhost`
/// and names with a trailing dot are rejected.
pub fn is_dns_name(address: &str) -> bool {
    !is_ip_literal(address) && DNS_NAME.is_match(address)
}

/// Classify an external address
pub fn classify(address: &str) -> AddressKind {
    if let Ok(ip) = address.parse::<IpAddr>() {
        AddressKind::IpLiteral(ip)
    } else if DNS_NAME.is_match(address) {
        AddressKind::DnsName
    } else {
        AddressKind::Unrecognized
    }
}

/// Resolver backed by the operating system (`getaddrinfo`)
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemResolver;

impl SystemResolver {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AddressResolver for SystemResolver {
    async fn resolve_ipv4(&self, host: &str) -> Result<Vec<Ipv4Addr>> {
        let addrs = tokio::net::lookup_host((host, 0))
            .await
            .map_err(|e| Error::resolution(format!("lookup of {} failed: {}", host, e)))?;

        Ok(ipv4_only(addrs.map(|addr| addr.ip())))
    }
}

/// Keep IPv4 addresses (including v4-mapped IPv6), dropping duplicates
/// while preserving resolver order
pub(crate) fn ipv4_only(addrs: impl IntoIterator<Item = IpAddr>) -> Vec<Ipv4Addr> {
    let mut out: Vec<Ipv4Addr> = Vec::new();
    for ip in addrs {
        let v4 = match ip {
            IpAddr::V4(v4) => Some(v4),
            IpAddr::V6(v6) => v6.to_ipv4_mapped(),
        };
        if let Some(v4) = v4
            && !out.contains(&v4)
        {
            out.push(v4);
        }
    }
    out
}
