// # Address Resolver Trait
//
// Resolves a DNS name to the IPv4 addresses it currently points at.
// The production implementation is `crate::address::SystemResolver`; tests
// substitute a fixed table.

use async_trait::async_trait;
use std::net::Ipv4Addr;

/// Trait for hostname resolution
#[async_trait]
pub trait AddressResolver: Send + Sync {
    /// Resolve `host` to its IPv4 addresses
    ///
    /// An empty list is a valid answer (the name exists but has no A
    /// records). Lookup failures are returned as errors.
    async fn resolve_ipv4(&self, host: &str) -> Result<Vec<Ipv4Addr>, crate::Error>;
}
