//! Per-service record expansion
//!
//! Turns one [`ObservedService`] into the registry create calls it needs:
//! one for an IP literal, one per resolved IPv4 address for a DNS name, none
//! for an address that is neither.

use tracing::debug;

use crate::address::{AddressKind, classify};
use crate::error::ReconcileError;
use crate::model::{ObservedService, PrefixRequest};
use crate::traits::AddressResolver;

/// Result of expanding a service
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expansion {
    /// Create calls to issue, in order (empty when a name has no A records)
    Requests(Vec<PrefixRequest>),
    /// The address is neither an IP literal nor a DNS name
    Skipped,
}

/// Expand a service into prefix requests
///
/// Every request carries the service's original `external_address` as its
/// join key; for DNS names only `prefix`/`address` differ between requests.
///
/// # Errors
///
/// [`ReconcileError::AddressResolutionFailed`] when a name that classifies as
/// DNS cannot be resolved. An unrecognized address is not an error.
pub async fn expand_service(
    service: &ObservedService,
    resolver: &dyn AddressResolver,
) -> Result<Expansion, ReconcileError> {
    match classify(&service.external_address) {
        AddressKind::IpLiteral(ip) => Ok(Expansion::Requests(vec![PrefixRequest::new(
            service, ip, false,
        )])),
        AddressKind::DnsName => {
            let ips = resolver
                .resolve_ipv4(&service.external_address)
                .await
                .map_err(|e| ReconcileError::AddressResolutionFailed {
                    address: service.external_address.clone(),
                    cause: e.to_string(),
                })?;

            debug!(
                "{} resolved to {} IPv4 address(es)",
                service.external_address,
                ips.len()
            );

            Ok(Expansion::Requests(
                ips.into_iter()
                    .map(|ip| PrefixRequest::new(service, ip.into(), true))
                    .collect(),
            ))
        }
        AddressKind::Unrecognized => Ok(Expansion::Skipped),
    }
}
