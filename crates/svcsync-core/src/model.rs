//! Data model shared by the engine and its collaborators

use serde::{Deserialize, Serialize};

/// Registry-assigned prefix identifier
pub type PrefixId = i64;

/// One externally reachable service observed during this run
///
/// `external_address` is the join key matched against
/// [`PrefixRecord::external_address`]. It is either an IP literal or a DNS
/// hostname, exactly as the cluster reported it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ObservedService {
    pub name: String,
    pub namespace: String,
    pub external_address: String,
}

impl ObservedService {
    pub fn new(
        name: impl Into<String>,
        namespace: impl Into<String>,
        external_address: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            external_address: external_address.into(),
        }
    }
}

impl std::fmt::Display for ObservedService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{} ({})", self.namespace, self.name, self.external_address)
    }
}

/// One prefix believed to exist in the registry
///
/// This is the element of the persisted document. Field names on the wire
/// are fixed: `dns` holds the join key whether it is an IP or a hostname.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PrefixRecord {
    pub prefix_id: PrefixId,
    pub prefix: String,
    #[serde(rename = "dns")]
    pub external_address: String,
    pub service_name: String,
    pub namespace: String,
}

impl PrefixRecord {
    /// Build the record for a request the registry accepted
    pub fn from_request(prefix_id: PrefixId, request: &PrefixRequest) -> Self {
        Self {
            prefix_id,
            prefix: request.prefix.clone(),
            external_address: request.external_address.clone(),
            service_name: request.service_name.clone(),
            namespace: request.namespace.clone(),
        }
    }
}

/// A single registry create call, produced by expanding an [`ObservedService`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixRequest {
    /// Single-host CIDR to create, e.g. `198.51.100.7/32`
    pub prefix: String,
    /// The host address inside `prefix`
    pub address: std::net::IpAddr,
    /// Join key of the originating service
    pub external_address: String,
    pub service_name: String,
    pub namespace: String,
    /// True when `address` came from resolving a hostname
    pub resolved_from_dns: bool,
}

impl PrefixRequest {
    pub fn new(
        service: &ObservedService,
        address: std::net::IpAddr,
        resolved_from_dns: bool,
    ) -> Self {
        Self {
            prefix: host_prefix(address),
            address,
            external_address: service.external_address.clone(),
            service_name: service.name.clone(),
            namespace: service.namespace.clone(),
            resolved_from_dns,
        }
    }
}

/// Single-host CIDR for an address: `/32` for IPv4, `/128` for IPv6
pub fn host_prefix(address: std::net::IpAddr) -> String {
    match address {
        std::net::IpAddr::V4(v4) => format!("{v4}/32"),
        std::net::IpAddr::V6(v6) => format!("{v6}/128"),
    }
}

/// Parse a persisted document
///
/// Blank text and a JSON `null` both mean an empty list. Older releases write
/// `null` once every prefix has been removed.
pub fn parse_document(document: &str) -> serde_json::Result<Vec<PrefixRecord>> {
    if document.trim().is_empty() {
        return Ok(Vec::new());
    }
    let records: Option<Vec<PrefixRecord>> = serde_json::from_str(document)?;
    Ok(records.unwrap_or_default())
}

/// Sort records into the order they are persisted in
pub fn sort_records(records: &mut [PrefixRecord]) {
    records.sort_by(|a, b| {
        a.prefix_id
            .cmp(&b.prefix_id)
            .then_with(|| a.prefix.cmp(&b.prefix))
    });
}
