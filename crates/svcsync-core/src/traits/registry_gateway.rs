// # Registry Gateway Trait
//
// Defines the interface for mutating prefixes in the IPAM registry.
//
// ## Implementations
//
// - NetBox: `svcsync-netbox` crate
//
// ## Usage
//
// ```rust,ignore
// use svcsync_core::{ObservedService, PrefixRequest, RegistryGateway};
//
// let gateway = /* RegistryGateway implementation */;
// let service = ObservedService::new("web", "prod", "198.51.100.7");
// let request = PrefixRequest::new(&service, "198.51.100.7".parse()?, false);
//
// let id = gateway.create_prefix(&request).await?;
// gateway.delete_prefix(id).await?;
// ```

use async_trait::async_trait;

use crate::model::{PrefixId, PrefixRequest};

/// Trait for IPAM registry implementations
///
/// # Single-shot
///
/// Each method performs exactly one registry call. Expansion of a service
/// into several prefixes, bookkeeping of partial failures and the decision of
/// what to create or delete are owned by the engine.
///
/// Gateways must not:
/// - retry or back off (a failure is reported and the item is retried on the
///   next run)
/// - touch the state store
/// - cache registry state between calls
#[async_trait]
pub trait RegistryGateway: Send + Sync {
    /// Create one single-host prefix
    ///
    /// # Returns
    ///
    /// - `Ok(PrefixId)`: the identifier the registry assigned
    /// - `Err(Error)`: the prefix was not created
    async fn create_prefix(&self, request: &PrefixRequest) -> Result<PrefixId, crate::Error>;

    /// Delete a prefix by identifier
    ///
    /// # Returns
    ///
    /// - `Ok(())`: the registry confirmed the deletion
    /// - `Err(Error)`: the prefix must be presumed to still exist
    async fn delete_prefix(&self, prefix_id: PrefixId) -> Result<(), crate::Error>;

    /// Gateway name (for logging)
    fn gateway_name(&self) -> &'static str;
}
