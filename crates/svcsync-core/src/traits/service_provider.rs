// # Service Provider Trait
//
// Defines the interface for enumerating the services whose external
// addresses should be registered (the desired state).
//
// ## Implementations
//
// - Kubernetes API: `svcsync-kubernetes` crate
//
// ## Usage
//
// ```rust,ignore
// use svcsync_core::{ServiceFilter, ServiceProvider};
//
// let provider = /* ServiceProvider implementation */;
// let services = provider.list_services(&ServiceFilter::default()).await?;
// for service in &services {
//     println!("{}", service);
// }
// ```

use async_trait::async_trait;

use crate::config::ServiceFilter;
use crate::model::ObservedService;

/// Trait for service enumeration
///
/// # Contract
///
/// - Returns every service that passes `filter` and has an external address
/// - Absence of a filter category means "accept all" for that category
/// - An error means the desired state is unknown; the engine aborts the run
///   before any registry mutation
///
/// Providers observe; they never decide what to create or delete.
#[async_trait]
pub trait ServiceProvider: Send + Sync {
    /// List the current desired-state services
    ///
    /// # Parameters
    ///
    /// - `filter`: namespace, type, annotation and label predicates
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<ObservedService>)`: the desired state, possibly empty
    /// - `Err(Error)`: if the cluster could not be enumerated
    async fn list_services(
        &self,
        filter: &ServiceFilter,
    ) -> Result<Vec<ObservedService>, crate::Error>;

    /// Provider name (for logging)
    fn provider_name(&self) -> &'static str;
}
