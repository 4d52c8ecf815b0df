//! Collaborator interfaces consumed by the engine
//!
//! - [`ServiceProvider`]: enumerate the services that should be registered
//! - [`RegistryGateway`]: create and delete prefixes in the IPAM registry
//! - [`StateStore`]: load and save the persisted prefix list
//! - [`AddressResolver`]: resolve DNS names to IPv4 addresses

pub mod registry_gateway;
pub mod resolver;
pub mod service_provider;
pub mod state_store;

pub use registry_gateway::RegistryGateway;
pub use resolver::AddressResolver;
pub use service_provider::ServiceProvider;
pub use state_store::StateStore;
