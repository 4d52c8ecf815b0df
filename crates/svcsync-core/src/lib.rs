// # svcsync-core
//
// Core library for syncing Kubernetes service addresses into NetBox prefixes.
//
// ## Architecture Overview
//
// - **ServiceProvider**: Trait for listing the services that should be registered
// - **RegistryGateway**: Trait for creating and deleting registry prefixes
// - **StateStore**: Trait for the persisted prefix list
// - **AddressResolver**: Trait for resolving DNS names to IPv4 addresses
// - **Reconciler**: Computes create/delete sets and drives the gateway
// - **SyncEngine**: One-shot run: load, list, reconcile, save
//
// ## Design Principles
//
// 1. **Persisted state is ground truth**: the registry is never re-listed
// 2. **Best effort per item**: one failing call never blocks the others
// 3. **Nothing is lost**: the resulting state is saved after every reconciliation,
//    including prefixes created by a partially failed expansion
// 4. **Library-First**: the daemon is thin glue around this crate

pub mod address;
pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod state;
pub mod traits;

// Re-export core types for convenience
pub use address::{AddressKind, SystemResolver, classify, is_dns_name, is_ip_literal};
pub use config::{KubernetesConfig, RegistryConfig, ServiceFilter, StateStoreConfig, SyncConfig};
pub use engine::{
    ReconcileOutcome, ReconcilePlan, Reconciler, SyncEngine, SyncEvent, SyncReport, plan,
};
pub use error::{Error, ReconcileError, Result};
pub use model::{ObservedService, PrefixId, PrefixRecord, PrefixRequest, parse_document};
pub use state::{FileStateStore, MemoryStateStore};
pub use traits::{AddressResolver, RegistryGateway, ServiceProvider, StateStore};
