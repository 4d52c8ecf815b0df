// # State Store Trait
//
// Defines the interface for the persisted prefix list.
//
// ## Purpose
//
// The persisted list is what the engine believes exists in the registry.
// It is read once at the start of a run and written once at the end; the
// registry is never re-listed to rebuild it.
//
// ## Implementations
//
// - ConfigMap: `svcsync-kubernetes` crate
// - File: `crate::state::FileStateStore`
// - Memory: `crate::state::MemoryStateStore`

use async_trait::async_trait;

use crate::model::PrefixRecord;

/// Trait for state store implementations
///
/// # Contract
///
/// - `load()` on a store that has never been written returns an empty list,
///   not an error. Creating the backing object if it is absent is the store's
///   business.
/// - `save()` replaces the whole document.
/// - Every field of every record survives a `load()` → `save()` round trip.
///
/// State stores never decide what to create or delete; that is owned by the
/// engine.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load the prior record set
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<PrefixRecord>)`: prior records (empty on first run)
    /// - `Err(Error)`: the store is unreachable or the document is unreadable
    async fn load(&self) -> Result<Vec<PrefixRecord>, crate::Error>;

    /// Replace the persisted record set
    ///
    /// # Parameters
    ///
    /// - `records`: the full new record set
    async fn save(&self, records: &[PrefixRecord]) -> Result<(), crate::Error>;

    /// Store name (for logging)
    fn store_name(&self) -> &'static str;
}
