// # Memory State Store
//
// In-memory implementation of StateStore.
//
// ## Purpose
//
// Holds the prefix list for the lifetime of the process only. Useful for
// tests, for embedding the engine, and for dry runs against a throwaway
// state. A process that restarts with this store treats every service as new.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::model::PrefixRecord;
use crate::traits::state_store::StateStore;

/// In-memory state store implementation
///
/// Clones share the same underlying list, so a test can keep a handle and
/// inspect what the engine saved.
///
/// # Example
///
/// ```rust
/// use svcsync_core::state::MemoryStateStore;
/// use svcsync_core::traits::StateStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryStateStore::new();
///     assert!(store.load().await?.is_empty());
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryStateStore {
    inner: Arc<RwLock<Vec<PrefixRecord>>>,
}

impl MemoryStateStore {
    /// Create a new empty memory state store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with records
    pub fn with_records(records: Vec<PrefixRecord>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(records)),
        }
    }

    /// Get the number of records in the store
    pub async fn len(&self) -> usize {
        self.inner.read().await.len()
    }

    /// Check if the store is empty
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.is_empty()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn load(&self) -> Result<Vec<PrefixRecord>, Error> {
        Ok(self.inner.read().await.clone())
    }

    async fn save(&self, records: &[PrefixRecord]) -> Result<(), Error> {
        *self.inner.write().await = records.to_vec();
        Ok(())
    }

    fn store_name(&self) -> &'static str {
        "memory"
    }
}
