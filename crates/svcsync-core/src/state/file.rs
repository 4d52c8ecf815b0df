// # File State Store
//
// File-based implementation of StateStore with crash recovery.
//
// ## Purpose
//
// Keeps the prefix list on local disk, for running the syncer outside a
// cluster (or with a state volume instead of a ConfigMap).
//
// ## Crash Recovery
//
// - Atomic writes: Uses write-then-rename for atomicity
// - Corruption detection: Validates JSON on load
// - Automatic backup: Keeps .backup of the previous document
// - Recovery: Falls back to backup if corruption detected
//
// ## File Format
//
// The same document a ConfigMap holds:
//
// ```json
// [
//   {
//     "prefix_id": 12,
//     "prefix": "198.51.100.7/32",
//     "dns": "198.51.100.7",
//     "service_name": "web",
//     "namespace": "prod"
//   }
// ]
// ```

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::Error;
use crate::model::{PrefixRecord, parse_document};
use crate::traits::state_store::StateStore;

/// File-based state store with crash recovery
///
/// # Crash Recovery
///
/// - **Atomic writes**: New document written to a temporary file, then renamed
/// - **Backup**: The previous document is kept in a `.backup` file
/// - **Corruption detection**: JSON validation on load
/// - **Recovery**: Falls back to the backup if the main file is corrupted
///
/// # Example
///
/// ```rust,no_run
/// use svcsync_core::state::FileStateStore;
/// use svcsync_core::traits::StateStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileStateStore::new("/var/lib/svcsync/prefixes.json").await?;
///     let records = store.load().await?;
///     store.save(&records).await?;
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct FileStateStore {
    path: PathBuf,
}

impl FileStateStore {
    /// Create a file state store, creating parent directories if needed
    ///
    /// The file itself is not created until the first `save()`.
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).await.map_err(|e| {
                Error::config(format!(
                    "Failed to create state directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        Ok(Self { path })
    }

    /// Path of the state document
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the document, recovering from the backup if it is corrupted
    ///
    /// A corrupted file with no usable backup is an error, never an empty list.
    async fn load_with_recovery(&self) -> Result<Vec<PrefixRecord>, Error> {
        match Self::read_document(&self.path).await {
            Ok(records) => Ok(records),
            Err(Error::Json(e)) => {
                tracing::warn!(
                    "State file {} appears corrupted: {}. Attempting recovery from backup.",
                    self.path.display(),
                    e
                );

                let backup_path = Self::backup_path(&self.path);
                if !backup_path.exists() {
                    return Err(Error::state_store(format!(
                        "State file {} is corrupted and no backup exists",
                        self.path.display()
                    )));
                }

                let records = Self::read_document(&backup_path).await.map_err(|backup_err| {
                    Error::state_store(format!(
                        "State file {} is corrupted and its backup is unreadable: {}",
                        self.path.display(),
                        backup_err
                    ))
                })?;

                tracing::info!("Recovered {} record(s) from backup", records.len());
                if let Err(restore_err) = fs::copy(&backup_path, &self.path).await {
                    tracing::error!(
                        "Failed to restore state file from backup: {}",
                        restore_err
                    );
                }

                Ok(records)
            }
            Err(e) => Err(e),
        }
    }

    /// Read and parse a document; a missing file is an empty list
    async fn read_document(path: &Path) -> Result<Vec<PrefixRecord>, Error> {
        if !path.exists() {
            tracing::debug!("State file does not exist: {}", path.display());
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(path).await.map_err(|e| {
            Error::state_store(format!(
                "Failed to read state file {}: {}",
                path.display(),
                e
            ))
        })?;

        Ok(parse_document(&content)?)
    }

    /// Write the document atomically
    async fn write_document(&self, records: &[PrefixRecord]) -> Result<(), Error> {
        let json = serde_json::to_string_pretty(records)
            .map_err(|e| Error::state_store(format!("Failed to serialize state: {}", e)))?;

        let temp_path = self.temp_path();
        {
            let mut file = fs::File::create(&temp_path).await.map_err(|e| {
                Error::state_store(format!(
                    "Failed to create temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.write_all(json.as_bytes()).await.map_err(|e| {
                Error::state_store(format!(
                    "Failed to write to temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;

            file.flush().await.map_err(|e| {
                Error::state_store(format!(
                    "Failed to flush temp file {}: {}",
                    temp_path.display(),
                    e
                ))
            })?;
        }

        if self.path.exists() {
            let backup_path = Self::backup_path(&self.path);
            if let Err(e) = fs::copy(&self.path, &backup_path).await {
                tracing::warn!("Failed to create backup: {}", e);
            }
        }

        fs::rename(&temp_path, &self.path).await.map_err(|e| {
            Error::state_store(format!(
                "Failed to rename {} to {}: {}",
                temp_path.display(),
                self.path.display(),
                e
            ))
        })?;

        tracing::trace!("State written to file: {}", self.path.display());
        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut temp = self.path.clone();
        temp.set_extension("tmp");
        temp
    }

    fn backup_path(path: &Path) -> PathBuf {
        let mut backup = path.to_path_buf();
        backup.set_extension("backup");
        backup
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    async fn load(&self) -> Result<Vec<PrefixRecord>, Error> {
        let records = self.load_with_recovery().await?;
        tracing::debug!("Loaded state from file: {} records", records.len());
        Ok(records)
    }

    async fn save(&self, records: &[PrefixRecord]) -> Result<(), Error> {
        self.write_document(records).await
    }

    fn store_name(&self) -> &'static str {
        "file"
    }
}
