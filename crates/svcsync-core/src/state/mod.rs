//! State store implementations
//!
//! - [`MemoryStateStore`]: in-process, not persistent
//! - [`FileStateStore`]: JSON document on local disk with backup recovery

pub mod file;
pub mod memory;

pub use file::FileStateStore;
pub use memory::MemoryStateStore;
