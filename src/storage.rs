//! Storage layer: a flat namespace of named files plus an exclusive lock.
//!
//! The index never touches the file system directly. Everything goes through
//! the [`Storage`] trait so tests can run against [`MemoryStorage`] and the
//! engine against [`FileStorage`].

pub mod file;
pub mod memory;
pub mod structured;
pub mod traits;

pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use structured::{StructReader, StructWriter};
pub use traits::{Storage, StorageConfig, StorageError, StorageInput, StorageLock, StorageOutput};
