//! Local activity cache.
//!
//! This module provides the durable half of the client:
//! - One snapshot (activity list + per-id details) stored in a single JSON file
//! - Atomic replacement of that file on every write
//! - A memoizing handle so the file is read at most once per process
//! - Self-healing: an unreadable file is treated as an empty, never-synced cache

mod layer;
mod storage;
mod traits;

pub use layer::CacheStore;
#[cfg(test)]
pub use storage::MemoryStorage;
pub use storage::JsonFileStorage;
pub use traits::CacheStorage;
