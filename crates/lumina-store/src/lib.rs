//! Durable snapshot storage for lumina-cache.
//!
//! This crate provides:
//! - [`SnapshotStore`]: the storage capability the cache orchestrator depends on
//! - [`MemorySnapshotStore`]: in-memory store for tests and ephemeral deployments
//! - [`FsSnapshotStore`]: filesystem store, one JSON file per (repo, commit sha)
//!
//! A snapshot is immutable once saved: a given (key, version) pair is only
//! ever inserted once, and `save` of a duplicate is a no-op.

pub mod fs;
pub mod memory;
pub mod paths;
pub mod snapshot;

pub use fs::FsSnapshotStore;
pub use memory::MemorySnapshotStore;
pub use snapshot::{Snapshot, SnapshotStore, VersionEntry};
