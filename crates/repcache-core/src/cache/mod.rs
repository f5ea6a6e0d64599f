//! Local caching module for offline data access.
//!
//! This module provides:
//! - `SnapshotStore`: durable persistence of the full `ClientSnapshot`
//!   so the portal can serve last-known-good data across restarts
//! - `MediaCache`: a bounded URL-to-file cache for plan media, filled by
//!   the prefetch pass after every successful fetch

pub mod media;
pub mod snapshot;

pub use media::{MediaCache, MediaKind};
pub use snapshot::{ClientSnapshot, SnapshotStore, StoredSnapshot};
