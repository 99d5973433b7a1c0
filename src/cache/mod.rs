//! Summary caching module for VaultDigest.
//!
//! This module provides persistent storage for per-note summaries so that
//! subsequent runs never call the LLM again for a note that has not changed.
//!
//! # Architecture
//!
//! The caching system is split into three components:
//!
//! * [`key`]: Derives the content-addressed [`CacheKey`] from file identity.
//! * [`entry`]: Wraps a cached result with its provenance fields.
//! * [`store`]: Directory-backed store, one JSON file per key.
//!
//! # Cache Invalidation
//!
//! Keys are derived from the pair (path, modification time in nanoseconds).
//! File bytes are never read to decide staleness: editing a note changes its
//! mtime, which produces a new key, and the old entry is simply never looked
//! up again. Moving or renaming a note does the same. Entries are immutable
//! once written and are never evicted by this crate.

pub mod entry;
pub mod key;
pub mod store;

pub use entry::CacheEntry;
pub use key::CacheKey;
pub use store::{CacheError, SummaryCache, CACHE_EXTENSION};
