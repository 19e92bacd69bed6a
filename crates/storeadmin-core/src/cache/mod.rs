//! Time-boxed local cache for fetched data.
//!
//! `TtlCache` memoizes read-mostly data in a key/value store for five
//! minutes. Entries are stored as `{"data": ..., "timestamp": ms}` and
//! expire lazily: an expired entry is deleted when it is next read, there
//! is no background sweep.
//!
//! The cache is an optimization only. Nothing in it returns an error, and
//! callers must behave the same (just slower) if it is wiped at any time.

pub mod manager;

pub use manager::{CacheEntryInfo, CachedData, TtlCache, CACHE_TTL_MS};
