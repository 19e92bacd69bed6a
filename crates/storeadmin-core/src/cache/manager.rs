use std::future::Future;

use serde::{de::DeserializeOwned, de::IgnoredAny, Deserialize, Serialize};
use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock};
use crate::storage::KeyValueStore;

/// Entries are valid for 5 minutes after they are written.
pub const CACHE_TTL_MS: i64 = 5 * 60 * 1000;

/// Envelope stored under each cache key: `{"data": ..., "timestamp": ms}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CachedData<T> {
    pub data: T,
    pub timestamp: i64,
}

impl<T> CachedData<T> {
    pub fn new(data: T, timestamp: i64) -> Self {
        Self { data, timestamp }
    }

    /// Age in milliseconds, or `None` when the timestamp cannot have been
    /// written by this cache: the subtraction overflows, or it lies a full
    /// TTL or more in the future.
    pub fn age_ms(&self, now_ms: i64) -> Option<i64> {
        now_ms
            .checked_sub(self.timestamp)
            .filter(|age| *age > -CACHE_TTL_MS)
    }

    pub fn age_display(&self, now_ms: i64) -> String {
        let Some(age) = self.age_ms(now_ms) else {
            return "unknown".to_string();
        };
        let minutes = age / 60_000;
        if minutes < 1 {
            // Also covers clock skew
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            format!("{}h ago", minutes / 60)
        } else {
            format!("{}d ago", minutes / 1440)
        }
    }
}

/// Age summary of a stored entry, read without touching its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntryInfo {
    pub key: String,
    pub age_ms: i64,
    pub age_display: String,
    pub expired: bool,
}

/// Time-boxed cache over a key/value store.
///
/// Every operation is best effort: storage and serialization failures are
/// logged and degrade to a cache miss, never to an error for the caller.
pub struct TtlCache<S, C = SystemClock> {
    store: S,
    clock: C,
}

impl<S: KeyValueStore> TtlCache<S> {
    pub fn new(store: S) -> Self {
        Self::with_clock(store, SystemClock)
    }
}

impl<S: KeyValueStore, C: Clock> TtlCache<S, C> {
    pub fn with_clock(store: S, clock: C) -> Self {
        Self { store, clock }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Fresh value for `key`, or `None`.
    ///
    /// Expired entries and entries whose envelope cannot be parsed are
    /// removed. An intact envelope holding a payload of another type is a
    /// miss but stays in place.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let raw = self.store.get_item(key)?;

        let cached: CachedData<serde_json::Value> = match serde_json::from_str(&raw) {
            Ok(cached) => cached,
            Err(e) => {
                debug!(key, error = %e, "Removing corrupt cache entry");
                self.remove_quietly(key);
                return None;
            }
        };

        let Some(age_ms) = cached.age_ms(self.clock.now_ms()) else {
            debug!(key, timestamp = cached.timestamp, "Removing cache entry with invalid timestamp");
            self.remove_quietly(key);
            return None;
        };
        if age_ms >= CACHE_TTL_MS {
            debug!(key, age_ms, "Cache entry expired");
            self.remove_quietly(key);
            return None;
        }

        match serde_json::from_value(cached.data) {
            Ok(value) => {
                debug!(key, "Cache hit");
                Some(value)
            }
            Err(e) => {
                debug!(key, error = %e, "Cached payload does not match requested type");
                None
            }
        }
    }

    /// Store `value` under `key`, overwriting any previous entry.
    pub fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T) {
        let cached = CachedData::new(value, self.clock.now_ms());
        let contents = match serde_json::to_string(&cached) {
            Ok(contents) => contents,
            Err(e) => {
                warn!(key, error = %e, "Failed to serialize cache entry");
                return;
            }
        };
        if let Err(e) = self.store.set_item(key, &contents) {
            warn!(key, error = %e, "Failed to write cache entry");
        }
    }

    pub fn evict(&self, key: &str) {
        self.remove_quietly(key);
    }

    /// Remove every entry whose key starts with `prefix`, returning how many
    /// were removed.
    ///
    /// Keys are snapshotted before the first removal: removing shifts the
    /// store's indices, so walking it by index while deleting would skip
    /// the entry right after each match.
    pub fn evict_by_prefix(&self, prefix: &str) -> usize {
        let matching: Vec<String> = self
            .store
            .keys()
            .into_iter()
            .filter(|k| k.starts_with(prefix))
            .collect();

        let removed = matching
            .iter()
            .filter(|key| self.remove_quietly(key))
            .count();
        debug!(prefix, removed, "Evicted cache entries by prefix");
        removed
    }

    /// Cached value for `key`, or the result of `fetch` which is then cached.
    /// A failed fetch is returned as is and nothing is stored.
    pub async fn get_or_fetch<T, E, F, Fut>(&self, key: &str, fetch: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(value) = self.get(key) {
            return Ok(value);
        }
        debug!(key, "Cache miss, fetching");
        let value = fetch().await?;
        self.set(key, &value);
        Ok(value)
    }

    /// Age of the entry at `key`. Unlike `get`, an expired entry is
    /// reported rather than removed. Entries with an invalid timestamp are
    /// skipped.
    pub fn entry_info(&self, key: &str) -> Option<CacheEntryInfo> {
        let raw = self.store.get_item(key)?;
        let cached: CachedData<IgnoredAny> = serde_json::from_str(&raw).ok()?;
        let now = self.clock.now_ms();
        let age_ms = cached.age_ms(now)?;
        Some(CacheEntryInfo {
            key: key.to_string(),
            age_ms,
            age_display: cached.age_display(now),
            expired: age_ms >= CACHE_TTL_MS,
        })
    }

    /// Info for every parseable entry in the store.
    pub fn entries(&self) -> Vec<CacheEntryInfo> {
        self.store
            .keys()
            .iter()
            .filter_map(|key| self.entry_info(key))
            .collect()
    }

    fn remove_quietly(&self, key: &str) -> bool {
        match self.store.remove_item(key) {
            Ok(()) => true,
            Err(e) => {
                warn!(key, error = %e, "Failed to remove cache entry");
                false
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::MemoryStore;

    const START: i64 = 1_700_000_000_000;

    fn cache() -> (TtlCache<MemoryStore, ManualClock>, ManualClock) {
        let clock = ManualClock::new(START);
        (TtlCache::with_clock(MemoryStore::new(), clock.clone()), clock)
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Product {
        id: i64,
        name: String,
    }

    #[test]
    fn test_set_then_get_round_trips() {
        let (cache, _) = cache();
        let products = vec![
            Product { id: 1, name: "Lamp".to_string() },
            Product { id: 2, name: "Chair".to_string() },
        ];
        cache.set("products", &products);
        assert_eq!(cache.get::<Vec<Product>>("products"), Some(products));
    }

    #[test]
    fn test_stored_envelope_format() {
        let (cache, _) = cache();
        cache.set("brands", &vec!["acme"]);
        let raw = cache.store().get_item("brands").unwrap();
        let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(json["data"], serde_json::json!(["acme"]));
        assert_eq!(json["timestamp"], serde_json::json!(START));
    }

    #[test]
    fn test_get_missing_key_is_none() {
        let (cache, _) = cache();
        assert_eq!(cache.get::<String>("nothing"), None);
    }

    #[test]
    fn test_entry_valid_just_before_ttl() {
        let (cache, clock) = cache();
        cache.set("k", "v");
        clock.advance_ms(CACHE_TTL_MS - 1);
        assert_eq!(cache.get::<String>("k").as_deref(), Some("v"));
    }

    #[test]
    fn test_entry_expires_at_ttl_and_is_removed() {
        let (cache, clock) = cache();
        cache.set("k", "v");
        clock.advance_ms(CACHE_TTL_MS);
        assert!(cache.store().get_item("k").is_some());
        assert_eq!(cache.get::<String>("k"), None);
        assert_eq!(cache.store().get_item("k"), None);
    }

    #[test]
    fn test_rewrite_resets_timestamp() {
        let (cache, clock) = cache();
        cache.set("k", &1);
        clock.advance_ms(CACHE_TTL_MS - 1000);
        cache.set("k", &2);
        clock.advance_ms(2000);
        assert_eq!(cache.get::<i32>("k"), Some(2));
    }

    #[test]
    fn test_evict_makes_entry_absent() {
        let (cache, _) = cache();
        cache.set("k", "v");
        cache.evict("k");
        assert_eq!(cache.get::<String>("k"), None);
        // Evicting a missing key is a no-op
        cache.evict("k");
    }

    #[test]
    fn test_evict_by_prefix_removes_adjacent_matches_only() {
        let (cache, _) = cache();
        for key in ["brands", "products_1", "products_2", "products_3", "settings", "tags"] {
            cache.set(key, "x");
        }
        // BTreeMap ordering keeps the three product keys adjacent
        let removed = cache.evict_by_prefix("products_");
        assert_eq!(removed, 3);
        assert_eq!(cache.store().keys(), vec!["brands", "settings", "tags"]);
    }

    #[test]
    fn test_evict_by_prefix_with_no_matches() {
        let (cache, _) = cache();
        cache.set("tags", "x");
        assert_eq!(cache.evict_by_prefix("products"), 0);
        assert_eq!(cache.store().len(), 1);
    }

    #[test]
    fn test_corrupt_entry_is_absent_and_removed() {
        let (cache, _) = cache();
        cache.store().set_item("broken", "{not json").unwrap();
        cache.store().set_item("no_envelope", "[1,2,3]").unwrap();
        assert_eq!(cache.get::<String>("broken"), None);
        assert_eq!(cache.get::<Vec<i32>>("no_envelope"), None);
        assert!(cache.store().is_empty());
    }

    #[test]
    fn test_envelope_with_bad_fields_is_absent_and_removed() {
        let (cache, _) = cache();
        let bad = [
            ("float_ts", r#"{"data":1,"timestamp":1.5}"#),
            ("string_ts", r#"{"data":1,"timestamp":"yesterday"}"#),
            ("huge_ts", r#"{"data":1,"timestamp":1e30}"#),
            ("no_ts", r#"{"data":1}"#),
            ("no_data", r#"{"timestamp":1700000000000}"#),
        ];
        for (key, raw) in bad {
            cache.store().set_item(key, raw).unwrap();
            assert_eq!(cache.get::<i32>(key), None, "{}", key);
        }
        assert!(cache.store().is_empty());
    }

    #[test]
    fn test_extreme_timestamps_are_absent_and_removed() {
        let (cache, _) = cache();
        for ts in [i64::MIN, i64::MAX, START + CACHE_TTL_MS] {
            let raw = format!(r#"{{"data":1,"timestamp":{}}}"#, ts);
            cache.store().set_item("k", &raw).unwrap();
            assert!(cache.entry_info("k").is_none(), "{}", ts);
            assert!(cache.entries().is_empty(), "{}", ts);
            assert_eq!(cache.get::<i32>("k"), None, "{}", ts);
            assert_eq!(cache.store().get_item("k"), None, "{}", ts);
        }
    }

    #[test]
    fn test_small_clock_skew_is_fresh() {
        let (cache, _) = cache();
        let raw = format!(r#"{{"data":1,"timestamp":{}}}"#, START + 60_000);
        cache.store().set_item("k", &raw).unwrap();
        assert_eq!(cache.get::<i32>("k"), Some(1));
    }

    #[test]
    fn test_type_mismatch_is_miss_but_kept() {
        let (cache, _) = cache();
        cache.set("k", "text");
        assert_eq!(cache.get::<i64>("k"), None);
        assert_eq!(cache.get::<String>("k").as_deref(), Some("text"));
    }

    #[test]
    fn test_quota_failure_is_swallowed() {
        let clock = ManualClock::new(START);
        let cache = TtlCache::with_clock(MemoryStore::with_quota(64), clock);
        cache.set("big", &"x".repeat(1000));
        assert_eq!(cache.get::<String>("big"), None);
        cache.set("small", &1);
        assert_eq!(cache.get::<i32>("small"), Some(1));
    }

    #[test]
    fn test_wiped_store_degrades_to_miss() {
        let (cache, _) = cache();
        cache.set("k", "v");
        cache.store().clear().unwrap();
        assert_eq!(cache.get::<String>("k"), None);
    }

    #[tokio::test]
    async fn test_get_or_fetch_caches_success() {
        let (cache, _) = cache();
        let first: Result<i32, String> = cache.get_or_fetch("count", || async { Ok(7) }).await;
        assert_eq!(first, Ok(7));

        let second: Result<i32, String> = cache
            .get_or_fetch("count", || async { Err("refetched".to_string()) })
            .await;
        assert_eq!(second, Ok(7));
    }

    #[tokio::test]
    async fn test_get_or_fetch_does_not_cache_errors() {
        let (cache, _) = cache();
        let result: Result<i32, String> = cache
            .get_or_fetch("count", || async { Err("offline".to_string()) })
            .await;
        assert_eq!(result, Err("offline".to_string()));
        assert!(cache.store().is_empty());
    }

    #[tokio::test]
    async fn test_get_or_fetch_refetches_after_expiry() {
        let (cache, clock) = cache();
        let _: Result<i32, String> = cache.get_or_fetch("count", || async { Ok(1) }).await;
        clock.advance_ms(CACHE_TTL_MS);
        let refreshed: Result<i32, String> = cache.get_or_fetch("count", || async { Ok(2) }).await;
        assert_eq!(refreshed, Ok(2));
    }

    #[test]
    fn test_entry_info_reports_without_removing() {
        let (cache, clock) = cache();
        cache.set("k", "v");
        clock.advance_ms(3 * 60_000);
        let info = cache.entry_info("k").unwrap();
        assert_eq!(info.age_ms, 3 * 60_000);
        assert_eq!(info.age_display, "3m ago");
        assert!(!info.expired);

        clock.advance_ms(CACHE_TTL_MS);
        assert!(cache.entry_info("k").unwrap().expired);
        assert!(cache.store().get_item("k").is_some());
    }

    #[test]
    fn test_entries_skips_unparseable() {
        let (cache, _) = cache();
        cache.set("a", &1);
        cache.store().set_item("b", "garbage").unwrap();
        let keys: Vec<String> = cache.entries().into_iter().map(|e| e.key).collect();
        assert_eq!(keys, vec!["a"]);
    }

    #[test]
    fn test_age_display() {
        let cached = CachedData::new((), START);
        assert_eq!(cached.age_display(START), "just now");
        // Timestamp slightly in the future (clock skew)
        assert_eq!(cached.age_display(START - 5_000), "just now");
        assert_eq!(cached.age_display(START - CACHE_TTL_MS), "unknown");
        assert_eq!(CachedData::new((), i64::MIN).age_display(START), "unknown");
        assert_eq!(cached.age_display(START + 90 * 60_000), "1h ago");
        assert_eq!(cached.age_display(START + 3 * 1440 * 60_000), "3d ago");
    }
}
