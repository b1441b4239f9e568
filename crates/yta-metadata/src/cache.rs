//! TTL cache for parsed metadata records: a fast-path read lock with a
//! write-with-double-check fallback when an entry is missing or expired.

use std::collections::HashMap;
use std::sync::RwLock;

use yta_models::CacheEntry;

pub struct TtlCache<T: Clone> {
    entries: RwLock<HashMap<String, CacheEntry<T>>>,
}

impl<T: Clone> TtlCache<T> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &str) -> Option<T> {
        let entries = self.entries.read().unwrap();
        match entries.get(key) {
            Some(entry) if !entry.is_expired() => Some(entry.data.clone()),
            _ => None,
        }
    }

    pub fn insert(&self, key: String, value: T, ttl_secs: i64) {
        let mut entries = self.entries.write().unwrap();
        entries.insert(key, CacheEntry::new(value, ttl_secs));
    }
}

impl<T: Clone> Default for TtlCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expired_entries_are_not_returned() {
        let cache: TtlCache<i32> = TtlCache::new();
        cache.insert("a".into(), 1, -1);
        assert!(cache.get("a").is_none());
    }

    #[test]
    fn fresh_entries_round_trip() {
        let cache: TtlCache<i32> = TtlCache::new();
        cache.insert("a".into(), 7, 3600);
        assert_eq!(cache.get("a"), Some(7));
    }

    #[test]
    fn missing_key_is_none() {
        let cache: TtlCache<i32> = TtlCache::new();
        assert!(cache.get("missing").is_none());
    }
}
