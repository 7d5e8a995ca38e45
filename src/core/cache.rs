//! Time-based page cache.
//!
//! Rendered pages are kept in the key-value store next to their expiry time,
//! so a cached page outlives the request instance that produced it. Every key
//! written here is tracked in `cache_keys` so the whole cache can be dropped
//! at once.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use crate::config::CACHE_KEYS_KEY;
use crate::core::store::Store;

#[derive(Serialize, Deserialize)]
struct CacheEntry {
    body: String,
    expires_at: i64,
}

pub fn index_cache_key(viewer_id: Option<&str>, page: usize) -> String {
    format!("cache:index:{}:{}", viewer_id.unwrap_or("anonymous"), page)
}

/// Returns the cached page for `key` unless it expired before `now`.
/// Expired entries are dropped along with their registry slot.
pub fn get(store: &Store, key: &str, now: DateTime<Utc>) -> anyhow::Result<Option<String>> {
    match store.get_json::<CacheEntry>(key)? {
        Some(entry) if entry.expires_at > now.timestamp_millis() => Ok(Some(entry.body)),
        Some(_) => {
            store.delete(key)?;
            let mut keys = store.get_list(CACHE_KEYS_KEY)?;
            keys.retain(|k| k != key);
            store.set_json(CACHE_KEYS_KEY, &keys)?;
            Ok(None)
        }
        None => Ok(None),
    }
}

pub fn set(
    store: &Store,
    key: &str,
    body: &str,
    ttl_seconds: i64,
    now: DateTime<Utc>,
) -> anyhow::Result<()> {
    let entry = CacheEntry {
        body: body.to_string(),
        expires_at: (now + Duration::seconds(ttl_seconds)).timestamp_millis(),
    };
    store.set_json(key, &entry)?;

    let mut keys = store.get_list(CACHE_KEYS_KEY)?;
    if !keys.iter().any(|k| k == key) {
        keys.push(key.to_string());
        store.set_json(CACHE_KEYS_KEY, &keys)?;
    }
    Ok(())
}

/// Drops every cached page.
pub fn clear(store: &Store) -> anyhow::Result<usize> {
    let keys = store.get_list(CACHE_KEYS_KEY)?;
    for key in &keys {
        store.delete(key)?;
    }
    store.delete(CACHE_KEYS_KEY)?;
    tracing::info!(entries = keys.len(), "page cache cleared");
    Ok(keys.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_is_served_until_it_expires() {
        let store = Store::default();
        let now = Utc::now();
        let key = index_cache_key(None, 1);

        set(&store, &key, "<html>", 20, now).unwrap();
        let raw = store.get(&key).unwrap().unwrap();
        assert!(String::from_utf8(raw).unwrap().contains(r#""body":"<html>""#));
        assert_eq!(get(&store, &key, now).unwrap().as_deref(), Some("<html>"));
        assert_eq!(
            get(&store, &key, now + Duration::seconds(19)).unwrap().as_deref(),
            Some("<html>")
        );
        assert_eq!(get(&store, &key, now + Duration::seconds(20)).unwrap(), None);
        assert!(!store.exists(&key).unwrap());
        assert!(store.get_list(CACHE_KEYS_KEY).unwrap().is_empty());
    }

    #[test]
    fn clear_drops_all_entries() {
        let store = Store::default();
        let now = Utc::now();
        let anon = index_cache_key(None, 1);
        let user = index_cache_key(Some("u1"), 2);

        set(&store, &anon, "a", 20, now).unwrap();
        set(&store, &user, "b", 20, now).unwrap();
        set(&store, &user, "c", 20, now).unwrap();

        assert_eq!(clear(&store).unwrap(), 2);
        assert_eq!(get(&store, &anon, now).unwrap(), None);
        assert_eq!(get(&store, &user, now).unwrap(), None);
    }

    #[test]
    fn keys_differ_per_viewer_and_page() {
        assert_ne!(index_cache_key(None, 1), index_cache_key(Some("u1"), 1));
        assert_ne!(index_cache_key(Some("u1"), 1), index_cache_key(Some("u1"), 2));
    }
}
