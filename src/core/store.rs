//! Key-value storage shared by every view.
//!
//! Inside a Spin component this is the default Spin key-value store. Native
//! builds (the actix server and the test suite) keep the same key layout in a
//! process-wide map.

use serde::{de::DeserializeOwned, Serialize};

#[cfg(not(target_arch = "wasm32"))]
use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

#[cfg(target_arch = "wasm32")]
pub struct Store {
    inner: spin_sdk::key_value::Store,
}

#[cfg(target_arch = "wasm32")]
impl Store {
    pub fn open_default() -> anyhow::Result<Self> {
        Ok(Store {
            inner: spin_sdk::key_value::Store::open_default()?,
        })
    }

    pub fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self.inner.get(key)?)
    }

    pub fn set(&self, key: &str, value: &[u8]) -> anyhow::Result<()> {
        Ok(self.inner.set(key, value)?)
    }

    pub fn delete(&self, key: &str) -> anyhow::Result<()> {
        Ok(self.inner.delete(key)?)
    }

    pub fn exists(&self, key: &str) -> anyhow::Result<bool> {
        Ok(self.inner.exists(key)?)
    }
}

#[cfg(not(target_arch = "wasm32"))]
#[derive(Clone, Default)]
pub struct Store {
    inner: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

#[cfg(not(target_arch = "wasm32"))]
impl Store {
    pub fn open_default() -> anyhow::Result<Self> {
        Ok(Store::default())
    }

    pub fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
        let map = self
            .inner
            .read()
            .map_err(|_| anyhow::anyhow!("store lock poisoned"))?;
        Ok(map.get(key).cloned())
    }

    pub fn set(&self, key: &str, value: &[u8]) -> anyhow::Result<()> {
        let mut map = self
            .inner
            .write()
            .map_err(|_| anyhow::anyhow!("store lock poisoned"))?;
        map.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    pub fn delete(&self, key: &str) -> anyhow::Result<()> {
        let mut map = self
            .inner
            .write()
            .map_err(|_| anyhow::anyhow!("store lock poisoned"))?;
        map.remove(key);
        Ok(())
    }

    pub fn exists(&self, key: &str) -> anyhow::Result<bool> {
        let map = self
            .inner
            .read()
            .map_err(|_| anyhow::anyhow!("store lock poisoned"))?;
        Ok(map.contains_key(key))
    }
}

impl Store {
    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> anyhow::Result<Option<T>> {
        match self.get(key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    pub fn set_json<T: Serialize>(&self, key: &str, value: &T) -> anyhow::Result<()> {
        self.set(key, &serde_json::to_vec(value)?)
    }

    /// Reads a list key, treating a missing key as empty.
    pub fn get_list(&self, key: &str) -> anyhow::Result<Vec<String>> {
        Ok(self.get_json::<Vec<String>>(key)?.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_values_round_trip_and_delete() {
        let store = Store::default();
        store.set_json("feed", &vec!["a".to_string(), "b".to_string()]).unwrap();
        assert_eq!(store.get_list("feed").unwrap(), vec!["a", "b"]);
        assert!(store.exists("feed").unwrap());

        store.delete("feed").unwrap();
        assert!(store.get_list("feed").unwrap().is_empty());
        assert!(!store.exists("feed").unwrap());
    }

    #[test]
    fn clones_share_the_same_data() {
        let store = Store::default();
        let other = store.clone();
        store.set("k", b"v").unwrap();
        assert_eq!(other.get("k").unwrap(), Some(b"v".to_vec()));
    }
}
