//! Process-wide memoization for expensive provider loads.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

/// Idempotent load cache: the first `get_or_load` for a key runs the
/// loader, every later call returns the stored value. Entries are never
/// invalidated; the cache lives as long as the provider that owns it.
pub struct LoadCache<K, V> {
    inner: Mutex<HashMap<K, Arc<V>>>,
}

impl<K: Eq + Hash + Clone, V> LoadCache<K, V> {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &K) -> Option<Arc<V>> {
        self.inner.lock().expect("cache poisoned").get(key).cloned()
    }

    pub fn insert(&self, key: K, value: V) -> Arc<V> {
        let value = Arc::new(value);
        self.inner
            .lock()
            .expect("cache poisoned")
            .insert(key, Arc::clone(&value));
        value
    }

    /// Synchronous loads. Async callers use `get` / `insert` around the
    /// await point instead.
    pub fn get_or_load<E>(
        &self,
        key: &K,
        load: impl FnOnce() -> Result<V, E>,
    ) -> Result<Arc<V>, E> {
        if let Some(value) = self.get(key) {
            return Ok(value);
        }
        Ok(self.insert(key.clone(), load()?))
    }
}

impl<K: Eq + Hash + Clone, V> Default for LoadCache<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    #[test]
    fn loads_once_per_key() {
        let cache: LoadCache<String, u32> = LoadCache::new();
        let mut loads = 0;

        for _ in 0..3 {
            let value = cache
                .get_or_load(&"large".to_owned(), || {
                    loads += 1;
                    Ok::<_, Infallible>(42)
                })
                .unwrap();
            assert_eq!(*value, 42);
        }
        assert_eq!(loads, 1);
    }

    #[test]
    fn keys_are_independent() {
        let cache: LoadCache<&'static str, &'static str> = LoadCache::new();
        cache.insert("a", "first");
        cache.insert("b", "second");
        assert_eq!(*cache.get(&"a").unwrap(), "first");
        assert_eq!(*cache.get(&"b").unwrap(), "second");
        assert!(cache.get(&"c").is_none());
    }

    #[test]
    fn load_errors_are_not_cached() {
        let cache: LoadCache<u8, u8> = LoadCache::new();
        let err: Result<_, &str> = cache.get_or_load(&1, || Err("boom"));
        assert!(err.is_err());
        let ok = cache.get_or_load(&1, || Ok::<_, &str>(7)).unwrap();
        assert_eq!(*ok, 7);
    }
}
