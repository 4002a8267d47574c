//! Cache Façade
//!
//! [`Cache`] holds exactly one [`Adapter`] and delegates every operation to
//! it unchanged. The `*_func*` methods take plain closures and box them for
//! the object-safe adapter.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;

use chrono::Duration;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde_json::Value;

use crate::cache::adapter::{Adapter, Payload};
use crate::cache::memory::MemoryAdapter;
use crate::cache::CacheStats;
use crate::error::Result;

static DEFAULT_CACHE: Lazy<Cache<String, Value>> = Lazy::new(Cache::new);

/// Process-wide cache backed by an unbounded memory adapter.
pub fn default_cache() -> &'static Cache<String, Value> {
    &DEFAULT_CACHE
}

// == Cache ==
/// Typed entry point over a storage adapter.
///
/// # Example
/// ```
/// use chrono::Duration;
/// use lazycache::cache::Cache;
///
/// let cache: Cache<String, u64> = Cache::with_capacity(128);
/// let value = cache
///     .get_or_set_func_lock("answer".to_string(), || Ok(Some(42)), Duration::zero())
///     .unwrap();
/// assert_eq!(value, Some(42));
/// ```
pub struct Cache<K, V> {
    adapter: RwLock<Arc<dyn Adapter<K, V>>>,
}

impl<K, V> Default for Cache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Cache<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    // == Constructors ==
    /// Creates a cache over an unbounded memory adapter.
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Creates a cache over a memory adapter evicting beyond `capacity`
    /// entries (0 for unbounded).
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_adapter(Arc::new(MemoryAdapter::<K, V>::new(capacity)))
    }

    pub fn with_adapter(adapter: Arc<dyn Adapter<K, V>>) -> Self {
        Self {
            adapter: RwLock::new(adapter),
        }
    }

    /// Swaps the backing adapter. The previous one is not closed.
    pub fn set_adapter(&self, adapter: Arc<dyn Adapter<K, V>>) {
        *self.adapter.write() = adapter;
    }

    pub fn adapter(&self) -> Arc<dyn Adapter<K, V>> {
        self.adapter.read().clone()
    }

    // == Writes ==
    pub fn set(&self, key: K, value: V, duration: Duration) -> Result<()> {
        self.adapter().set(key, value, duration)
    }

    pub fn set_map(&self, data: HashMap<K, V>, duration: Duration) -> Result<()> {
        self.adapter().set_map(data, duration)
    }

    pub fn set_if_not_exist(&self, key: K, value: V, duration: Duration) -> Result<bool> {
        self.adapter().set_if_not_exist(key, value, duration)
    }

    pub fn set_if_not_exist_func<F>(&self, key: K, f: F, duration: Duration) -> Result<bool>
    where
        F: FnOnce() -> anyhow::Result<Option<V>>,
    {
        self.adapter()
            .set_if_not_exist_func(key, Box::new(f), duration)
    }

    pub fn set_if_not_exist_func_lock<F>(&self, key: K, f: F, duration: Duration) -> Result<bool>
    where
        F: FnOnce() -> anyhow::Result<Option<V>>,
    {
        self.adapter()
            .set_if_not_exist_func_lock(key, Box::new(f), duration)
    }

    // == Reads ==
    pub fn get(&self, key: &K) -> Result<Option<V>> {
        self.adapter().get(key)
    }

    /// Returns the live value or stores `value`. Accepts a plain value or a
    /// [`Payload::Producer`].
    pub fn get_or_set<'a, P>(&self, key: K, value: P, duration: Duration) -> Result<Option<V>>
    where
        P: Into<Payload<'a, V>>,
    {
        self.adapter().get_or_set(key, value.into(), duration)
    }

    pub fn get_or_set_func<F>(&self, key: K, f: F, duration: Duration) -> Result<Option<V>>
    where
        F: FnOnce() -> anyhow::Result<Option<V>>,
    {
        self.adapter().get_or_set_func(key, Box::new(f), duration)
    }

    pub fn get_or_set_func_lock<F>(&self, key: K, f: F, duration: Duration) -> Result<Option<V>>
    where
        F: FnOnce() -> anyhow::Result<Option<V>>,
    {
        self.adapter()
            .get_or_set_func_lock(key, Box::new(f), duration)
    }

    pub fn contains(&self, key: &K) -> Result<bool> {
        self.adapter().contains(key)
    }

    pub fn get_expire(&self, key: &K) -> Result<Duration> {
        self.adapter().get_expire(key)
    }

    // == Updates ==
    pub fn update(&self, key: &K, value: V) -> Result<(Option<V>, bool)> {
        self.adapter().update(key, value)
    }

    pub fn update_expire(&self, key: &K, duration: Duration) -> Result<Duration> {
        self.adapter().update_expire(key, duration)
    }

    pub fn remove(&self, keys: &[K]) -> Result<Option<V>> {
        self.adapter().remove(keys)
    }

    // == Snapshots ==
    pub fn size(&self) -> Result<usize> {
        self.adapter().size()
    }

    pub fn keys(&self) -> Result<Vec<K>> {
        self.adapter().keys()
    }

    pub fn values(&self) -> Result<Vec<V>> {
        self.adapter().values()
    }

    pub fn data(&self) -> Result<HashMap<K, V>> {
        self.adapter().data()
    }

    pub fn stats(&self) -> Result<CacheStats> {
        self.adapter().stats()
    }

    // == Lifecycle ==
    pub fn clear(&self) -> Result<()> {
        self.adapter().clear()
    }

    pub fn close(&self) -> Result<()> {
        self.adapter().close()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::adapter::Producer;
    use crate::error::CacheError;
    use parking_lot::Mutex;

    /// Adapter that records the operations it receives.
    #[derive(Default)]
    struct RecordingAdapter {
        calls: Mutex<Vec<String>>,
    }

    impl RecordingAdapter {
        fn record(&self, call: &str) {
            self.calls.lock().push(call.to_string());
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }
    }

    impl Adapter<String, i32> for RecordingAdapter {
        fn set(&self, key: String, _: i32, duration: Duration) -> Result<()> {
            self.record(&format!("set {key} {}", duration.num_milliseconds()));
            Ok(())
        }

        fn set_map(&self, data: HashMap<String, i32>, _: Duration) -> Result<()> {
            self.record(&format!("set_map {}", data.len()));
            Ok(())
        }

        fn set_if_not_exist(&self, key: String, _: i32, _: Duration) -> Result<bool> {
            self.record(&format!("set_if_not_exist {key}"));
            Ok(true)
        }

        fn set_if_not_exist_func(
            &self,
            key: String,
            f: Producer<'_, i32>,
            _: Duration,
        ) -> Result<bool> {
            self.record(&format!("set_if_not_exist_func {key}"));
            Ok(f()?.is_some())
        }

        fn set_if_not_exist_func_lock(
            &self,
            key: String,
            f: Producer<'_, i32>,
            _: Duration,
        ) -> Result<bool> {
            self.record(&format!("set_if_not_exist_func_lock {key}"));
            Ok(f()?.is_some())
        }

        fn get(&self, key: &String) -> Result<Option<i32>> {
            self.record(&format!("get {key}"));
            Ok(None)
        }

        fn get_or_set(
            &self,
            key: String,
            value: Payload<'_, i32>,
            _: Duration,
        ) -> Result<Option<i32>> {
            self.record(&format!("get_or_set {key}"));
            match value {
                Payload::Value(value) => Ok(Some(value)),
                Payload::Producer(f) => Ok(f()?),
            }
        }

        fn get_or_set_func(
            &self,
            key: String,
            f: Producer<'_, i32>,
            _: Duration,
        ) -> Result<Option<i32>> {
            self.record(&format!("get_or_set_func {key}"));
            Ok(f()?)
        }

        fn get_or_set_func_lock(
            &self,
            key: String,
            f: Producer<'_, i32>,
            _: Duration,
        ) -> Result<Option<i32>> {
            self.record(&format!("get_or_set_func_lock {key}"));
            Ok(f()?)
        }

        fn get_expire(&self, key: &String) -> Result<Duration> {
            self.record(&format!("get_expire {key}"));
            Ok(Duration::milliseconds(-1))
        }

        fn update(&self, key: &String, _: i32) -> Result<(Option<i32>, bool)> {
            self.record(&format!("update {key}"));
            Ok((None, false))
        }

        fn update_expire(&self, key: &String, _: Duration) -> Result<Duration> {
            self.record(&format!("update_expire {key}"));
            Ok(Duration::milliseconds(-1))
        }

        fn remove(&self, keys: &[String]) -> Result<Option<i32>> {
            self.record(&format!("remove {}", keys.join(",")));
            Ok(None)
        }

        fn size(&self) -> Result<usize> {
            self.record("size");
            Ok(7)
        }

        fn keys(&self) -> Result<Vec<String>> {
            Err(CacheError::Adapter("keys unsupported".to_string()))
        }

        fn values(&self) -> Result<Vec<i32>> {
            Ok(Vec::new())
        }

        fn data(&self) -> Result<HashMap<String, i32>> {
            Ok(HashMap::new())
        }

        fn clear(&self) -> Result<()> {
            self.record("clear");
            Ok(())
        }

        fn close(&self) -> Result<()> {
            self.record("close");
            Ok(())
        }
    }

    fn recording_cache() -> (Cache<String, i32>, Arc<RecordingAdapter>) {
        let adapter = Arc::new(RecordingAdapter::default());
        (Cache::with_adapter(adapter.clone()), adapter)
    }

    #[test]
    fn test_delegates_unchanged() {
        let (cache, adapter) = recording_cache();

        cache.set("a".to_string(), 1, Duration::seconds(2)).unwrap();
        cache.get(&"a".to_string()).unwrap();
        cache.contains(&"a".to_string()).unwrap();
        cache.remove(&["a".to_string(), "b".to_string()]).unwrap();
        cache.clear().unwrap();
        cache.close().unwrap();

        assert_eq!(
            adapter.calls(),
            vec![
                "set a 2000",
                "get a",
                "get a",
                "remove a,b",
                "clear",
                "close"
            ]
        );
    }

    #[test]
    fn test_closures_are_boxed_for_the_adapter() {
        let (cache, adapter) = recording_cache();

        let value = cache
            .get_or_set_func_lock("k".to_string(), || Ok(Some(42)), Duration::zero())
            .unwrap();
        assert_eq!(value, Some(42));

        let stored = cache
            .set_if_not_exist_func("k".to_string(), || Ok(None), Duration::zero())
            .unwrap();
        assert!(!stored);

        assert_eq!(
            adapter.calls(),
            vec!["get_or_set_func_lock k", "set_if_not_exist_func k"]
        );
    }

    #[test]
    fn test_get_or_set_accepts_value_or_producer() {
        let (cache, _) = recording_cache();

        let value = cache
            .get_or_set("k".to_string(), 5, Duration::zero())
            .unwrap();
        assert_eq!(value, Some(5));

        let value = cache
            .get_or_set(
                "k".to_string(),
                Payload::producer(|| Ok(Some(6))),
                Duration::zero(),
            )
            .unwrap();
        assert_eq!(value, Some(6));
    }

    #[test]
    fn test_adapter_errors_are_forwarded() {
        let (cache, _) = recording_cache();

        let err = cache.keys().unwrap_err();
        assert_eq!(err.to_string(), "Adapter error: keys unsupported");

        let err = cache
            .get_or_set_func("k".to_string(), || Err(anyhow::anyhow!("boom")), Duration::zero())
            .unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn test_default_stats_report_size() {
        let (cache, _) = recording_cache();

        let stats = cache.stats().unwrap();
        assert_eq!(stats.total_entries, 7);
        assert_eq!(stats.hits, 0);
    }

    #[test]
    fn test_set_adapter_swaps_backend() {
        let cache: Cache<String, i32> = Cache::new();
        cache.set("a".to_string(), 1, Duration::zero()).unwrap();

        let adapter = Arc::new(RecordingAdapter::default());
        cache.set_adapter(adapter.clone());

        assert_eq!(cache.get(&"a".to_string()).unwrap(), None);
        assert_eq!(adapter.calls(), vec!["get a"]);
    }

    #[test]
    fn test_default_cache_is_shared() {
        let key = "facade-default-test".to_string();
        default_cache()
            .set(key.clone(), serde_json::json!({"n": 1}), Duration::zero())
            .unwrap();

        assert_eq!(
            default_cache().get(&key).unwrap(),
            Some(serde_json::json!({"n": 1}))
        );
        default_cache().remove(&[key]).unwrap();
    }
}
