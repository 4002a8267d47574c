//! Adapter Contract
//!
//! The storage boundary the [`Cache`](crate::cache::Cache) façade delegates
//! to. The in-process [`MemoryAdapter`](crate::cache::MemoryAdapter) is one
//! implementation; a backend over an external key-value service implements
//! the same trait with these allowances:
//!
//! - "never expires" maps to the backend's no-TTL form,
//! - `keys`/`values`/`data` need not be consistent across keys,
//! - `clear` may be a no-op when the backend forbids flushing.
//!
//! # Durations
//! Durations are signed: zero means "never expires" and a negative duration
//! removes the key (or, for `update_expire`, expires it immediately).
//! `get_expire`/`update_expire` report `-1 ms` for absent keys and `0` for
//! keys without expiry.

use std::collections::HashMap;

use chrono::Duration;

use crate::cache::CacheStats;
use crate::error::Result;

// == Producer ==
/// Zero-argument function that lazily materializes a value.
///
/// `Ok(None)` is a successful "nothing to store" outcome, not an error.
pub type Producer<'a, V> = Box<dyn FnOnce() -> anyhow::Result<Option<V>> + 'a>;

// == Payload ==
/// Either a concrete value or a producer for it.
pub enum Payload<'a, V> {
    Value(V),
    Producer(Producer<'a, V>),
}

impl<'a, V> Payload<'a, V> {
    /// Wraps a closure as a producer payload.
    pub fn producer<F>(f: F) -> Self
    where
        F: FnOnce() -> anyhow::Result<Option<V>> + 'a,
    {
        Payload::Producer(Box::new(f))
    }
}

impl<'a, V> From<V> for Payload<'a, V> {
    fn from(value: V) -> Self {
        Payload::Value(value)
    }
}

// == Adapter Trait ==
/// Storage operations behind the cache façade.
///
/// Every method returns [`Result`] so backends can surface their own
/// failures; producer errors are forwarded unchanged and leave no entry.
pub trait Adapter<K, V>: Send + Sync {
    /// Stores `value` under `key`. A negative duration removes the key.
    fn set(&self, key: K, value: V, duration: Duration) -> Result<()>;

    /// Stores every pair with one expiry computed once for the batch.
    fn set_map(&self, data: HashMap<K, V>, duration: Duration) -> Result<()>;

    /// Stores `value` only if `key` holds no live value. Returns whether it did.
    fn set_if_not_exist(&self, key: K, value: V, duration: Duration) -> Result<bool>;

    /// Like [`set_if_not_exist`](Adapter::set_if_not_exist) but runs `f`
    /// (outside any lock) to produce the value.
    fn set_if_not_exist_func(&self, key: K, f: Producer<'_, V>, duration: Duration)
        -> Result<bool>;

    /// Like [`set_if_not_exist_func`](Adapter::set_if_not_exist_func) but at
    /// most one `f` per key runs across concurrent callers.
    fn set_if_not_exist_func_lock(
        &self,
        key: K,
        f: Producer<'_, V>,
        duration: Duration,
    ) -> Result<bool>;

    /// Returns the live value of `key`, if any.
    fn get(&self, key: &K) -> Result<Option<V>>;

    /// Returns the live value, or stores and returns `value` (running it
    /// first if it is a producer).
    fn get_or_set(&self, key: K, value: Payload<'_, V>, duration: Duration) -> Result<Option<V>>;

    /// Returns the live value, or runs `f` outside any lock and stores its
    /// result.
    fn get_or_set_func(&self, key: K, f: Producer<'_, V>, duration: Duration)
        -> Result<Option<V>>;

    /// Returns the live value, or runs `f` so that at most one `f` per key
    /// runs across concurrent callers; all of them receive its result.
    fn get_or_set_func_lock(
        &self,
        key: K,
        f: Producer<'_, V>,
        duration: Duration,
    ) -> Result<Option<V>>;

    fn contains(&self, key: &K) -> Result<bool> {
        Ok(self.get(key)?.is_some())
    }

    /// Remaining lifetime of `key`: `-1 ms` if absent, zero if it never expires.
    fn get_expire(&self, key: &K) -> Result<Duration>;

    /// Replaces the value keeping the expiry. Returns the old value and
    /// whether the key existed.
    fn update(&self, key: &K, value: V) -> Result<(Option<V>, bool)>;

    /// Replaces the expiry of an existing key and returns its previous
    /// remaining lifetime, or `-1 ms` if absent. Never creates the key.
    fn update_expire(&self, key: &K, duration: Duration) -> Result<Duration>;

    /// Deletes `keys` and returns the last removed value.
    fn remove(&self, keys: &[K]) -> Result<Option<V>>;

    fn size(&self) -> Result<usize>;

    fn keys(&self) -> Result<Vec<K>>;

    fn values(&self) -> Result<Vec<V>>;

    fn data(&self) -> Result<HashMap<K, V>>;

    fn clear(&self) -> Result<()>;

    /// Releases background resources. The adapter may keep serving reads.
    fn close(&self) -> Result<()>;

    /// Usage counters. Backends that track nothing report only the size.
    fn stats(&self) -> Result<CacheStats> {
        let mut stats = CacheStats::new();
        stats.set_total_entries(self.size()?);
        Ok(stats)
    }
}
