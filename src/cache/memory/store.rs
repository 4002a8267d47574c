//! Cache Store Module
//!
//! Concurrent key → item map owned by the memory adapter.

use std::collections::HashMap;
use std::hash::Hash;
use std::mem;

use dashmap::DashMap;

use super::flight::SingleFlight;
use super::item::Item;
use crate::cache::adapter::Payload;
use crate::clock::now_millis;
use crate::error::Result;

// == Store ==
/// Sharded map from key to [`Item`].
///
/// Writers to the same shard are serialized, readers run concurrently.
/// Producer-backed writes additionally go through a per-key single-flight
/// barrier so that at most one producer per key runs at a time.
pub struct Store<K, V> {
    entries: DashMap<K, Item<V>>,
    flights: SingleFlight<K, V>,
}

impl<K, V> Default for Store<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> Store<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    // == Constructor ==
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            flights: SingleFlight::new(),
        }
    }

    // == Get ==
    /// Returns a copy of the stored item, expired or not.
    pub fn get(&self, key: &K) -> Option<Item<V>> {
        self.entries.get(key).map(|item| item.value().clone())
    }

    /// Returns the value if the item is present and not expired at `now`.
    pub fn get_unexpired(&self, key: &K, now: i64) -> Option<V> {
        self.entries
            .get(key)
            .filter(|item| !item.is_expired_at(now))
            .map(|item| item.value.clone())
    }

    pub fn contains_key(&self, key: &K) -> bool {
        self.entries.contains_key(key)
    }

    // == Set ==
    /// Writes `item` unconditionally.
    pub fn set(&self, key: K, item: Item<V>) {
        self.entries.insert(key, item);
    }

    // == Set With Lock ==
    /// Read-then-maybe-write inside the key's single-flight section.
    ///
    /// If the key holds an unexpired item, its value is returned and nothing
    /// is written. Otherwise the payload is materialized (running the
    /// producer if it is one) and stored when it is `Some`.
    ///
    /// # Returns
    /// The effective value and whether this call wrote it.
    pub fn set_with_lock(
        &self,
        key: K,
        payload: Payload<'_, V>,
        expire_at: i64,
    ) -> Result<(Option<V>, bool)> {
        let mut written = false;
        let value = self.flights.work(&key, || {
            if let Some(existing) = self.get_unexpired(&key, now_millis()) {
                return Ok(Some(existing));
            }
            let value = match payload {
                Payload::Value(value) => Some(value),
                Payload::Producer(produce) => produce()?,
            };
            if let Some(value) = &value {
                self.entries
                    .insert(key.clone(), Item::new(value.clone(), expire_at));
                written = true;
            }
            Ok(value)
        })?;
        Ok((value, written))
    }

    /// Materializes `payload` inside the key's single-flight section without
    /// writing it.
    pub fn produce_with_lock(&self, key: &K, payload: Payload<'_, V>) -> Result<Option<V>> {
        self.flights.work(key, || match payload {
            Payload::Value(value) => Ok(Some(value)),
            Payload::Producer(produce) => Ok(produce()?),
        })
    }

    // == Update ==
    /// Replaces the value of an unexpired item, keeping its expiry.
    ///
    /// # Returns
    /// `(old_value, true)` on success, `(None, false)` if absent or expired.
    pub fn update_value(&self, key: &K, value: V) -> (Option<V>, bool) {
        let now = now_millis();
        match self.entries.get_mut(key) {
            Some(mut item) if !item.is_expired_at(now) => {
                let old = mem::replace(&mut item.value, value);
                (Some(old), true)
            }
            _ => (None, false),
        }
    }

    /// Replaces the expiry of an unexpired item.
    ///
    /// # Returns
    /// The previous remaining lifetime in milliseconds (`0` for items that
    /// never expired), or `-1` if the key is absent or expired.
    pub fn update_expiry(&self, key: &K, expire_at: i64) -> i64 {
        let now = now_millis();
        match self.entries.get_mut(key) {
            Some(mut item) if !item.is_expired_at(now) => {
                let remaining = item.remaining_at(now);
                item.expire_at = expire_at;
                remaining
            }
            _ => -1,
        }
    }

    // == Remove ==
    /// Deletes every key in `keys`.
    ///
    /// # Returns
    /// The keys that were present, and the value of the last one removed
    /// that had not expired yet.
    pub fn remove(&self, keys: &[K]) -> (Vec<K>, Option<V>) {
        let now = now_millis();
        let mut removed = Vec::with_capacity(keys.len());
        let mut last_value = None;
        for key in keys {
            if let Some((key, item)) = self.entries.remove(key) {
                if !item.is_expired_at(now) {
                    last_value = Some(item.value);
                }
                removed.push(key);
            }
        }
        (removed, last_value)
    }

    /// Deletes `key` only if its item has expired at `now`.
    pub fn remove_expired(&self, key: &K, now: i64) -> bool {
        self.entries
            .remove_if(key, |_, item| item.is_expired_at(now))
            .is_some()
    }

    /// Deletes `key` regardless of expiry.
    pub fn force_remove(&self, key: &K) -> bool {
        self.entries.remove(key).is_some()
    }

    // == Snapshots ==
    // Snapshots include items that expired but were not collected yet.

    /// Number of stored items.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn keys(&self) -> Vec<K> {
        self.entries.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn values(&self) -> Vec<V> {
        self.entries
            .iter()
            .map(|entry| entry.value().value.clone())
            .collect()
    }

    pub fn data(&self) -> HashMap<K, V> {
        self.entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().value.clone()))
            .collect()
    }

    pub fn clear(&self) {
        self.entries.clear();
    }
}
