//! Expiration Index Module
//!
//! Groups keys by the second in which they expire, so the janitor can find
//! the keys that just elapsed without scanning the whole store.

use std::collections::HashMap;
use std::hash::Hash;

use dashmap::mapref::one::RefMut;
use dashmap::{DashMap, DashSet};
use parking_lot::Mutex;

// == Public Constants ==
/// Width of one expiry bucket in milliseconds.
pub const BUCKET_WIDTH_MS: i64 = 1000;

/// Bucket value meaning "key not indexed yet".
pub const NO_BUCKET: i64 = 0;

// == Bucket Math ==
/// Maps an absolute expiry to its bucket: `ceil(expire_at / 1000 + 1) * 1000`.
///
/// Saturates at the ends of the `i64` range.
pub fn bucket_of(expire_at: i64) -> i64 {
    expire_at
        .saturating_add(BUCKET_WIDTH_MS - 1)
        .div_euclid(BUCKET_WIDTH_MS)
        .saturating_add(1)
        .saturating_mul(BUCKET_WIDTH_MS)
}

// == Expiration Index ==
/// Two-way mapping between keys and expiry buckets.
///
/// Invariant: a key with `key_to_bucket[k] = b` is a member of
/// `bucket_to_keys[b]`. A bucket may briefly hold keys that were moved or
/// deleted; the janitor tolerates those.
pub struct ExpirationIndex<K> {
    key_to_bucket: Mutex<HashMap<K, i64>>,
    bucket_to_keys: DashMap<i64, DashSet<K>>,
}

impl<K> Default for ExpirationIndex<K>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K> ExpirationIndex<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self {
            key_to_bucket: Mutex::new(HashMap::new()),
            bucket_to_keys: DashMap::new(),
        }
    }

    /// Bucket the key is indexed under, or [`NO_BUCKET`].
    pub fn get_bucket(&self, key: &K) -> i64 {
        self.key_to_bucket
            .lock()
            .get(key)
            .copied()
            .unwrap_or(NO_BUCKET)
    }

    pub fn set_bucket(&self, key: K, bucket: i64) {
        self.key_to_bucket.lock().insert(key, bucket);
    }

    /// Drops the key's bucket assignment and returns it.
    pub fn remove_bucket(&self, key: &K) -> i64 {
        self.key_to_bucket
            .lock()
            .remove(key)
            .unwrap_or(NO_BUCKET)
    }

    /// Drops the key's bucket assignment only if it still points at `bucket`.
    pub fn remove_bucket_if(&self, key: &K, bucket: i64) -> bool {
        let mut key_to_bucket = self.key_to_bucket.lock();
        if key_to_bucket.get(key) == Some(&bucket) {
            key_to_bucket.remove(key);
            true
        } else {
            false
        }
    }

    /// Key set of `bucket`, created on demand.
    ///
    /// Holds a shard lock of the bucket map while alive; keep it short.
    pub fn bucket_set(&self, bucket: i64) -> RefMut<'_, i64, DashSet<K>> {
        self.bucket_to_keys.entry(bucket).or_default()
    }

    /// Removes `key` from the key set of `bucket`, if that set exists.
    pub fn remove_from_bucket(&self, bucket: i64, key: &K) {
        if let Some(set) = self.bucket_to_keys.get(&bucket) {
            set.remove(key);
        }
    }

    /// Removes `bucket` and hands back its keys.
    pub fn delete_bucket(&self, bucket: i64) -> Option<DashSet<K>> {
        self.bucket_to_keys.remove(&bucket).map(|(_, keys)| keys)
    }

    // == Move ==
    /// Re-indexes `key` under `new_bucket`.
    ///
    /// Returns `false` when the key already sat in that bucket.
    pub fn reindex(&self, key: &K, new_bucket: i64) -> bool {
        let old_bucket = self.get_bucket(key);
        if old_bucket == new_bucket {
            return false;
        }
        self.bucket_set(new_bucket).insert(key.clone());
        if old_bucket != NO_BUCKET {
            self.remove_from_bucket(old_bucket, key);
        }
        self.set_bucket(key.clone(), new_bucket);
        true
    }

    /// Removes every trace of `key` from the index.
    pub fn unindex(&self, key: &K) {
        let old_bucket = self.remove_bucket(key);
        if old_bucket != NO_BUCKET {
            self.remove_from_bucket(old_bucket, key);
        }
    }

    /// Number of indexed keys.
    pub fn len(&self) -> usize {
        self.key_to_bucket.lock().len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of live buckets.
    pub fn bucket_count(&self) -> usize {
        self.bucket_to_keys.len()
    }

    pub fn clear(&self) {
        self.key_to_bucket.lock().clear();
        self.bucket_to_keys.clear();
    }
}
