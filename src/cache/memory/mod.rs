//! Memory Adapter
//!
//! In-process implementation of the [`Adapter`] contract.
//!
//! # Design
//! - Writers update the store, then append an expiry event to a lock-free
//!   log and (with a capacity) promote the key in the LRU index.
//! - Readers check the item's embedded expiry, so an expired item is never
//!   returned even before it is physically collected.
//! - A janitor job on the process-wide [`Timer`] drains the event log into an
//!   expiration index bucketed by second and deletes the keys of elapsed
//!   buckets. A key may therefore stay in memory about one second past its
//!   expiry.
//! - LRU eviction is synchronous: the write that overflows the capacity
//!   deletes the coldest keys before it returns.
//!
//! # Closing
//! [`close`](Adapter::close) stops the janitor on its next tick. The adapter
//! keeps serving from memory afterwards; expired items are then only hidden
//! by the read path. Dropping the adapter stops the janitor the same way.

mod events;
mod expiry;
mod flight;
mod item;
mod janitor;
mod lru;
mod store;

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration as StdDuration;

use chrono::Duration;
use tracing::{info, trace};

use crate::cache::adapter::{Adapter, Payload, Producer};
use crate::cache::stats::{CacheStats, StatsRecorder};
use crate::clock::{expiry_from, now_millis};
use crate::config::Config;
use crate::error::Result;
use crate::tasks::{JobHandle, Timer, TimerControl};

use events::EventLog;
use expiry::ExpirationIndex;
use item::Item;
use lru::LruIndex;
use store::Store;

pub use expiry::{bucket_of, BUCKET_WIDTH_MS};
pub use janitor::{SweepReport, EXPIRY_SCAN_WINDOW};

// == Public Constants ==
/// Default period of the janitor job.
pub const DEFAULT_JANITOR_INTERVAL: StdDuration = StdDuration::from_secs(1);

/// How far in the past removal events place a key, so the janitor drops it
/// from the expiration index.
const REMOVED_OFFSET_MS: i64 = 1_000_000;

// == Shared State ==
/// Everything the janitor needs, shared between the adapter and its job.
pub(crate) struct MemoryState<K, V> {
    store: Store<K, V>,
    index: ExpirationIndex<K>,
    events: EventLog<K>,
    /// `None` when the adapter has no capacity limit
    lru: Option<LruIndex<K>>,
    stats: StatsRecorder,
    closed: AtomicBool,
}

impl<K, V> MemoryState<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn new(capacity: usize) -> Self {
        Self {
            store: Store::new(),
            index: ExpirationIndex::new(),
            events: EventLog::new(),
            lru: (capacity > 0).then(|| LruIndex::new(capacity)),
            stats: StatsRecorder::new(),
            closed: AtomicBool::new(false),
        }
    }
}

// == Memory Adapter ==
/// In-process cache storage with lazy expiration and optional LRU capacity.
///
/// # Example
/// ```
/// use chrono::Duration;
/// use lazycache::cache::{Adapter, MemoryAdapter};
///
/// let adapter = MemoryAdapter::new(0);
/// adapter.set("answer", 42, Duration::zero()).unwrap();
/// assert_eq!(adapter.get(&"answer").unwrap(), Some(42));
/// ```
pub struct MemoryAdapter<K, V> {
    state: Arc<MemoryState<K, V>>,
    capacity: usize,
    janitor: JobHandle,
}

impl<K, V> MemoryAdapter<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    // == Constructors ==
    /// Creates an adapter; `capacity` 0 disables LRU eviction.
    pub fn new(capacity: usize) -> Self {
        Self::with_interval(capacity, DEFAULT_JANITOR_INTERVAL)
    }

    /// Creates an adapter whose janitor runs every `interval`.
    pub fn with_interval(capacity: usize, interval: StdDuration) -> Self {
        let state = Arc::new(MemoryState::new(capacity));
        let weak: Weak<MemoryState<K, V>> = Arc::downgrade(&state);
        let janitor = Timer::global().add("cache-janitor", interval, move || {
            match weak.upgrade() {
                Some(state) => janitor::tick(&state),
                None => TimerControl::Stop,
            }
        });

        info!(
            "Memory adapter created: capacity={}, janitor_interval={:?}",
            capacity, interval
        );

        Self {
            state,
            capacity,
            janitor,
        }
    }

    /// Creates an adapter from the capacity and janitor period of `config`.
    pub fn from_config(config: &Config) -> Self {
        Self::with_interval(
            config.capacity,
            StdDuration::from_millis(config.janitor_interval_ms),
        )
    }

    /// Configured LRU capacity, 0 when unlimited.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_closed(&self) -> bool {
        self.state.closed.load(Ordering::Acquire)
    }

    /// Whether the janitor job has deregistered itself.
    pub fn janitor_stopped(&self) -> bool {
        self.janitor.is_finished()
    }

    /// Runs one janitor sweep right away, independent of the timer.
    pub fn sweep(&self) -> SweepReport {
        janitor::sweep(&self.state, now_millis())
    }

    // == Internal Helpers ==
    /// Promotes `key` in the LRU index and deletes whatever it evicts.
    fn touch(&self, key: &K) {
        let Some(lru) = &self.state.lru else {
            return;
        };
        let evicted = lru.touch(key);
        if evicted.is_empty() {
            return;
        }

        let marker = now_millis() - REMOVED_OFFSET_MS;
        for key in &evicted {
            self.state.store.force_remove(key);
            self.state.events.push(key.clone(), marker);
        }
        self.state.stats.record_evictions(evicted.len());
        trace!("LRU evicted {} entries", evicted.len());
    }

    /// Stores an item and records it for the janitor and the LRU.
    fn write(&self, key: K, value: V, expire_at: i64) {
        self.state.store.set(key.clone(), Item::new(value, expire_at));
        self.state.events.push(key.clone(), expire_at);
        self.touch(&key);
    }

    /// Writes through the store's single-flight section.
    ///
    /// # Returns
    /// The effective value and whether this call stored it.
    fn write_with_lock(
        &self,
        key: K,
        payload: Payload<'_, V>,
        duration: Duration,
    ) -> Result<(Option<V>, bool)> {
        if duration < Duration::zero() {
            // Remove after the flight so a concurrent leader's write is undone too.
            let produced = self.state.store.produce_with_lock(&key, payload);
            self.remove(std::slice::from_ref(&key))?;
            return Ok((produced?, false));
        }

        let expire_at = expiry_from(duration);
        let (value, written) = self
            .state
            .store
            .set_with_lock(key.clone(), payload, expire_at)?;
        if written {
            self.state.events.push(key.clone(), expire_at);
        }
        if value.is_some() {
            self.touch(&key);
        }
        Ok((value, written))
    }
}

impl<K, V> Adapter<K, V> for MemoryAdapter<K, V>
where
    K: Eq + Hash + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    fn set(&self, key: K, value: V, duration: Duration) -> Result<()> {
        if duration < Duration::zero() {
            self.remove(std::slice::from_ref(&key))?;
            return Ok(());
        }
        self.write(key, value, expiry_from(duration));
        Ok(())
    }

    fn set_map(&self, data: HashMap<K, V>, duration: Duration) -> Result<()> {
        if duration < Duration::zero() {
            let keys: Vec<K> = data.into_keys().collect();
            self.remove(&keys)?;
            return Ok(());
        }
        let expire_at = expiry_from(duration);
        for (key, value) in data {
            self.write(key, value, expire_at);
        }
        Ok(())
    }

    fn set_if_not_exist(&self, key: K, value: V, duration: Duration) -> Result<bool> {
        if self.contains(&key)? || duration < Duration::zero() {
            return Ok(false);
        }
        self.write(key, value, expiry_from(duration));
        Ok(true)
    }

    fn set_if_not_exist_func(
        &self,
        key: K,
        f: Producer<'_, V>,
        duration: Duration,
    ) -> Result<bool> {
        if self.contains(&key)? || duration < Duration::zero() {
            return Ok(false);
        }
        match f()? {
            Some(value) => {
                self.write(key, value, expiry_from(duration));
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn set_if_not_exist_func_lock(
        &self,
        key: K,
        f: Producer<'_, V>,
        duration: Duration,
    ) -> Result<bool> {
        if self.contains(&key)? || duration < Duration::zero() {
            return Ok(false);
        }
        let (_, written) = self.write_with_lock(key, Payload::Producer(f), duration)?;
        Ok(written)
    }

    fn get(&self, key: &K) -> Result<Option<V>> {
        match self.state.store.get_unexpired(key, now_millis()) {
            Some(value) => {
                self.state.stats.record_hit();
                self.touch(key);
                Ok(Some(value))
            }
            None => {
                self.state.stats.record_miss();
                Ok(None)
            }
        }
    }

    fn get_or_set(&self, key: K, value: Payload<'_, V>, duration: Duration) -> Result<Option<V>> {
        if let Some(existing) = self.get(&key)? {
            return Ok(Some(existing));
        }
        let (value, _) = self.write_with_lock(key, value, duration)?;
        Ok(value)
    }

    fn get_or_set_func(
        &self,
        key: K,
        f: Producer<'_, V>,
        duration: Duration,
    ) -> Result<Option<V>> {
        if let Some(existing) = self.get(&key)? {
            return Ok(Some(existing));
        }
        match f()? {
            Some(value) => {
                let (value, _) = self.write_with_lock(key, Payload::Value(value), duration)?;
                Ok(value)
            }
            None => Ok(None),
        }
    }

    fn get_or_set_func_lock(
        &self,
        key: K,
        f: Producer<'_, V>,
        duration: Duration,
    ) -> Result<Option<V>> {
        if let Some(existing) = self.get(&key)? {
            return Ok(Some(existing));
        }
        let (value, _) = self.write_with_lock(key, Payload::Producer(f), duration)?;
        Ok(value)
    }

    fn get_expire(&self, key: &K) -> Result<Duration> {
        let now = now_millis();
        let remaining = match self.state.store.get(key) {
            Some(item) if !item.is_expired_at(now) => item.remaining_at(now),
            _ => -1,
        };
        Ok(Duration::milliseconds(remaining))
    }

    fn update(&self, key: &K, value: V) -> Result<(Option<V>, bool)> {
        let (old, existed) = self.state.store.update_value(key, value);
        if existed {
            self.touch(key);
        }
        Ok((old, existed))
    }

    fn update_expire(&self, key: &K, duration: Duration) -> Result<Duration> {
        let expire_at = expiry_from(duration);
        let previous = self.state.store.update_expiry(key, expire_at);
        if previous != -1 {
            self.state.events.push(key.clone(), expire_at);
            self.touch(key);
        }
        Ok(Duration::milliseconds(previous))
    }

    fn remove(&self, keys: &[K]) -> Result<Option<V>> {
        if keys.is_empty() {
            return Ok(None);
        }
        let (removed, last_value) = self.state.store.remove(keys);
        let marker = now_millis() - REMOVED_OFFSET_MS;
        for key in &removed {
            self.state.events.push(key.clone(), marker);
        }
        if let Some(lru) = &self.state.lru {
            lru.remove_many(&removed);
        }
        Ok(last_value)
    }

    fn size(&self) -> Result<usize> {
        Ok(self.state.store.len())
    }

    fn keys(&self) -> Result<Vec<K>> {
        Ok(self.state.store.keys())
    }

    fn values(&self) -> Result<Vec<V>> {
        Ok(self.state.store.values())
    }

    fn data(&self) -> Result<HashMap<K, V>> {
        Ok(self.state.store.data())
    }

    fn clear(&self) -> Result<()> {
        self.state.store.clear();
        if let Some(lru) = &self.state.lru {
            lru.clear();
        }
        self.state.index.clear();
        Ok(())
    }

    fn close(&self) -> Result<()> {
        if !self.state.closed.swap(true, Ordering::AcqRel) {
            info!("Memory adapter closed");
        }
        Ok(())
    }

    fn stats(&self) -> Result<CacheStats> {
        Ok(self.state.stats.snapshot(self.state.store.len()))
    }
}
