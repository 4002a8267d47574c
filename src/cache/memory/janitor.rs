//! Janitor
//!
//! Periodic sweep of the memory adapter. Each tick first drains the event
//! log into the expiration index, then collects the keys of the buckets that
//! elapsed during the last few seconds.

use std::hash::Hash;
use std::sync::atomic::Ordering;

use tracing::{debug, info};

use super::expiry::{bucket_of, BUCKET_WIDTH_MS};
use super::MemoryState;
use crate::clock::now_millis;
use crate::tasks::TimerControl;

/// Number of elapsed buckets scanned per tick.
///
/// Scanning a window instead of only the last bucket absorbs tick jitter and
/// retries events that were drained a tick late.
pub const EXPIRY_SCAN_WINDOW: i64 = 5;

/// Work done by one sweep.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepReport {
    /// Events drained from the log
    pub events: usize,
    /// Expired keys deleted from the store
    pub expired: usize,
}

// == Tick ==
/// One timer tick. Stops the job once the adapter is closed.
pub(super) fn tick<K, V>(state: &MemoryState<K, V>) -> TimerControl
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    if state.closed.load(Ordering::Acquire) {
        info!("Memory adapter closed, janitor stopping");
        return TimerControl::Stop;
    }

    let report = sweep(state, now_millis());
    if report.events > 0 || report.expired > 0 {
        debug!(
            "Janitor: drained {} events, removed {} expired entries, {} keys in {} buckets",
            report.events,
            report.expired,
            state.index.len(),
            state.index.bucket_count()
        );
    }
    TimerControl::Continue
}

// == Sweep ==
/// Drains pending events and collects expired keys as of `now`.
pub(super) fn sweep<K, V>(state: &MemoryState<K, V>, now: i64) -> SweepReport
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    let current = bucket_of(now);
    let oldest_scanned = current - EXPIRY_SCAN_WINDOW * BUCKET_WIDTH_MS;
    let mut report = SweepReport::default();

    for event in state.events.drain() {
        report.events += 1;

        let live_expiry = match state.store.get(&event.key) {
            Some(item) if item.is_expired_at(now) => {
                // Already elapsed; its bucket may lie behind the scan window.
                if collect(state, &event.key, now) {
                    report.expired += 1;
                }
                state.index.unindex(&event.key);
                continue;
            }
            Some(item) => item.expire_at,
            None => {
                // Also drops LRU entries left by a remove racing a write.
                if let Some(lru) = &state.lru {
                    lru.remove(&event.key);
                }
                state.index.unindex(&event.key);
                continue;
            }
        };

        // Removal markers land far behind the scan window; a key that is
        // present again was re-set meanwhile and follows its live expiry.
        let mut bucket = bucket_of(event.expire_at);
        if bucket < oldest_scanned {
            bucket = bucket_of(live_expiry);
        }
        state.index.reindex(&event.key, bucket);
    }

    for offset in 1..=EXPIRY_SCAN_WINDOW {
        let bucket = current - offset * BUCKET_WIDTH_MS;
        let keys = match state.index.delete_bucket(bucket) {
            Some(keys) => keys,
            None => continue,
        };

        for key in keys {
            match state.store.get(&key) {
                Some(item) if !item.is_expired_at(now) => {
                    // Stale assignment: the expiry moved without an event
                    // being drained in order.
                    if state.index.get_bucket(&key) == bucket {
                        state.index.reindex(&key, bucket_of(item.expire_at));
                    }
                }
                _ => {
                    if collect(state, &key, now) {
                        report.expired += 1;
                        state.index.remove_bucket_if(&key, bucket);
                    } else if !state.store.contains_key(&key) {
                        state.index.remove_bucket_if(&key, bucket);
                    }
                }
            }
        }
    }

    state.stats.record_expired(report.expired);
    report
}

/// Deletes `key` if it is expired at `now`, together with its LRU entry.
fn collect<K, V>(state: &MemoryState<K, V>, key: &K, now: i64) -> bool
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    if !state.store.remove_expired(key, now) {
        return false;
    }
    if let Some(lru) = &state.lru {
        lru.remove(key);
    }
    true
}
