//! LRU Index Module
//!
//! Bounded recency order used for capacity-based eviction.

use std::collections::HashMap;
use std::hash::Hash;

use parking_lot::Mutex;

use crate::ds::{LinkedList, NodeId};

struct LruState<K> {
    /// Front = least recently used, back = most recently used
    order: LinkedList<K>,
    /// Locator for O(1) move and unlink
    nodes: HashMap<K, NodeId>,
}

// == LRU Index ==
/// Tracks access order and yields the keys to evict once `capacity` is exceeded.
///
/// A single mutex guards the list and its locator map.
pub struct LruIndex<K> {
    capacity: usize,
    state: Mutex<LruState<K>>,
}

impl<K> LruIndex<K>
where
    K: Eq + Hash + Clone,
{
    // == Constructor ==
    /// Creates an index holding at most `capacity` keys (at least one).
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            state: Mutex::new(LruState {
                order: LinkedList::new(),
                nodes: HashMap::new(),
            }),
        }
    }

    #[allow(dead_code)]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    // == Touch ==
    /// Marks `key` as most recently used.
    ///
    /// Unknown keys are inserted. Returns the keys unlinked from the cold end
    /// when the index grew past its capacity; the caller must delete them
    /// from the store.
    pub fn touch(&self, key: &K) -> Vec<K> {
        let mut state = self.state.lock();
        match state.nodes.get(key).copied() {
            Some(id) => {
                state.order.move_to_back(id);
            }
            None => {
                let id = state.order.push_back(key.clone());
                state.nodes.insert(key.clone(), id);
            }
        }

        let overflow = state.order.len().saturating_sub(self.capacity);
        let mut evicted = Vec::with_capacity(overflow);
        for _ in 0..overflow {
            if let Some(oldest) = state.order.pop_front() {
                state.nodes.remove(&oldest);
                evicted.push(oldest);
            }
        }
        evicted
    }

    // == Remove ==
    pub fn remove(&self, key: &K) {
        let mut state = self.state.lock();
        if let Some(id) = state.nodes.remove(key) {
            state.order.remove(id);
        }
    }

    /// Unlinks every key in `keys` under one lock acquisition.
    pub fn remove_many<'a, I>(&self, keys: I)
    where
        I: IntoIterator<Item = &'a K>,
        K: 'a,
    {
        let mut state = self.state.lock();
        for key in keys {
            if let Some(id) = state.nodes.remove(key) {
                state.order.remove(id);
            }
        }
    }

    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.order.clear();
        state.nodes.clear();
    }

    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.state.lock().order.len()
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[allow(dead_code)]
    pub fn contains(&self, key: &K) -> bool {
        self.state.lock().nodes.contains_key(key)
    }

    /// Returns the next eviction candidate without removing it.
    #[allow(dead_code)]
    pub fn peek_oldest(&self) -> Option<K> {
        self.state.lock().order.front().cloned()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    fn lru_with(capacity: usize, keys: &[&'static str]) -> LruIndex<&'static str> {
        let lru = LruIndex::new(capacity);
        for key in keys {
            assert!(lru.touch(key).is_empty());
        }
        lru
    }

    #[test]
    fn test_lru_new() {
        let lru: LruIndex<String> = LruIndex::new(3);
        assert!(lru.is_empty());
        assert_eq!(lru.capacity(), 3);
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let lru: LruIndex<String> = LruIndex::new(0);
        assert_eq!(lru.capacity(), 1);
    }

    #[test]
    fn test_touch_new_keys() {
        let lru = lru_with(5, &["key1", "key2", "key3"]);

        assert_eq!(lru.len(), 3);
        assert_eq!(lru.peek_oldest(), Some("key1"));
    }

    #[test]
    fn test_touch_existing_key() {
        let lru = lru_with(5, &["key1", "key2", "key3"]);

        assert!(lru.touch(&"key1").is_empty());

        assert_eq!(lru.len(), 3);
        assert_eq!(lru.peek_oldest(), Some("key2"));
    }

    #[test]
    fn test_touch_evicts_over_capacity() {
        let lru = lru_with(3, &["a", "b", "c"]);

        lru.touch(&"a");
        let evicted = lru.touch(&"d");

        assert_eq!(evicted, vec!["b"]);
        assert_eq!(lru.len(), 3);
        assert!(!lru.contains(&"b"));
        assert!(lru.contains(&"a"));
    }

    #[test]
    fn test_touch_same_key_multiple_times() {
        let lru = lru_with(2, &["key1", "key1", "key1"]);

        assert_eq!(lru.len(), 1);
        assert_eq!(lru.peek_oldest(), Some("key1"));
    }

    #[test]
    fn test_remove() {
        let lru = lru_with(5, &["key1", "key2", "key3"]);

        lru.remove(&"key2");
        lru.remove(&"nonexistent");

        assert_eq!(lru.len(), 2);
        assert!(!lru.contains(&"key2"));
        assert!(lru.contains(&"key1"));
        assert!(lru.contains(&"key3"));
    }

    #[test]
    fn test_remove_many() {
        let lru = lru_with(5, &["a", "b", "c", "d"]);

        lru.remove_many(&["a", "c", "zzz"]);

        assert_eq!(lru.len(), 2);
        assert_eq!(lru.peek_oldest(), Some("b"));
    }

    #[test]
    fn test_order_after_multiple_touches() {
        let lru = lru_with(3, &["a", "b", "c"]);

        // MRU order is now b, c, a from hot to cold
        lru.touch(&"a");
        lru.touch(&"c");
        lru.touch(&"b");

        assert_eq!(lru.touch(&"x"), vec!["a"]);
        assert_eq!(lru.touch(&"y"), vec!["c"]);
        assert_eq!(lru.touch(&"z"), vec!["b"]);
    }

    #[test]
    fn test_clear() {
        let lru = lru_with(3, &["a", "b"]);
        lru.clear();

        assert!(lru.is_empty());
        assert_eq!(lru.peek_oldest(), None);
    }
}
