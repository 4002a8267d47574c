//! Single-Flight Module
//!
//! Pending-compute registry: the first caller for a key runs the computation,
//! concurrent callers for the same key block until it finishes and share its
//! result instead of running their own.

use std::collections::HashMap;
use std::hash::Hash;
use std::mem;
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use crate::error::Result;

enum CallState<V> {
    Running,
    Done(Option<V>),
    Failed,
}

struct Call<V> {
    state: Mutex<CallState<V>>,
    done: Condvar,
}

impl<V> Call<V> {
    fn new() -> Self {
        Self {
            state: Mutex::new(CallState::Running),
            done: Condvar::new(),
        }
    }
}

// == Single Flight ==
/// Per-key barrier map.
///
/// An entry lives from the moment the leading caller registers it until its
/// computation returns, successfully or not.
pub struct SingleFlight<K, V> {
    calls: Mutex<HashMap<K, Arc<Call<V>>>>,
}

impl<K, V> Default for SingleFlight<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> SingleFlight<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(HashMap::new()),
        }
    }

    /// Number of computations currently running.
    #[allow(dead_code)]
    pub fn in_flight(&self) -> usize {
        self.calls.lock().len()
    }

    // == Work ==
    /// Runs `f` for `key` unless another caller is already running it.
    ///
    /// Waiters receive a clone of the leader's successful result. When the
    /// leader fails, its error goes to the leader only and the waiters line
    /// up again: the next one becomes leader and runs its own `f`.
    pub fn work<F>(&self, key: &K, f: F) -> Result<Option<V>>
    where
        F: FnOnce() -> Result<Option<V>>,
    {
        let call = loop {
            let waiting = {
                let mut calls = self.calls.lock();
                match calls.get(key) {
                    Some(call) => Arc::clone(call),
                    None => {
                        let call = Arc::new(Call::new());
                        calls.insert(key.clone(), Arc::clone(&call));
                        break call;
                    }
                }
            };

            let mut state = waiting.state.lock();
            while matches!(*state, CallState::Running) {
                waiting.done.wait(&mut state);
            }
            if let CallState::Done(value) = &*state {
                return Ok(value.clone());
            }
        };

        let mut publish = Publish {
            calls: &self.calls,
            key,
            call,
            outcome: CallState::Failed,
        };
        let result = f();
        if let Ok(value) = &result {
            publish.outcome = CallState::Done(value.clone());
        }
        result
    }
}

/// Publishes the leader's outcome on drop, so waiters are released even if
/// the computation panics.
struct Publish<'a, K: Eq + Hash, V> {
    calls: &'a Mutex<HashMap<K, Arc<Call<V>>>>,
    key: &'a K,
    call: Arc<Call<V>>,
    outcome: CallState<V>,
}

impl<K: Eq + Hash, V> Drop for Publish<'_, K, V> {
    fn drop(&mut self) {
        // Deregister first so a released waiter never finds the finished call.
        self.calls.lock().remove(self.key);
        {
            let mut state = self.call.state.lock();
            *state = mem::replace(&mut self.outcome, CallState::Failed);
        }
        self.call.done.notify_all();
    }
}
