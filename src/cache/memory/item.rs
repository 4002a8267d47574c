//! Cache Item Module
//!
//! Defines the unit stored in the memory adapter: a value plus its absolute expiry.

use crate::clock::{now_millis, NEVER_EXPIRE};

// == Item ==
/// A stored value with its expiry timestamp (Unix milliseconds).
#[derive(Debug, Clone)]
pub struct Item<V> {
    /// The stored value
    pub value: V,
    /// Absolute expiry; [`NEVER_EXPIRE`] for items without a TTL
    pub expire_at: i64,
}

impl<V> Item<V> {
    // == Constructor ==
    pub fn new(value: V, expire_at: i64) -> Self {
        Self { value, expire_at }
    }

    // == Is Expired ==
    /// Checks whether the item has expired at `now`.
    ///
    /// Boundary condition: an item is readable only while `now < expire_at`,
    /// so it is expired from the exact millisecond of its expiry on.
    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.expire_at
    }

    /// Checks whether the item has expired against the current clock.
    #[allow(dead_code)]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(now_millis())
    }

    // == Remaining ==
    /// Returns the remaining lifetime in milliseconds at `now`.
    ///
    /// # Returns
    /// - `0` if the item never expires
    /// - `expire_at - now` otherwise (negative once expired)
    pub fn remaining_at(&self, now: i64) -> i64 {
        if self.expire_at == NEVER_EXPIRE {
            0
        } else {
            self.expire_at - now
        }
    }
}
