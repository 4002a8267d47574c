//! Clock Module
//!
//! Millisecond timestamp source shared by every expiry comparison in the cache.

use std::sync::atomic::{AtomicI64, Ordering};

// == Public Constants ==
/// Expiry timestamp meaning "never expires".
///
/// Equal to `i64::MAX / 1_000_000`, i.e. the year 2262 in Unix milliseconds.
pub const NEVER_EXPIRE: i64 = 9_223_372_036_854;

/// Highest timestamp handed out so far; keeps `now_millis` non-decreasing
/// when the wall clock is stepped backwards.
static LAST_SEEN: AtomicI64 = AtomicI64::new(0);

// == Now ==
/// Returns the current Unix timestamp in milliseconds.
///
/// Never returns a value smaller than one it returned before.
pub fn now_millis() -> i64 {
    let wall = chrono::Utc::now().timestamp_millis();
    let previous = LAST_SEEN.fetch_max(wall, Ordering::AcqRel);
    wall.max(previous)
}

/// Converts a relative duration into an absolute expiry timestamp.
///
/// A zero duration maps to [`NEVER_EXPIRE`], and so does any duration
/// reaching past it.
pub fn expiry_from(duration: chrono::Duration) -> i64 {
    if duration.is_zero() {
        NEVER_EXPIRE
    } else {
        now_millis()
            .saturating_add(duration.num_milliseconds())
            .min(NEVER_EXPIRE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_now_is_non_decreasing() {
        let mut last = now_millis();
        for _ in 0..1000 {
            let now = now_millis();
            assert!(now >= last);
            last = now;
        }
    }

    #[test]
    fn test_never_expire_is_far_away() {
        assert!(now_millis() < NEVER_EXPIRE);
    }

    #[test]
    fn test_expiry_from_zero_is_sentinel() {
        assert_eq!(expiry_from(Duration::zero()), NEVER_EXPIRE);
    }

    #[test]
    fn test_expiry_from_positive() {
        let before = now_millis();
        let expiry = expiry_from(Duration::milliseconds(500));
        assert!(expiry >= before + 500);
        assert!(expiry <= now_millis() + 500);
    }

    #[test]
    fn test_expiry_from_is_capped_at_sentinel() {
        assert_eq!(expiry_from(Duration::milliseconds(i64::MAX)), NEVER_EXPIRE);
        assert_eq!(expiry_from(Duration::milliseconds(NEVER_EXPIRE)), NEVER_EXPIRE);
    }

    #[test]
    fn test_expiry_from_negative_is_in_the_past() {
        assert!(expiry_from(Duration::milliseconds(-1)) < now_millis() + 1);
    }
}
