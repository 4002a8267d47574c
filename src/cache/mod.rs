//! Cache Module
//!
//! Generic in-process cache with lazy expiration, optional LRU eviction and
//! single-flight producers, behind a storage-agnostic adapter contract.

mod adapter;
mod facade;
mod memory;
mod stats;


// Re-export public types
pub use adapter::{Adapter, Payload, Producer};
pub use facade::{default_cache, Cache};
pub use memory::{
    bucket_of, MemoryAdapter, SweepReport, BUCKET_WIDTH_MS, DEFAULT_JANITOR_INTERVAL,
    EXPIRY_SCAN_WINDOW,
};
pub use stats::CacheStats;

// == Public Constants ==
/// Maximum allowed key length in bytes for the HTTP front
pub const MAX_KEY_LENGTH: usize = 256;
