//! lazycache - an in-process cache engine
//!
//! Generic key-value cache with per-entry expiry collected lazily by a
//! background janitor, optional LRU capacity and single-flight producers.
//! A small HTTP front serves a JSON-valued instance.

pub mod api;
pub mod cache;
pub mod clock;
pub mod config;
pub mod ds;
pub mod error;
pub mod models;
pub mod tasks;

pub use api::AppState;
pub use cache::{Adapter, Cache, MemoryAdapter};
pub use config::Config;
pub use error::{CacheError, Result};
