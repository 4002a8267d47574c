//! Background Tasks Module
//!
//! Periodic scheduling shared by the background work of the crate.
//!
//! # Tasks
//! - Cache janitor: registered by every memory adapter, see
//!   [`MemoryAdapter`](crate::cache::MemoryAdapter)

mod timer;

pub use timer::{JobHandle, Timer, TimerControl};
