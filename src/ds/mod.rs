//! Data structures shared by the cache internals.

mod list;

pub use list::{Iter, LinkedList, NodeId};
