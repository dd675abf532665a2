//! Shared building blocks: the write serializer, the recent-access cache,
//! the event bus and small utilities used across the crate.

mod cache;
mod constants;
mod event_bus;
mod lock;
mod sort_order;
mod util;

pub use cache::*;
pub use constants::*;
pub use event_bus::*;
pub use lock::*;
pub use sort_order::*;
pub use util::*;
