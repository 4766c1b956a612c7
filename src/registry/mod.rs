//! Listener registry: storage, deferred removal and delivery shared by every bus.
//!
//! Internal modules:
//! - [`store`]: bucketed storage, tombstones, compaction, snapshots;
//! - [`entry`]: listener entries and the erased callables they own;
//! - [`deliver`]: synchronous snapshot iteration with per-listener fault isolation.

mod deliver;
mod entry;
mod store;

pub(crate) use deliver::{deliver, report_fault};
pub(crate) use entry::{AsyncCallable, Entry, ErasedFn, erase, erase_async};
pub(crate) use store::Registry;
