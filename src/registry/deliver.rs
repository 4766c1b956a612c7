//! # Snapshot delivery with fault isolation.
//!
//! ```text
//! deliver(snapshot, payload)
//!     │
//!     ├──► entry 1 removed? ── yes ──► skip
//!     │         └── no ──► catch_unwind(call) ──► Err / panic ──► warn!, continue
//!     ├──► entry 2 ...
//!     └──► entry N ...
//! ```
//!
//! The tombstone is re-checked right before each call, so a listener that
//! unregisters itself or a later listener takes effect within the same pass.
//!
//! **Warning**: `AssertUnwindSafe` is used, which can leave shared state inconsistent
//! if a listener panics while holding a lock on it.

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use tracing::warn;

use super::entry::{Entry, ErasedFn};
use crate::error::{ListenerFault, panic_message};
use crate::signals::SignalId;

/// Calls every live entry of `snapshot` in order. Returns the number of calls made.
pub(crate) fn deliver(
    bus: &str,
    signal: SignalId,
    snapshot: &[Arc<Entry<ErasedFn>>],
    payload: &dyn Any,
) -> usize {
    let mut called = 0;
    for entry in snapshot {
        if entry.is_removed() {
            continue;
        }
        called += 1;

        let fault = match catch_unwind(AssertUnwindSafe(|| (entry.callable)(payload))) {
            Ok(Ok(())) => continue,
            Ok(Err(error)) => ListenerFault::Failed {
                listener: entry.label(),
                error,
            },
            Err(panic) => ListenerFault::Panicked {
                listener: entry.label(),
                info: panic_message(panic.as_ref()),
            },
        };
        report_fault(bus, signal, &fault);
    }
    called
}

/// Logs a listener fault. Faults never propagate past this point.
pub(crate) fn report_fault(bus: &str, signal: SignalId, fault: &ListenerFault) {
    warn!(
        bus,
        signal = signal.name(),
        listener = fault.listener(),
        label = fault.as_label(),
        error = %fault.as_message(),
        "listener fault"
    );
}
