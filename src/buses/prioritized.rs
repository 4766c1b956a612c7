//! # Prioritized bus: ranked delivery.
//!
//! [`PrioritizedBus`] buckets listeners by `(signal type, priority)`. Invocation
//! walks ranks from the highest value to the lowest; within a rank, delivery is
//! registration order. Ties are never broken by identity or hashing.
//!
//! ```text
//! invoke(Explosion)
//!   rank  10 ──► [A, D]     (registration order)
//!   rank   0 ──► [B]        (default rank)
//!   rank  -3 ──► [C]
//! call order: A, D, B, C
//! ```
//!
//! Ranks left empty after a removal are pruned from the rank index at the next
//! compaction (the start of the next invocation), never mid-pass.

use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::config::BusConfig;
use crate::error::BusError;
use crate::registry::{ErasedFn, Registry, deliver, erase};
use crate::signals::{Listener, ListenerId, Signal, SignalId};

/// Delivery rank; higher values deliver earlier. Default is `0`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Priority(pub i32);

impl Priority {
    /// The default rank (`0`).
    pub const DEFAULT: Priority = Priority(0);

    /// Raw rank value.
    #[inline]
    pub fn get(self) -> i32 {
        self.0
    }
}

impl From<i32> for Priority {
    fn from(rank: i32) -> Self {
        Priority(rank)
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

struct Inner {
    config: BusConfig,
    registry: Mutex<Registry<SignalId, Priority, ErasedFn>>,
}

/// Listener bus with integer delivery ranks.
///
/// Cheap to clone; clones share the same registry.
#[derive(Clone)]
pub struct PrioritizedBus {
    inner: Arc<Inner>,
}

impl PrioritizedBus {
    /// Creates a bus with the default config.
    pub fn new() -> Self {
        Self::with_config(BusConfig::default())
    }

    /// Creates a bus with the given config.
    pub fn with_config(config: BusConfig) -> Self {
        let registry = Registry::new(&config);
        Self {
            inner: Arc::new(Inner {
                config,
                registry: Mutex::new(registry),
            }),
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &BusConfig {
        &self.inner.config
    }

    /// Instance id stamped into every [`ListenerId`] this bus issues.
    pub fn id(&self) -> u64 {
        self.inner.registry.lock().bus_id()
    }

    /// Registers `listener` for `S` at [`Priority::DEFAULT`].
    pub fn register<S: Signal>(&self, listener: &Listener<S>) -> ListenerId {
        self.register_with_priority(listener, Priority::DEFAULT)
    }

    /// Registers `listener` for `S` at `priority`.
    ///
    /// The same handle may be registered at several ranks; within one rank it is
    /// stored once.
    pub fn register_with_priority<S: Signal>(
        &self,
        listener: &Listener<S>,
        priority: impl Into<Priority>,
    ) -> ListenerId {
        let signal = SignalId::of::<S>();
        let priority = priority.into();
        let reg = self.inner.registry.lock().register(
            signal,
            priority,
            listener.key(),
            None,
            || erase(listener),
        );
        debug!(
            bus = %self.inner.config.name,
            signal = signal.name(),
            listener = %reg.id,
            %priority,
            fresh = reg.fresh,
            "listener registered"
        );
        reg.id
    }

    /// Unregisters `listener` for `S` at every rank. Idempotent.
    pub fn unregister<S: Signal>(&self, listener: &Listener<S>) -> bool {
        let signal = SignalId::of::<S>();
        let hit = self
            .inner
            .registry
            .lock()
            .unregister(&signal, listener.key());
        debug!(
            bus = %self.inner.config.name,
            signal = signal.name(),
            removed = hit,
            "listener unregistered"
        );
        hit > 0
    }

    /// Unregisters the registration identified by `id`.
    ///
    /// Fails with [`BusError::InvalidArgument`] if `id` was issued by another bus.
    pub fn remove(&self, id: ListenerId) -> Result<bool, BusError> {
        let removed = self.inner.registry.lock().remove(id)?;
        debug!(bus = %self.inner.config.name, listener = %id, removed, "listener removed");
        Ok(removed)
    }

    /// Delivers `signal` rank by rank, highest first.
    ///
    /// Returns the number of listeners called (faulting ones included).
    pub fn invoke<S: Signal>(&self, signal: &S) -> usize {
        let id = SignalId::of::<S>();
        let snapshot = self.inner.registry.lock().snapshot(&id);
        if snapshot.is_empty() {
            debug!(bus = %self.inner.config.name, signal = id.name(), "no listeners");
            return 0;
        }
        deliver(&self.inner.config.name, id, &snapshot, signal)
    }

    /// Live listeners for `S` across all ranks.
    pub fn count<S: Signal>(&self) -> usize {
        self.inner.registry.lock().count(&SignalId::of::<S>())
    }

    /// Live listeners for `S` at `priority`.
    pub fn count_at<S: Signal>(&self, priority: impl Into<Priority>) -> usize {
        self.inner
            .registry
            .lock()
            .count_at(&SignalId::of::<S>(), priority.into())
    }

    /// True if at least one live listener exists for `S`.
    pub fn has_listeners<S: Signal>(&self) -> bool {
        self.count::<S>() > 0
    }

    /// Ranks holding live listeners for `S`, highest first.
    pub fn ranks<S: Signal>(&self) -> Vec<Priority> {
        self.inner.registry.lock().ranks(&SignalId::of::<S>())
    }

    /// Drops every listener for `S` immediately.
    pub fn clear<S: Signal>(&self) {
        let signal = SignalId::of::<S>();
        let removed = self.inner.registry.lock().clear(&signal);
        debug!(bus = %self.inner.config.name, signal = signal.name(), removed, "signal cleared");
    }

    /// Drops every listener on this bus immediately.
    pub fn clear_all(&self) {
        let removed = self.inner.registry.lock().clear_all();
        debug!(bus = %self.inner.config.name, removed, "bus cleared");
    }
}

impl Default for PrioritizedBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PrioritizedBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrioritizedBus")
            .field("name", &self.inner.config.name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Explosion {
        count: u32,
    }

    type Log = Arc<Mutex<Vec<String>>>;

    fn recorder(log: &Log, tag: &'static str) -> Listener<Explosion> {
        let log = Arc::clone(log);
        Listener::new(move |e: &Explosion| log.lock().push(format!("{tag}({})", e.count)))
    }

    #[test]
    fn test_higher_priority_first_regardless_of_registration_order() {
        for flip in [false, true] {
            let bus = PrioritizedBus::new();
            let log: Log = Arc::default();
            let a = recorder(&log, "A");
            let b = recorder(&log, "B");

            if flip {
                bus.register_with_priority(&b, 1);
                bus.register_with_priority(&a, 5);
            } else {
                bus.register_with_priority(&a, 5);
                bus.register_with_priority(&b, 1);
            }

            bus.invoke(&Explosion { count: 3 });
            assert_eq!(*log.lock(), vec!["A(3)", "B(3)"], "flip={flip}");
        }
    }

    #[test]
    fn test_ties_follow_registration_order() {
        let bus = PrioritizedBus::new();
        let log: Log = Arc::default();
        for tag in ["first", "second", "third"] {
            bus.register(&recorder(&log, tag));
        }

        bus.invoke(&Explosion { count: 0 });
        assert_eq!(*log.lock(), vec!["first(0)", "second(0)", "third(0)"]);
    }

    #[test]
    fn test_negative_ranks_run_last() {
        let bus = PrioritizedBus::new();
        let log: Log = Arc::default();
        bus.register_with_priority(&recorder(&log, "low"), -10);
        bus.register(&recorder(&log, "mid"));
        bus.register_with_priority(&recorder(&log, "high"), i32::MAX);

        bus.invoke(&Explosion { count: 1 });
        assert_eq!(*log.lock(), vec!["high(1)", "mid(1)", "low(1)"]);
        assert_eq!(
            bus.ranks::<Explosion>(),
            vec![Priority(i32::MAX), Priority(0), Priority(-10)]
        );
    }

    #[test]
    fn test_empty_rank_pruned_on_next_invoke() {
        let bus = PrioritizedBus::new();
        let log: Log = Arc::default();
        let top = recorder(&log, "top");
        bus.register_with_priority(&top, 9);
        bus.register(&recorder(&log, "base"));

        assert!(bus.unregister(&top));
        assert_eq!(bus.count_at::<Explosion>(9), 0);
        assert_eq!(bus.ranks::<Explosion>(), vec![Priority(0)]);

        bus.invoke(&Explosion { count: 2 });
        assert_eq!(*log.lock(), vec!["base(2)"]);
        assert_eq!(bus.count::<Explosion>(), 1);
    }

    #[test]
    fn test_unregister_removes_every_rank() {
        let bus = PrioritizedBus::new();
        let log: Log = Arc::default();
        let l = recorder(&log, "x");
        bus.register_with_priority(&l, 1);
        bus.register_with_priority(&l, 2);
        assert_eq!(bus.count::<Explosion>(), 2);

        bus.invoke(&Explosion { count: 0 });
        assert_eq!(log.lock().len(), 2);

        bus.unregister(&l);
        assert!(!bus.has_listeners::<Explosion>());
    }

    #[test]
    fn test_high_rank_self_unsubscribe_keeps_lower_ranks() {
        let bus = PrioritizedBus::new();
        let log: Log = Arc::default();
        let slot: Arc<Mutex<Option<Listener<Explosion>>>> = Arc::default();
        let once = {
            let bus = bus.clone();
            let log = Arc::clone(&log);
            let slot = Arc::clone(&slot);
            Listener::new(move |_: &Explosion| {
                log.lock().push("once".to_string());
                if let Some(me) = slot.lock().take() {
                    bus.unregister(&me);
                }
            })
        };
        *slot.lock() = Some(once.clone());

        bus.register_with_priority(&once, 100);
        bus.register(&recorder(&log, "rest"));

        bus.invoke(&Explosion { count: 1 });
        bus.invoke(&Explosion { count: 2 });
        assert_eq!(*log.lock(), vec!["once", "rest(1)", "rest(2)"]);
        assert_eq!(bus.ranks::<Explosion>(), vec![Priority(0)]);
    }
}
