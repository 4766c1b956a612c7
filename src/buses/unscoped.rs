//! # Unscoped bus: one global scope.
//!
//! [`Bus`] is the keyed bus applied with the constant key `()`. Delivery order is
//! registration order. There is no priority and no key concept.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use parking_lot::Mutex;
//! use signalbus::{Bus, Listener};
//!
//! struct Scored(u32);
//!
//! let bus = Bus::new();
//! let log = Arc::new(Mutex::new(Vec::new()));
//!
//! let l1 = { let log = log.clone(); Listener::new(move |s: &Scored| log.lock().push(("hud", s.0))) };
//! let l2 = { let log = log.clone(); Listener::new(move |s: &Scored| log.lock().push(("audio", s.0))) };
//! bus.register(&l1);
//! bus.register(&l2);
//!
//! bus.invoke(&Scored(10));
//! assert_eq!(*log.lock(), vec![("hud", 10), ("audio", 10)]);
//! ```

use std::fmt;

use crate::buses::KeyedBus;
use crate::config::BusConfig;
use crate::error::BusError;
use crate::signals::{Listener, ListenerId, Signal};

/// Global-scope listener bus.
///
/// Cheap to clone; clones share the same registry.
#[derive(Clone, Default)]
pub struct Bus {
    scoped: KeyedBus<()>,
}

impl Bus {
    /// Creates a bus with the default config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a bus with the given config.
    pub fn with_config(config: BusConfig) -> Self {
        Self {
            scoped: KeyedBus::with_config(config),
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &BusConfig {
        self.scoped.config()
    }

    /// Instance id stamped into every [`ListenerId`] this bus issues.
    pub fn id(&self) -> u64 {
        self.scoped.id()
    }

    /// Registers `listener` for signal `S`.
    pub fn register<S: Signal>(&self, listener: &Listener<S>) -> ListenerId {
        self.scoped.register(&(), listener)
    }

    /// Unregisters `listener` for signal `S`. Idempotent.
    pub fn unregister<S: Signal>(&self, listener: &Listener<S>) -> bool {
        self.scoped.unregister(&(), listener)
    }

    /// Unregisters the registration identified by `id`.
    pub fn remove(&self, id: ListenerId) -> Result<bool, BusError> {
        self.scoped.remove(id)
    }

    /// Delivers `signal` to every listener of `S`, in registration order.
    pub fn invoke<S: Signal>(&self, signal: &S) -> usize {
        self.scoped.invoke(&(), signal)
    }

    /// Live listeners for `S`.
    pub fn count<S: Signal>(&self) -> usize {
        self.scoped.count::<S>(&())
    }

    /// True if at least one live listener exists for `S`.
    pub fn has_listeners<S: Signal>(&self) -> bool {
        self.scoped.has_listeners::<S>(&())
    }

    /// Drops every listener for `S` immediately.
    pub fn clear<S: Signal>(&self) {
        self.scoped.clear::<S>(&());
    }

    /// Drops every listener on this bus immediately.
    pub fn clear_all(&self) {
        self.scoped.clear_all();
    }
}

impl fmt::Debug for Bus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bus")
            .field("name", &self.config().name)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tracing_test::traced_test;

    #[derive(Debug, PartialEq)]
    struct Explosion {
        count: u32,
    }

    struct Other;

    fn counter() -> (Arc<AtomicU32>, Listener<Explosion>) {
        let hits = Arc::new(AtomicU32::new(0));
        let h = Arc::clone(&hits);
        let l = Listener::new(move |_: &Explosion| {
            h.fetch_add(1, Ordering::SeqCst);
        });
        (hits, l)
    }

    #[test]
    fn test_delivers_exact_payload_once() {
        let bus = Bus::new();
        let got = Arc::new(Mutex::new(Vec::new()));
        let g = Arc::clone(&got);
        bus.register(&Listener::new(move |e: &Explosion| g.lock().push(e.count)));

        assert_eq!(bus.invoke(&Explosion { count: 3 }), 1);
        assert_eq!(*got.lock(), vec![3]);
    }

    #[test]
    fn test_unregister_before_invoke_never_calls() {
        let bus = Bus::new();
        let (hits, l) = counter();
        bus.register(&l);
        assert!(bus.unregister(&l));
        assert!(!bus.unregister(&l));

        bus.invoke(&Explosion { count: 1 });
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_duplicate_registration_delivers_once() {
        let bus = Bus::new();
        let (hits, l) = counter();
        let a = bus.register(&l);
        let b = bus.register(&l.clone());

        assert_eq!(a, b);
        assert_eq!(bus.count::<Explosion>(), 1);
        bus.invoke(&Explosion { count: 1 });
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_self_unsubscribe_mid_invoke() {
        let bus = Bus::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let slot: Arc<Mutex<Option<Listener<Explosion>>>> = Arc::new(Mutex::new(None));
        let once = {
            let bus = bus.clone();
            let log = Arc::clone(&log);
            let slot = Arc::clone(&slot);
            Listener::new(move |_: &Explosion| {
                log.lock().push("once");
                if let Some(me) = slot.lock().take() {
                    bus.unregister(&me);
                }
            })
        };
        *slot.lock() = Some(once.clone());
        let after = {
            let log = Arc::clone(&log);
            Listener::new(move |_: &Explosion| log.lock().push("after"))
        };

        bus.register(&once);
        bus.register(&after);
        drop(once);

        bus.invoke(&Explosion { count: 1 });
        bus.invoke(&Explosion { count: 2 });
        assert_eq!(*log.lock(), vec!["once", "after", "after"]);
    }

    #[test]
    fn test_listener_unregistering_a_later_one_skips_it() {
        let bus = Bus::new();
        let (hits, victim) = counter();
        let killer = {
            let bus = bus.clone();
            let victim = victim.clone();
            Listener::new(move |_: &Explosion| {
                bus.unregister(&victim);
            })
        };

        bus.register(&killer);
        bus.register(&victim);
        bus.invoke(&Explosion { count: 1 });
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_registration_during_invoke_waits_for_next() {
        let bus = Bus::new();
        let (hits, late) = counter();
        let adder = {
            let bus = bus.clone();
            Listener::new(move |_: &Explosion| {
                bus.register(&late);
            })
        };

        bus.register(&adder);
        bus.invoke(&Explosion { count: 1 });
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        bus.invoke(&Explosion { count: 1 });
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_clear_leaves_other_signals() {
        let bus = Bus::new();
        let (_, l) = counter();
        bus.register(&l);
        bus.register(&Listener::<Other>::ignoring(|| {}));

        bus.clear::<Explosion>();
        assert_eq!(bus.count::<Explosion>(), 0);
        assert_eq!(bus.count::<Other>(), 1);
    }

    #[test]
    fn test_clear_during_invoke_stops_remaining() {
        let bus = Bus::new();
        let (hits, tail) = counter();
        let clearer = {
            let bus = bus.clone();
            Listener::new(move |_: &Explosion| bus.clear_all())
        };

        bus.register(&clearer);
        bus.register(&tail);
        bus.invoke(&Explosion { count: 1 });
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert!(!bus.has_listeners::<Explosion>());
    }

    #[test]
    #[traced_test]
    fn test_panicking_listener_does_not_stop_others() {
        let bus = Bus::with_config(BusConfig::named("world"));
        let (hits, l) = counter();
        bus.register(&Listener::new::<_, ()>(|_: &Explosion| panic!("listener blew up")));
        bus.register(&l);

        assert_eq!(bus.invoke(&Explosion { count: 1 }), 2);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert!(logs_contain("listener blew up"));
        assert!(logs_contain("world"));
    }
}
