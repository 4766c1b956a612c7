//! # ListenerHost: uniform attach/detach over every bus variant.
//!
//! Components that only need to hook a synchronous [`Listener`] onto "some bus"
//! (the [`WaitForSignal`](crate::WaitForSignal) adapter, for one) are written
//! against this trait instead of a concrete bus type.
//!
//! | Bus                | `Key`       | attach                          |
//! |--------------------|-------------|---------------------------------|
//! | [`Bus`]            | `()`        | `register`                      |
//! | [`KeyedBus<K>`]    | `K`         | `register(key, ..)`             |
//! | [`PrioritizedBus`] | [`Priority`]| `register_with_priority`        |
//! | [`AsyncBus`]       | `()`        | `register` (sync listener)      |
//!
//! `detach` on the prioritized bus removes the listener at every rank.

use crate::buses::{AsyncBus, Bus, KeyedBus, PrioritizedBus, Priority};
use crate::signals::{Listener, ListenerId, ScopeKey, Signal};

/// A bus that can host synchronous listeners.
pub trait ListenerHost: Clone + Send + Sync + 'static {
    /// Address inside the bus a listener is attached under.
    type Key: Clone + Send + Sync + 'static;

    /// Registers `listener` for `S` under `key`.
    fn attach<S: Signal>(&self, key: &Self::Key, listener: &Listener<S>) -> ListenerId;

    /// Unregisters `listener` for `S` under `key`. Returns `true` if it was live.
    fn detach<S: Signal>(&self, key: &Self::Key, listener: &Listener<S>) -> bool;
}

impl ListenerHost for Bus {
    type Key = ();

    fn attach<S: Signal>(&self, _: &(), listener: &Listener<S>) -> ListenerId {
        self.register(listener)
    }

    fn detach<S: Signal>(&self, _: &(), listener: &Listener<S>) -> bool {
        self.unregister(listener)
    }
}

impl<K: ScopeKey> ListenerHost for KeyedBus<K> {
    type Key = K;

    fn attach<S: Signal>(&self, key: &K, listener: &Listener<S>) -> ListenerId {
        self.register(key, listener)
    }

    fn detach<S: Signal>(&self, key: &K, listener: &Listener<S>) -> bool {
        self.unregister(key, listener)
    }
}

impl ListenerHost for PrioritizedBus {
    type Key = Priority;

    fn attach<S: Signal>(&self, key: &Priority, listener: &Listener<S>) -> ListenerId {
        self.register_with_priority(listener, *key)
    }

    fn detach<S: Signal>(&self, _: &Priority, listener: &Listener<S>) -> bool {
        self.unregister(listener)
    }
}

impl ListenerHost for AsyncBus {
    type Key = ();

    fn attach<S: Signal>(&self, _: &(), listener: &Listener<S>) -> ListenerId {
        self.register(listener)
    }

    fn detach<S: Signal>(&self, _: &(), listener: &Listener<S>) -> bool {
        self.unregister(listener)
    }
}
