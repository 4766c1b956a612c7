//! # Keyed bus: isolated messaging domains.
//!
//! [`KeyedBus`] addresses listeners by `(scope key, signal type)`. Delivering under
//! key `K` reaches only listeners registered under exactly `K`; there is no global
//! tier. Using a sentinel key (for example `""`) as a "global" channel is a caller
//! convention, not something the bus does for you.
//!
//! ## Rules
//! - **Insertion order** within one `(key, signal)` bucket
//! - **Deferred removal**: `unregister` tombstones; the next invocation compacts
//! - **Re-entrancy**: listeners may register, unregister, clear or invoke on the
//!   same bus from inside their body
//! - **Isolation**: a faulting listener is logged and the pass continues
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicU32, Ordering};
//! use signalbus::{KeyedBus, Listener};
//!
//! struct Damage(u32);
//!
//! let bus: KeyedBus<&'static str> = KeyedBus::new();
//! let taken = Arc::new(AtomicU32::new(0));
//! let t = Arc::clone(&taken);
//! bus.register(&"player", &Listener::new(move |d: &Damage| {
//!     t.fetch_add(d.0, Ordering::SeqCst);
//! }));
//!
//! bus.invoke(&"enemy", &Damage(10));
//! bus.invoke(&"player", &Damage(3));
//! assert_eq!(taken.load(Ordering::SeqCst), 3);
//! ```

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::config::BusConfig;
use crate::error::BusError;
use crate::registry::{ErasedFn, Registry, deliver, erase};
use crate::signals::{Listener, ListenerId, ScopeKey, Signal, SignalId};

type KeyedRegistry<K> = Registry<(K, SignalId), (), ErasedFn>;

struct Inner<K> {
    config: BusConfig,
    registry: Mutex<KeyedRegistry<K>>,
}

/// Two-level `(key, signal)` listener bus.
///
/// Cheap to clone; clones share the same registry.
pub struct KeyedBus<K> {
    inner: Arc<Inner<K>>,
}

impl<K: ScopeKey> KeyedBus<K> {
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

    /// Registers `listener` for signal `S` under `key`.
    ///
    /// Registering a handle that is already live under the same key and signal is a
    /// no-op and returns the existing id. Invocations already in progress are not
    /// affected.
    pub fn register<S: Signal>(&self, key: &K, listener: &Listener<S>) -> ListenerId {
        let signal = SignalId::of::<S>();
        let reg = self.inner.registry.lock().register(
            (key.clone(), signal),
            (),
            listener.key(),
            None,
            || erase(listener),
        );
        debug!(
            bus = %self.inner.config.name,
            signal = signal.name(),
            listener = %reg.id,
            fresh = reg.fresh,
            "listener registered"
        );
        reg.id
    }

    /// Unregisters `listener` for signal `S` under `key`.
    ///
    /// Takes effect immediately for delivery; the entry is physically dropped at the
    /// start of the next invocation. Returns `true` if a live registration was found.
    /// Idempotent.
    pub fn unregister<S: Signal>(&self, key: &K, listener: &Listener<S>) -> bool {
        let signal = SignalId::of::<S>();
        let hit = self
            .inner
            .registry
            .lock()
            .unregister(&(key.clone(), signal), listener.key());
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
    /// Removing an id that is already gone is harmless.
    pub fn remove(&self, id: ListenerId) -> Result<bool, BusError> {
        let removed = self.inner.registry.lock().remove(id)?;
        debug!(bus = %self.inner.config.name, listener = %id, removed, "listener removed");
        Ok(removed)
    }

    /// Delivers `signal` to every listener registered for `S` under `key`.
    ///
    /// Returns the number of listeners called (faulting ones included).
    pub fn invoke<S: Signal>(&self, key: &K, signal: &S) -> usize {
        let id = SignalId::of::<S>();
        let snapshot = self.inner.registry.lock().snapshot(&(key.clone(), id));
        if snapshot.is_empty() {
            debug!(bus = %self.inner.config.name, signal = id.name(), "no listeners");
            return 0;
        }
        deliver(&self.inner.config.name, id, &snapshot, signal)
    }

    /// Live listeners for `S` under `key`.
    pub fn count<S: Signal>(&self, key: &K) -> usize {
        self.inner
            .registry
            .lock()
            .count(&(key.clone(), SignalId::of::<S>()))
    }

    /// True if at least one live listener exists for `S` under `key`.
    pub fn has_listeners<S: Signal>(&self, key: &K) -> bool {
        self.count::<S>(key) > 0
    }

    /// Keys with at least one live listener (any signal). Order is unspecified.
    pub fn keys(&self) -> Vec<K> {
        let registry = self.inner.registry.lock();
        let keys: HashSet<&K> = registry.live_groups().map(|(key, _)| key).collect();
        keys.into_iter().cloned().collect()
    }

    /// Drops every listener for `S` under `key` immediately.
    pub fn clear<S: Signal>(&self, key: &K) {
        let signal = SignalId::of::<S>();
        let removed = self.inner.registry.lock().clear(&(key.clone(), signal));
        debug!(bus = %self.inner.config.name, signal = signal.name(), removed, "signal cleared");
    }

    /// Drops every listener for `S` under every key immediately.
    pub fn clear_signal<S: Signal>(&self) {
        let signal = SignalId::of::<S>();
        let removed = self
            .inner
            .registry
            .lock()
            .clear_where(|(_, s)| *s == signal);
        debug!(bus = %self.inner.config.name, signal = signal.name(), removed, "signal cleared");
    }

    /// Drops every listener under `key` immediately.
    pub fn clear_key(&self, key: &K) {
        let removed = self.inner.registry.lock().clear_where(|(k, _)| k == key);
        debug!(bus = %self.inner.config.name, removed, "key cleared");
    }

    /// Drops every listener on this bus immediately.
    pub fn clear_all(&self) {
        let removed = self.inner.registry.lock().clear_all();
        debug!(bus = %self.inner.config.name, removed, "bus cleared");
    }
}

impl<K: ScopeKey> Default for KeyedBus<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K> Clone for KeyedBus<K> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K> fmt::Debug for KeyedBus<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyedBus")
            .field("name", &self.inner.config.name)
            .finish_non_exhaustive()
    }
}
