//! # Synchronous listener handle (`Listener`)
//!
//! [`Listener`] wraps a closure `F: Fn(&S) -> R` behind an `Arc`. The handle is
//! cheap to clone, and every clone shares the same **identity**: registering or
//! unregistering any clone addresses the same listener. Two handles built from
//! separate `Listener::new` calls are distinct listeners even if the closures are
//! equivalent.
//!
//! Listener bodies may return `()` or `Result<(), E>` for any `E: Into<BoxError>`;
//! an `Err` is reported as a [`ListenerFault`](crate::ListenerFault) by the bus.
//!
//! ## Example
//! ```rust
//! use signalbus::{Bus, Listener};
//!
//! struct Jumped { height: u32 }
//!
//! let bus = Bus::new();
//! let on_jump = Listener::new(|j: &Jumped| println!("jumped {}", j.height));
//! let on_any_jump = Listener::<Jumped>::ignoring(|| println!("someone jumped"));
//!
//! bus.register(&on_jump);
//! bus.register(&on_any_jump);
//! bus.invoke(&Jumped { height: 3 });
//! ```

use std::fmt;
use std::sync::{Arc, Weak};

use crate::error::{BoxError, ListenerResult};
use crate::signals::Signal;

/// Conversion of listener return values into a [`ListenerResult`].
pub trait IntoListenerResult {
    /// Converts the value.
    fn into_listener_result(self) -> ListenerResult;
}

impl IntoListenerResult for () {
    #[inline]
    fn into_listener_result(self) -> ListenerResult {
        Ok(())
    }
}

impl<E: Into<BoxError>> IntoListenerResult for Result<(), E> {
    #[inline]
    fn into_listener_result(self) -> ListenerResult {
        self.map_err(Into::into)
    }
}

type SyncFn<S> = dyn Fn(&S) -> ListenerResult + Send + Sync;

/// Identity of a listener callable inside a registry bucket.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub(crate) struct ListenerKey(usize);

impl ListenerKey {
    pub(crate) fn of<T: ?Sized>(ptr: &Arc<T>) -> Self {
        Self(Arc::as_ptr(ptr).cast::<()>() as usize)
    }

    #[cfg(test)]
    pub(crate) fn from_raw(raw: usize) -> Self {
        Self(raw)
    }
}

/// Shared handle to a synchronous listener callable.
pub struct Listener<S> {
    f: Arc<SyncFn<S>>,
}

impl<S: Signal> Listener<S> {
    /// Creates a payload-accepting listener.
    pub fn new<F, R>(f: F) -> Self
    where
        F: Fn(&S) -> R + Send + Sync + 'static,
        R: IntoListenerResult,
    {
        Self {
            f: Arc::new(move |signal: &S| f(signal).into_listener_result()),
        }
    }

    /// Creates a listener that ignores the payload.
    pub fn ignoring<F, R>(f: F) -> Self
    where
        F: Fn() -> R + Send + Sync + 'static,
        R: IntoListenerResult,
    {
        Self {
            f: Arc::new(move |_: &S| f().into_listener_result()),
        }
    }

    /// Calls the listener directly, outside any bus.
    #[inline]
    pub fn call(&self, signal: &S) -> ListenerResult {
        (self.f)(signal)
    }

    /// Returns a weak handle that does not keep the callable alive.
    pub fn downgrade(&self) -> WeakListener<S> {
        WeakListener {
            f: Arc::downgrade(&self.f),
        }
    }

    /// True if both handles refer to the same listener.
    #[inline]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.f, &other.f)
    }

    pub(crate) fn key(&self) -> ListenerKey {
        ListenerKey::of(&self.f)
    }
}

impl<S> Clone for Listener<S> {
    fn clone(&self) -> Self {
        Self {
            f: Arc::clone(&self.f),
        }
    }
}

impl<S> fmt::Debug for Listener<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("signal", &std::any::type_name::<S>())
            .field("at", &Arc::as_ptr(&self.f).cast::<()>())
            .finish()
    }
}

/// Weak counterpart of [`Listener`].
pub struct WeakListener<S> {
    f: Weak<SyncFn<S>>,
}

impl<S> WeakListener<S> {
    /// Upgrades to a strong handle if the callable is still alive.
    pub fn upgrade(&self) -> Option<Listener<S>> {
        self.f.upgrade().map(|f| Listener { f })
    }
}

impl<S> Clone for WeakListener<S> {
    fn clone(&self) -> Self {
        Self { f: Weak::clone(&self.f) }
    }
}

/// Handle of one registration, returned by every `register*` call.
///
/// Carries the id of the bus instance that issued it, so passing it to another
/// bus's `remove` is rejected with [`BusError::InvalidArgument`](crate::BusError::InvalidArgument).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId {
    pub(crate) bus: u64,
    pub(crate) entry: u64,
}

impl ListenerId {
    /// Id of the issuing bus instance.
    pub fn bus(&self) -> u64 {
        self.bus
    }

    /// Per-bus sequence number of the registration.
    pub fn entry(&self) -> u64 {
        self.entry
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.bus, self.entry)
    }
}
