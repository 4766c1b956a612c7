//! Listener entries and the type-erased callables they own.

use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures::FutureExt;
use futures::future::BoxFuture;

use crate::error::{BoxError, ListenerResult};
use crate::signals::{AsyncListener, Listener, ListenerId, ListenerKey, Signal};

type SyncCall = dyn Fn(&dyn Any) -> ListenerResult + Send + Sync;
type AsyncCall =
    dyn Fn(Arc<dyn Any + Send + Sync>) -> BoxFuture<'static, ListenerResult> + Send + Sync;

/// Synchronous callable with the payload type erased.
pub(crate) type ErasedFn = Box<SyncCall>;

/// Asynchronous callable with the payload type erased.
pub(crate) type ErasedAsyncFn = Box<AsyncCall>;

/// Callable shapes stored by the async bus.
///
/// Shared so a spawned unit can own its callable and make the call itself.
pub(crate) enum AsyncCallable {
    Sync(Arc<SyncCall>),
    Async(Arc<AsyncCall>),
}

/// One registration inside a bucket.
///
/// The `removed` flag is the tombstone: once set, the entry is never called
/// again, even from a snapshot taken before it was set.
pub(crate) struct Entry<F> {
    pub(crate) id: ListenerId,
    pub(crate) key: ListenerKey,
    pub(crate) name: Option<&'static str>,
    pub(crate) callable: F,
    removed: AtomicBool,
}

impl<F> Entry<F> {
    pub(crate) fn new(id: ListenerId, key: ListenerKey, name: Option<&'static str>, callable: F) -> Self {
        Self {
            id,
            key,
            name,
            callable,
            removed: AtomicBool::new(false),
        }
    }

    #[inline]
    pub(crate) fn is_removed(&self) -> bool {
        self.removed.load(Ordering::Acquire)
    }

    /// Marks the entry dead. Returns `true` if it was live.
    #[inline]
    pub(crate) fn tombstone(&self) -> bool {
        !self.removed.swap(true, Ordering::AcqRel)
    }

    /// Label used in fault logs.
    pub(crate) fn label(&self) -> String {
        match self.name {
            Some(name) => format!("{name}@{}", self.id),
            None => self.id.to_string(),
        }
    }
}

/// Builds the erased form of a synchronous listener.
pub(crate) fn erase<S: Signal>(listener: &Listener<S>) -> ErasedFn {
    let listener = listener.clone();
    Box::new(move |payload: &dyn Any| match payload.downcast_ref::<S>() {
        Some(signal) => listener.call(signal),
        None => Err(mismatch::<S>().into()),
    })
}

/// Builds the erased form of an asynchronous listener.
pub(crate) fn erase_async<S: Signal>(listener: &AsyncListener<S>) -> ErasedAsyncFn {
    let listener = listener.clone();
    Box::new(
        move |payload: Arc<dyn Any + Send + Sync>| -> BoxFuture<'static, ListenerResult> {
            match payload.downcast::<S>() {
                Ok(signal) => listener.call(signal),
                Err(_) => {
                    let error: BoxError = mismatch::<S>().into();
                    async move { Err(error) }.boxed()
                }
            }
        },
    )
}

fn mismatch<S: Signal>() -> String {
    format!("payload type mismatch, expected {}", std::any::type_name::<S>())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tombstone_once() {
        let l = Listener::new(|_: &u8| {});
        let e = Entry::new(ListenerId { bus: 1, entry: 7 }, l.key(), None, erase(&l));

        assert!(!e.is_removed());
        assert!(e.tombstone());
        assert!(!e.tombstone());
        assert!(e.is_removed());
        assert_eq!(e.label(), "1#7");
    }

    #[test]
    fn test_erased_rejects_foreign_payload() {
        let l = Listener::new(|_: &u8| {});
        let f = erase(&l);

        assert!(f(&5_u8).is_ok());
        assert!(f(&5_u16).is_err());
    }
}
