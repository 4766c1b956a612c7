//! # Asynchronous listeners
//!
//! [`AsyncListener`] is the async counterpart of [`Listener`](crate::Listener): a
//! shared handle to a closure `F: Fn(Arc<S>) -> Fut` that produces a fresh future
//! per delivery. The payload arrives as `Arc<S>` so the future can own it while it
//! runs on the tokio runtime.
//!
//! [`SignalHandler`] is the extension point for stateful handlers; wrap one with
//! [`AsyncListener::from_handler`] to register it on an [`AsyncBus`](crate::AsyncBus).
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use signalbus::{AsyncListener, ListenerResult, SignalHandler};
//!
//! struct Saved { slot: u8 }
//!
//! struct Uploader;
//!
//! #[async_trait]
//! impl SignalHandler<Saved> for Uploader {
//!     async fn handle(&self, signal: &Saved) -> ListenerResult {
//!         // upload slot...
//!         let _ = signal.slot;
//!         Ok(())
//!     }
//!     fn name(&self) -> &'static str { "uploader" }
//! }
//!
//! let from_handler = AsyncListener::from_handler(Arc::new(Uploader));
//! let from_closure = AsyncListener::new(|s: Arc<Saved>| async move { let _ = s.slot; });
//! assert_eq!(from_handler.name(), Some("uploader"));
//! assert_eq!(from_closure.name(), None);
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;

use crate::error::ListenerResult;
use crate::signals::listener::{IntoListenerResult, ListenerKey};
use crate::signals::Signal;

/// Contract for stateful asynchronous signal handlers.
///
/// Each delivery runs as an independent unit of work on the runtime, so
/// implementations should avoid blocking and prefer async I/O.
#[async_trait]
pub trait SignalHandler<S: Signal>: Send + Sync + 'static {
    /// Handle a single delivery.
    async fn handle(&self, signal: &S) -> ListenerResult;

    /// Human-readable name (for logs).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

type AsyncFn<S> = dyn Fn(Arc<S>) -> BoxFuture<'static, ListenerResult> + Send + Sync;

/// Shared handle to an asynchronous listener callable.
pub struct AsyncListener<S> {
    f: Arc<AsyncFn<S>>,
    name: Option<&'static str>,
}

impl<S: Signal> AsyncListener<S> {
    /// Creates an async listener from a closure returning a future.
    pub fn new<F, Fut, R>(f: F) -> Self
    where
        F: Fn(Arc<S>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: IntoListenerResult + 'static,
    {
        Self {
            f: Arc::new(move |signal: Arc<S>| {
                f(signal)
                    .map(IntoListenerResult::into_listener_result)
                    .boxed()
            }),
            name: None,
        }
    }

    /// Wraps a [`SignalHandler`]; its `name()` labels fault logs.
    pub fn from_handler<H: SignalHandler<S>>(handler: Arc<H>) -> Self {
        let name = handler.name();
        Self {
            f: Arc::new(move |signal: Arc<S>| {
                let handler = Arc::clone(&handler);
                async move { handler.handle(&signal).await }.boxed()
            }),
            name: Some(name),
        }
    }

    /// Handler name, if built from a [`SignalHandler`].
    pub fn name(&self) -> Option<&'static str> {
        self.name
    }

    /// Starts the listener directly, outside any bus.
    pub fn call(&self, signal: Arc<S>) -> BoxFuture<'static, ListenerResult> {
        (self.f)(signal)
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

impl<S> Clone for AsyncListener<S> {
    fn clone(&self) -> Self {
        Self {
            f: Arc::clone(&self.f),
            name: self.name,
        }
    }
}

impl<S> fmt::Debug for AsyncListener<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncListener")
            .field("signal", &std::any::type_name::<S>())
            .field("name", &self.name)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct Tick(u32);

    struct Summer {
        total: AtomicU32,
    }

    #[async_trait]
    impl SignalHandler<Tick> for Summer {
        async fn handle(&self, signal: &Tick) -> ListenerResult {
            self.total.fetch_add(signal.0, Ordering::SeqCst);
            Ok(())
        }

        fn name(&self) -> &'static str {
            "summer"
        }
    }

    #[tokio::test]
    async fn test_handler_adapter_forwards_payload() {
        let summer = Arc::new(Summer {
            total: AtomicU32::new(0),
        });
        let listener = AsyncListener::from_handler(Arc::clone(&summer));

        listener.call(Arc::new(Tick(4))).await.unwrap();
        listener.call(Arc::new(Tick(6))).await.unwrap();

        assert_eq!(summer.total.load(Ordering::SeqCst), 10);
        assert_eq!(listener.name(), Some("summer"));
    }

    #[tokio::test]
    async fn test_closure_error_surfaces_as_result() {
        let listener = AsyncListener::new(|t: Arc<Tick>| async move {
            if t.0 > 5 { Err("too high") } else { Ok(()) }
        });

        assert!(listener.call(Arc::new(Tick(1))).await.is_ok());
        assert!(listener.call(Arc::new(Tick(9))).await.is_err());
    }

    #[test]
    fn test_clone_keeps_identity() {
        let a = AsyncListener::new(|_: Arc<Tick>| async {});
        let b = a.clone();
        assert!(a.ptr_eq(&b));
        assert_eq!(a.key(), b.key());
    }
}
