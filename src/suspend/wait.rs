use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::task::{Context, Poll};

use futures::task::AtomicWaker;
use parking_lot::Mutex;
use tracing::trace;

use crate::buses::ListenerHost;
use crate::signals::{Listener, ListenerId, Signal, SignalId};

type Finish<S> = Box<dyn FnOnce(&S) + Send>;

#[derive(Default)]
struct WaitState {
    fired: AtomicBool,
    waker: AtomicWaker,
}

/// One-shot adapter that waits for the first delivery of `S`.
///
/// The private listener holds only a weak reference to itself. Dropping the
/// adapter does not unregister it: an adapter that never fires stays registered
/// until the bus (or its bucket) is cleared.
///
/// ## Example
/// ```rust
/// use signalbus::{Bus, WaitForSignal};
///
/// struct GameStarted;
///
/// let bus = Bus::new();
/// let wait = WaitForSignal::<GameStarted>::new(&bus);
/// assert!(wait.is_waiting());
///
/// bus.invoke(&GameStarted);
/// assert!(!wait.is_waiting());
/// ```
#[must_use = "an adapter that is never polled or awaited only wastes a registration"]
pub struct WaitForSignal<S> {
    state: Arc<WaitState>,
    id: ListenerId,
    _signal: PhantomData<fn(&S)>,
}

impl<S: Signal> WaitForSignal<S> {
    /// Waits for `S` on a bus without keys.
    pub fn new<H: ListenerHost<Key = ()>>(host: &H) -> Self {
        Self::arm(host, (), None)
    }

    /// Waits for `S` delivered under `key`.
    pub fn keyed<H: ListenerHost>(host: &H, key: H::Key) -> Self {
        Self::arm(host, key, None)
    }

    /// Waits for `S` under `key` and hands the first payload to `inspect`.
    pub fn with_inspect<H, F>(host: &H, key: H::Key, inspect: F) -> Self
    where
        H: ListenerHost,
        F: FnOnce(&S) + Send + 'static,
    {
        Self::arm(host, key, Some(Box::new(inspect)))
    }

    fn arm<H: ListenerHost>(host: &H, key: H::Key, inspect: Option<Finish<S>>) -> Self {
        let state = Arc::new(WaitState::default());
        let slot: Arc<Mutex<Option<Finish<S>>>> = Arc::new(Mutex::new(None));

        let listener = {
            let state = Arc::clone(&state);
            let slot = Arc::clone(&slot);
            Listener::new(move |signal: &S| {
                let Some(finish) = slot.lock().take() else {
                    return;
                };
                // mark fired first: inspect may panic
                state.fired.store(true, Ordering::Release);
                state.waker.wake();
                finish(signal);
            })
        };

        let me = listener.downgrade();
        let detach_from = host.clone();
        let detach_key = key.clone();
        *slot.lock() = Some(Box::new(move |signal: &S| {
            if let Some(me) = me.upgrade() {
                detach_from.detach(&detach_key, &me);
            }
            if let Some(inspect) = inspect {
                inspect(signal);
            }
        }));

        let id = host.attach(&key, &listener);
        trace!(signal = SignalId::of::<S>().name(), listener = %id, "waiting for signal");

        Self {
            state,
            id,
            _signal: PhantomData,
        }
    }

    /// `true` until the first delivery; `false` forever after.
    pub fn is_waiting(&self) -> bool {
        !self.state.fired.load(Ordering::Acquire)
    }

    /// Registration backing this adapter.
    pub fn listener_id(&self) -> ListenerId {
        self.id
    }
}

impl<S> Future for WaitForSignal<S> {
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        if self.state.fired.load(Ordering::Acquire) {
            return Poll::Ready(());
        }
        self.state.waker.register(cx.waker());
        if self.state.fired.load(Ordering::Acquire) {
            Poll::Ready(())
        } else {
            Poll::Pending
        }
    }
}

impl<S> fmt::Debug for WaitForSignal<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WaitForSignal")
            .field("signal", &std::any::type_name::<S>())
            .field("listener", &self.id)
            .field("fired", &self.state.fired.load(Ordering::Acquire))
            .finish()
    }
}
