//! # Async bus: concurrent fan-out with per-listener fault isolation.
//!
//! [`AsyncBus`] stores synchronous ([`Listener`]) and asynchronous
//! ([`AsyncListener`]) callables side by side in the same bucket. One invocation
//! starts every live listener as an independent unit of work and waits for all of
//! them.
//!
//! ## Architecture
//! ```text
//! invoke_async(signal)
//!     │  compact + snapshot (registry lock held only here)
//!     │
//!     ├──► AsyncListener 1 ──► tokio::spawn(fut) ───────────────┐
//!     ├──► Listener 2      ──► spawn_blocking(call) ────────────┤
//!     └──► AsyncListener N ──► tokio::spawn(fut) ───────────────┤
//!                                                               ▼
//!                                          Completion (join_all over every unit)
//!                                            ├─ Ok          → nothing
//!                                            ├─ Err(e)      → warn! listener_failed
//!                                            └─ JoinError   → warn! listener_panicked / aborted
//! ```
//!
//! ## Rules
//! - **All units start before anything is awaited**; a slow listener never
//!   delays the start of another
//! - **Completion** resolves after every unit finished, faulted or not
//! - **Isolation**: a fault is logged where the unit's completion is observed and
//!   never cancels siblings
//! - **No propagation**: listener faults never reach the invoking caller
//!
//! ## Invocation modes
//! - [`AsyncBus::invoke_async`]: await full completion
//! - [`AsyncBus::invoke`]: block the calling thread until completion
//! - [`AsyncBus::invoke_fire_and_forget`]: start the fan-out and detach it
//! - [`AsyncBus::start`]: start the fan-out and hand back the [`Completion`]

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::FutureExt;
use futures::future::{BoxFuture, join_all};
use parking_lot::Mutex;
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::config::{AsyncBusConfig, BusConfig, SyncDispatch};
use crate::error::{BusError, ListenerFault, ListenerResult, panic_message};
use crate::registry::{AsyncCallable, Entry, Registry, erase, erase_async, report_fault};
use crate::signals::{AsyncListener, Listener, ListenerId, ListenerKey, Signal, SignalId};

struct Inner {
    config: AsyncBusConfig,
    registry: Mutex<Registry<SignalId, (), AsyncCallable>>,
}

/// Listener bus with concurrent asynchronous fan-out.
///
/// Cheap to clone; clones share the same registry.
#[derive(Clone)]
pub struct AsyncBus {
    inner: Arc<Inner>,
}

impl AsyncBus {
    /// Creates a bus with the default config.
    pub fn new() -> Self {
        Self::with_config(AsyncBusConfig::default())
    }

    /// Creates a bus with the given config.
    pub fn with_config(config: AsyncBusConfig) -> Self {
        let registry = Registry::new(&config.bus);
        Self {
            inner: Arc::new(Inner {
                config,
                registry: Mutex::new(registry),
            }),
        }
    }

    /// Active configuration.
    pub fn config(&self) -> &AsyncBusConfig {
        &self.inner.config
    }

    /// Instance id stamped into every [`ListenerId`] this bus issues.
    pub fn id(&self) -> u64 {
        self.inner.registry.lock().bus_id()
    }

    fn bus_config(&self) -> &BusConfig {
        &self.inner.config.bus
    }

    /// Registers a synchronous listener for `S`.
    pub fn register<S: Signal>(&self, listener: &Listener<S>) -> ListenerId {
        self.insert::<S>(listener.key(), None, || {
            AsyncCallable::Sync(erase(listener).into())
        })
    }

    /// Registers an asynchronous listener for `S`.
    pub fn register_async<S: Signal>(&self, listener: &AsyncListener<S>) -> ListenerId {
        self.insert::<S>(listener.key(), listener.name(), || {
            AsyncCallable::Async(erase_async(listener).into())
        })
    }

    fn insert<S: Signal>(
        &self,
        key: ListenerKey,
        name: Option<&'static str>,
        make: impl FnOnce() -> AsyncCallable,
    ) -> ListenerId {
        let signal = SignalId::of::<S>();
        let reg = self
            .inner
            .registry
            .lock()
            .register(signal, (), key, name, make);
        debug!(
            bus = %self.bus_config().name,
            signal = signal.name(),
            listener = %reg.id,
            fresh = reg.fresh,
            "listener registered"
        );
        reg.id
    }

    /// Unregisters a synchronous listener for `S`. Idempotent.
    pub fn unregister<S: Signal>(&self, listener: &Listener<S>) -> bool {
        self.drop_key::<S>(listener.key())
    }

    /// Unregisters an asynchronous listener for `S`. Idempotent.
    pub fn unregister_async<S: Signal>(&self, listener: &AsyncListener<S>) -> bool {
        self.drop_key::<S>(listener.key())
    }

    fn drop_key<S: Signal>(&self, key: ListenerKey) -> bool {
        let signal = SignalId::of::<S>();
        let hit = self.inner.registry.lock().unregister(&signal, key);
        debug!(
            bus = %self.bus_config().name,
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
        debug!(bus = %self.bus_config().name, listener = %id, removed, "listener removed");
        Ok(removed)
    }

    /// Starts every live listener of `S` and returns the combined completion.
    ///
    /// All units are already running when this returns. Fails with
    /// [`BusError::NoRuntime`] outside a tokio runtime.
    pub fn start<S: Signal>(&self, signal: S) -> Result<Completion, BusError> {
        let handle = Handle::try_current().map_err(|_| BusError::NoRuntime)?;
        Ok(self.fan_out(&handle, signal))
    }

    /// Delivers `signal` to every listener of `S` concurrently and waits for all.
    pub async fn invoke_async<S: Signal>(&self, signal: S) -> Result<(), BusError> {
        self.start(signal)?.await;
        Ok(())
    }

    /// Delivers `signal` and blocks the calling thread until every listener finished.
    ///
    /// - inside a multi-thread runtime: uses `block_in_place`
    /// - inside a current-thread runtime: fails with [`BusError::BlockingInRuntime`]
    /// - outside any runtime: runs on a private current-thread runtime
    pub fn invoke<S: Signal>(&self, signal: S) -> Result<(), BusError> {
        match Handle::try_current() {
            Ok(handle) => match handle.runtime_flavor() {
                RuntimeFlavor::CurrentThread => Err(BusError::BlockingInRuntime),
                _ => {
                    let completion = self.fan_out(&handle, signal);
                    tokio::task::block_in_place(|| handle.block_on(completion));
                    Ok(())
                }
            },
            Err(_) => {
                let runtime = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .build()
                    .map_err(|e| BusError::RuntimeBuild {
                        error: e.to_string(),
                    })?;
                let completion = self.fan_out(runtime.handle(), signal);
                runtime.block_on(completion);
                Ok(())
            }
        }
    }

    /// Starts the fan-out and detaches it; faults are still logged.
    pub fn invoke_fire_and_forget<S: Signal>(&self, signal: S) -> Result<(), BusError> {
        let handle = Handle::try_current().map_err(|_| BusError::NoRuntime)?;
        let completion = self.fan_out(&handle, signal);
        drop(handle.spawn(completion));
        Ok(())
    }

    fn fan_out<S: Signal>(&self, handle: &Handle, signal: S) -> Completion {
        let id = SignalId::of::<S>();
        let snapshot = self.inner.registry.lock().snapshot(&id);
        if snapshot.is_empty() {
            debug!(bus = %self.bus_config().name, signal = id.name(), "no listeners");
        }

        let payload: Arc<dyn Any + Send + Sync> = Arc::new(signal);
        let units: Vec<(String, JoinHandle<ListenerResult>)> = snapshot
            .into_iter()
            .filter(|entry| !entry.is_removed())
            .map(|entry| {
                let label = entry.label();
                let join = self.spawn_unit(handle, &entry, Arc::clone(&payload));
                (label, join)
            })
            .collect();

        Completion::observe(self.bus_config().name.to_string(), id, units)
    }

    /// Starts one unit. The listener is called only inside the spawned task.
    fn spawn_unit(
        &self,
        handle: &Handle,
        entry: &Entry<AsyncCallable>,
        payload: Arc<dyn Any + Send + Sync>,
    ) -> JoinHandle<ListenerResult> {
        match &entry.callable {
            AsyncCallable::Async(f) => {
                let f = Arc::clone(f);
                handle.spawn(async move { f(payload).await })
            }
            AsyncCallable::Sync(f) => {
                let f = Arc::clone(f);
                let run = move || f(payload.as_ref());
                match self.inner.config.sync_dispatch {
                    SyncDispatch::Blocking => handle.spawn_blocking(run),
                    SyncDispatch::Spawn => handle.spawn(async move { run() }),
                }
            }
        }
    }

    /// Live listeners (sync and async) for `S`.
    pub fn count<S: Signal>(&self) -> usize {
        self.inner.registry.lock().count(&SignalId::of::<S>())
    }

    /// True if at least one live listener exists for `S`.
    pub fn has_listeners<S: Signal>(&self) -> bool {
        self.count::<S>() > 0
    }

    /// Drops every listener for `S` immediately.
    pub fn clear<S: Signal>(&self) {
        let signal = SignalId::of::<S>();
        let removed = self.inner.registry.lock().clear(&signal);
        debug!(bus = %self.bus_config().name, signal = signal.name(), removed, "signal cleared");
    }

    /// Drops every listener on this bus immediately.
    pub fn clear_all(&self) {
        let removed = self.inner.registry.lock().clear_all();
        debug!(bus = %self.bus_config().name, removed, "bus cleared");
    }
}

impl Default for AsyncBus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AsyncBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncBus")
            .field("name", &self.bus_config().name)
            .field("sync_dispatch", &self.inner.config.sync_dispatch)
            .finish_non_exhaustive()
    }
}

/// Combined completion of one async fan-out.
///
/// Resolves once every started unit has finished. Dropping it does **not** cancel
/// the units; they keep running, but their faults are then never logged.
#[must_use = "units run regardless; await the completion to observe their faults"]
pub struct Completion {
    units: usize,
    inner: BoxFuture<'static, ()>,
}

impl Completion {
    fn observe(bus: String, signal: SignalId, units: Vec<(String, JoinHandle<ListenerResult>)>) -> Self {
        let count = units.len();
        let watchers = units.into_iter().map(move |(listener, join)| {
            let bus = bus.clone();
            async move {
                let fault = match join.await {
                    Ok(Ok(())) => return,
                    Ok(Err(error)) => ListenerFault::Failed { listener, error },
                    Err(e) if e.is_panic() => ListenerFault::Panicked {
                        listener,
                        info: panic_message(&*e.into_panic()),
                    },
                    Err(_) => ListenerFault::Aborted { listener },
                };
                report_fault(&bus, signal, &fault);
            }
        });
        Self {
            units: count,
            inner: join_all(watchers).map(|_| ()).boxed(),
        }
    }

    /// Number of units started by the fan-out.
    pub fn units(&self) -> usize {
        self.units
    }
}

impl Future for Completion {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<()> {
        self.inner.poll_unpin(cx)
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("units", &self.units)
            .finish_non_exhaustive()
    }
}
