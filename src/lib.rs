//! # signalbus
//!
//! **signalbus** is an in-process, typed publish/subscribe dispatch engine.
//!
//! Callers register interest in a signal type, optionally scoped by a key or
//! ordered by a priority, and later deliver a payload to every matching listener.
//! Listener sets may be mutated from inside a delivery pass (including a listener
//! removing itself), faults in one listener never stop the others, and the async
//! bus fans a payload out to many listeners concurrently.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   ┌──────────┐   ┌────────────┐   ┌────────────────┐   ┌────────────┐
//!   │   Bus    │   │ KeyedBus<K>│   │ PrioritizedBus │   │  AsyncBus  │
//!   │ (global) │   │ (key, sig) │   │ (sig, rank)    │   │ (fan-out)  │
//!   └────┬─────┘   └─────┬──────┘   └───────┬────────┘   └─────┬──────┘
//!        │ KeyedBus<()>  │                  │                  │
//!        └──────────────►┤                  │                  │
//!                        ▼                  ▼                  ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │ Registry<G, R, F> (one per bus instance)                            │
//! │  - buckets: group ──► rank ──► [Entry]   (insertion order)          │
//! │  - tombstones + pending set              (deferred removal)         │
//! │  - snapshot = compact dirty groups, then clone live entries         │
//! └──────────────────────────────┬──────────────────────────────────────┘
//!                                ▼
//!                  deliver / fan-out (registry lock released)
//!                                ├─ Ok     ─► next listener
//!                                └─ fault  ─► warn!(listener fault), continue
//!
//!   WaitForSignal<S> ──attach──► any ListenerHost (one-shot, self-detaching)
//! ```
//!
//! ### Invocation
//! ```text
//! invoke(signal)
//!   ├─► lock registry
//!   │     ├─ compact every group holding tombstones
//!   │     └─ snapshot live entries of (group) ordered rank high → low
//!   ├─► unlock
//!   └─► for entry in snapshot:
//!         ├─ tombstoned since the snapshot? ─► skip
//!         └─ call (catch_unwind) ─► fault? ─► log, continue
//! ```
//!
//! ## Features
//! | Area             | Description                                                   | Key types / traits                          |
//! |------------------|---------------------------------------------------------------|---------------------------------------------|
//! | **Buses**        | Unscoped, keyed, prioritized and async dispatch.              | [`Bus`], [`KeyedBus`], [`PrioritizedBus`], [`AsyncBus`] |
//! | **Listeners**    | Shared-identity handles for sync and async callables.         | [`Listener`], [`AsyncListener`], [`SignalHandler`] |
//! | **Suspension**   | One-shot "wait for signal" flag and future.                   | [`WaitForSignal`]                           |
//! | **Hosting**      | Uniform attach/detach over every bus.                         | [`ListenerHost`]                            |
//! | **Errors**       | Typed bus errors and logged listener faults.                  | [`BusError`], [`ListenerFault`]             |
//! | **Configuration**| Bus naming, bucket sizing, sync dispatch mode.                | [`BusConfig`], [`AsyncBusConfig`]           |
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use parking_lot::Mutex;
//! use signalbus::{Listener, PrioritizedBus, Priority, WaitForSignal};
//!
//! struct Explosion { count: u32 }
//!
//! let bus = PrioritizedBus::new();
//! let log = Arc::new(Mutex::new(Vec::new()));
//!
//! let a = { let log = log.clone(); Listener::new(move |e: &Explosion| log.lock().push(format!("A({})", e.count))) };
//! let b = { let log = log.clone(); Listener::new(move |e: &Explosion| log.lock().push(format!("B({})", e.count))) };
//! bus.register_with_priority(&b, 1);
//! bus.register_with_priority(&a, 5);
//!
//! let wait = WaitForSignal::<Explosion>::keyed(&bus, Priority::DEFAULT);
//! bus.invoke(&Explosion { count: 3 });
//!
//! assert_eq!(*log.lock(), vec!["A(3)", "B(3)"]);
//! assert!(!wait.is_waiting());
//! ```
//!
//! ## Logging
//! The crate emits [`tracing`] events and never installs a subscriber:
//! `debug` for registration changes, `trace` for compaction, `warn` for every
//! listener fault.

mod buses;
mod config;
mod error;
mod registry;
mod signals;
mod suspend;

// ---- Public re-exports ----

pub use buses::{AsyncBus, Bus, Completion, KeyedBus, ListenerHost, PrioritizedBus, Priority};
pub use config::{AsyncBusConfig, BusConfig, SyncDispatch};
pub use error::{BoxError, BusError, ListenerFault, ListenerResult};
pub use signals::{
    AsyncListener, IntoListenerResult, Listener, ListenerId, ScopeKey, Signal, SignalHandler,
    SignalId, WeakListener,
};
pub use suspend::WaitForSignal;
