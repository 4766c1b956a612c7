//! Signal identity and listener handles.
//!
//! This module groups the **data model** seen by callers: what a signal is,
//! how it is identified inside a registry, and the handles through which
//! callables are registered.
//!
//! ## Contents
//! - [`Signal`], [`SignalId`] exact-type identity of a payload
//! - [`Listener`] synchronous callable handle (payload-accepting or payload-ignoring)
//! - [`AsyncListener`], [`SignalHandler`] asynchronous callables for [`AsyncBus`](crate::AsyncBus)
//! - [`ListenerId`] registration handle returned by every `register*` call

mod handler;
mod listener;
mod signal;

pub use handler::{AsyncListener, SignalHandler};
pub use listener::{IntoListenerResult, Listener, ListenerId, WeakListener};
pub use signal::{ScopeKey, Signal, SignalId};

pub(crate) use listener::ListenerKey;
