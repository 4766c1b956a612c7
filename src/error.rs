//! Error types used by the buses and by listener delivery.
//!
//! This module defines two main error enums:
//!
//! - [`BusError`]: errors returned to the caller of a bus operation.
//! - [`ListenerFault`]: faults raised inside a listener during delivery.
//!
//! Both types provide helper methods (`as_label`, `as_message`) for logging.
//! A `ListenerFault` is never returned to the invoking caller; the bus logs it
//! and keeps delivering to the remaining listeners.

use std::any::Any;

use thiserror::Error;

/// Boxed error accepted from fallible listener bodies.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type returned by erased listener callables.
pub type ListenerResult = Result<(), BoxError>;

/// # Errors produced by bus operations.
///
/// These are surfaced immediately to the caller and never suppressed.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BusError {
    /// An argument was rejected (for example a listener id issued by another bus).
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// Why the argument was rejected.
        reason: String,
    },

    /// The operation needs a tokio runtime and none is reachable from this thread.
    #[error("no tokio runtime available")]
    NoRuntime,

    /// A blocking invocation was attempted on a current-thread runtime.
    #[error("cannot block inside a current-thread runtime; use invoke_async")]
    BlockingInRuntime,

    /// The private runtime backing a blocking invocation could not be built.
    #[error("failed to build runtime: {error}")]
    RuntimeBuild {
        /// The underlying I/O error message.
        error: String,
    },
}

impl BusError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use signalbus::BusError;
    ///
    /// let err = BusError::NoRuntime;
    /// assert_eq!(err.as_label(), "bus_no_runtime");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            BusError::InvalidArgument { .. } => "bus_invalid_argument",
            BusError::NoRuntime => "bus_no_runtime",
            BusError::BlockingInRuntime => "bus_blocking_in_runtime",
            BusError::RuntimeBuild { .. } => "bus_runtime_build",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            BusError::InvalidArgument { reason } => format!("invalid argument: {reason}"),
            BusError::NoRuntime => "no runtime".to_string(),
            BusError::BlockingInRuntime => "blocking in current-thread runtime".to_string(),
            BusError::RuntimeBuild { error } => format!("runtime build failed: {error}"),
        }
    }

    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        BusError::InvalidArgument {
            reason: reason.into(),
        }
    }
}

/// # Faults raised by a single listener during delivery.
///
/// Caught at single-listener granularity and logged by the bus.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ListenerFault {
    /// The listener body returned an error.
    #[error("listener {listener} failed: {error}")]
    Failed {
        /// Listener label (id or handler name).
        listener: String,
        /// The error returned by the listener.
        error: BoxError,
    },

    /// The listener body panicked.
    #[error("listener {listener} panicked: {info}")]
    Panicked {
        /// Listener label (id or handler name).
        listener: String,
        /// Panic payload rendered as text.
        info: String,
    },

    /// The unit of work running the listener was cancelled before finishing.
    #[error("listener {listener} aborted")]
    Aborted {
        /// Listener label (id or handler name).
        listener: String,
    },
}

impl ListenerFault {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use signalbus::ListenerFault;
    ///
    /// let fault = ListenerFault::Panicked { listener: "l#1".into(), info: "boom".into() };
    /// assert_eq!(fault.as_label(), "listener_panicked");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ListenerFault::Failed { .. } => "listener_failed",
            ListenerFault::Panicked { .. } => "listener_panicked",
            ListenerFault::Aborted { .. } => "listener_aborted",
        }
    }

    /// Returns a human-readable message with details about the fault.
    pub fn as_message(&self) -> String {
        match self {
            ListenerFault::Failed { error, .. } => format!("error: {error}"),
            ListenerFault::Panicked { info, .. } => format!("panic: {info}"),
            ListenerFault::Aborted { .. } => "aborted".to_string(),
        }
    }

    /// Label of the listener that raised the fault.
    pub fn listener(&self) -> &str {
        match self {
            ListenerFault::Failed { listener, .. }
            | ListenerFault::Panicked { listener, .. }
            | ListenerFault::Aborted { listener } => listener,
        }
    }
}

/// Renders a panic payload as text.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
