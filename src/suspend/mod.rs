//! # Suspension: bridge push delivery into sequential control flow.
//!
//! [`WaitForSignal`] is a one-shot listener that flips from *waiting* to *fired*
//! on the first delivery of its signal. A cooperative scheduler can poll
//! [`WaitForSignal::is_waiting`] every tick; async code simply `.await`s it.
//!
//! ```text
//!  WaitForSignal::new(&bus)
//!        │  attach private listener
//!        ▼
//!   ┌──────────┐   first delivery   ┌────────┐
//!   │ Waiting  │ ─────────────────► │ Fired  │  (terminal)
//!   └──────────┘  detach, inspect,  └────────┘
//!                 wake awaiting task
//! ```
//!
//! Nothing here blocks a thread. Timeouts are composed by the caller, for example
//! with `tokio::time::timeout(d, wait)`.

mod wait;

pub use wait::WaitForSignal;
