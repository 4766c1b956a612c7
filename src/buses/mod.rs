//! Bus variants.
//!
//! - [`Bus`]: one global scope, registration order
//! - [`KeyedBus`]: `(key, signal)` scopes, no global tier
//! - [`PrioritizedBus`]: integer ranks, highest first
//! - [`AsyncBus`]: concurrent fan-out over sync and async listeners
//!
//! All of them share the registry in [`crate::registry`] and implement
//! [`ListenerHost`].

mod asynchronous;
mod host;
mod keyed;
mod prioritized;
mod unscoped;

pub use asynchronous::{AsyncBus, Completion};
pub use host::ListenerHost;
pub use keyed::KeyedBus;
pub use prioritized::{PrioritizedBus, Priority};
pub use unscoped::Bus;
