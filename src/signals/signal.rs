//! # Signal identity.
//!
//! Any `Send + Sync + 'static` type is a [`Signal`]. Registries key listeners
//! by [`SignalId`], which compares by [`TypeId`] only: delivery matches the exact
//! payload type, never a supertype, trait object or structurally equal type.
//!
//! Multi-argument signals are plain tuples or structs:
//! ```rust
//! use signalbus::SignalId;
//!
//! struct Explosion { count: u32 }
//!
//! assert_eq!(SignalId::of::<Explosion>(), SignalId::of::<Explosion>());
//! assert_ne!(SignalId::of::<(u32, String)>(), SignalId::of::<(String, u32)>());
//! ```

use std::any::{TypeId, type_name};
use std::fmt;
use std::hash::{Hash, Hasher};

/// Marker for payload types that can be delivered through a bus.
pub trait Signal: Send + Sync + 'static {}

impl<T: Send + Sync + 'static> Signal for T {}

/// Scope key accepted by [`KeyedBus`](crate::KeyedBus).
pub trait ScopeKey: Clone + Eq + Hash + Send + Sync + 'static {}

impl<T: Clone + Eq + Hash + Send + Sync + 'static> ScopeKey for T {}

/// Stable identity token of a signal type.
///
/// Equality and hashing use the [`TypeId`] alone; the type name is carried for logs.
#[derive(Clone, Copy)]
pub struct SignalId {
    id: TypeId,
    name: &'static str,
}

impl SignalId {
    /// Returns the identity of `S`.
    #[inline]
    pub fn of<S: Signal>() -> Self {
        Self {
            id: TypeId::of::<S>(),
            name: type_name::<S>(),
        }
    }

    /// Fully qualified type name of the signal.
    #[inline]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Underlying [`TypeId`].
    #[inline]
    pub fn type_id(&self) -> TypeId {
        self.id
    }
}

impl PartialEq for SignalId {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for SignalId {}

impl Hash for SignalId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for SignalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SignalId").field(&self.name).finish()
    }
}

impl fmt::Display for SignalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Jump;
    struct Land;

    #[test]
    fn test_identity_is_exact_type() {
        assert_eq!(SignalId::of::<Jump>(), SignalId::of::<Jump>());
        assert_ne!(SignalId::of::<Jump>(), SignalId::of::<Land>());
        assert_ne!(SignalId::of::<u32>(), SignalId::of::<u64>());
    }

    #[test]
    fn test_name_is_type_name() {
        assert!(SignalId::of::<Jump>().name().ends_with("Jump"));
        assert_eq!(SignalId::of::<u8>().to_string(), "u8");
    }
}
