//! # Bus configuration.
//!
//! Provides [`BusConfig`] for the synchronous buses and [`AsyncBusConfig`] for
//! [`AsyncBus`](crate::AsyncBus).
//!
//! Config is used in one way: every bus takes it in `with_config(cfg)`, and
//! `new()` is `with_config(Default::default())`.
//!
//! ## Sentinel values
//! - `bucket_capacity = 0` → treated as 1 (see [`BusConfig::bucket_capacity_clamped`])

use std::borrow::Cow;

/// Configuration shared by every bus variant.
///
/// ## Field semantics
/// - `name`: label attached to every log line emitted by the bus
/// - `bucket_capacity`: initial capacity of a freshly created listener bucket
#[derive(Clone, Debug)]
pub struct BusConfig {
    /// Label used in log fields (`bus = ...`).
    pub name: Cow<'static, str>,

    /// Initial capacity of each new bucket (min 1).
    pub bucket_capacity: usize,
}

impl BusConfig {
    /// Creates a default config with the given name.
    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Returns a bucket capacity clamped to a minimum of 1.
    #[inline]
    pub fn bucket_capacity_clamped(&self) -> usize {
        self.bucket_capacity.max(1)
    }
}

impl Default for BusConfig {
    /// Default configuration:
    ///
    /// - `name = "bus"`
    /// - `bucket_capacity = 4`
    fn default() -> Self {
        Self {
            name: Cow::Borrowed("bus"),
            bucket_capacity: 4,
        }
    }
}

/// How the async bus runs synchronous listeners during fan-out.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SyncDispatch {
    /// Run each synchronous listener on the blocking pool (`spawn_blocking`).
    ///
    /// A slow synchronous listener never occupies an async worker thread.
    #[default]
    Blocking,

    /// Run each synchronous listener as a regular task (`tokio::spawn`).
    ///
    /// Cheaper for short bodies; a long body stalls the worker it lands on.
    Spawn,
}

/// Configuration for [`AsyncBus`](crate::AsyncBus).
#[derive(Clone, Debug, Default)]
pub struct AsyncBusConfig {
    /// Shared settings (name, bucket sizing).
    pub bus: BusConfig,

    /// Dispatch mode for synchronous listeners.
    pub sync_dispatch: SyncDispatch,
}

impl AsyncBusConfig {
    /// Creates a default async config with the given name.
    pub fn named(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            bus: BusConfig::named(name),
            ..Self::default()
        }
    }
}
