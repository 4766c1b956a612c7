//! # Listener registry - bucketed storage with deferred removal.
//!
//! Storage shared by every bus variant. A registry is addressed by a **group**
//! (`SignalId`, or `(ScopeKey, SignalId)` for the keyed bus) and, inside a group,
//! by a **rank** (`()` for unordered buses, [`Priority`](crate::Priority) for the
//! prioritized bus).
//!
//! ## Architecture
//! ```text
//! Registry
//!   ├─► groups: G ──► BTreeMap<R, Bucket>      (ranks walked high → low)
//!   │                    └─► Bucket { entries: Vec<Arc<Entry>>, pending: {entry id} }
//!   ├─► dirty: {G}                             (groups holding tombstones)
//!   └─► locations: entry id ──► (G, R)         (for remove-by-id)
//! ```
//!
//! ## Rules
//! - `unregister` / `remove` only set the entry's tombstone and record it as pending
//! - `snapshot` compacts **every** dirty group first, then clones the live entries
//! - compaction drops tombstoned entries, then prunes empty ranks and empty groups
//! - `clear*` drops entries immediately and tombstones them for in-flight snapshots
//! - a live listener is stored at most once per bucket (re-registration is a no-op)

use std::collections::{BTreeMap, HashMap, HashSet};
use std::hash::Hash;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::trace;

use super::entry::Entry;
use crate::config::BusConfig;
use crate::error::BusError;
use crate::signals::{ListenerId, ListenerKey};

/// Global counter handing out bus instance ids.
static BUS_SEQ: AtomicU64 = AtomicU64::new(1);

/// Ordered entries for one `(group, rank)` address.
struct Bucket<F> {
    entries: Vec<Arc<Entry<F>>>,
    pending: HashSet<u64>,
}

impl<F> Bucket<F> {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Vec::with_capacity(capacity),
            pending: HashSet::new(),
        }
    }

    fn live(&self) -> usize {
        self.entries.len() - self.pending.len()
    }

    fn find_live(&self, key: ListenerKey) -> Option<&Arc<Entry<F>>> {
        self.entries
            .iter()
            .find(|e| e.key == key && !e.is_removed())
    }
}

/// Outcome of [`Registry::register`].
pub(crate) struct Registration {
    pub(crate) id: ListenerId,
    /// `false` when the listener was already live in the bucket.
    pub(crate) fresh: bool,
}

/// Bucketed listener storage with tombstone-based removal.
pub(crate) struct Registry<G, R, F> {
    bus: u64,
    name: String,
    capacity: usize,
    groups: HashMap<G, BTreeMap<R, Bucket<F>>>,
    dirty: HashSet<G>,
    locations: HashMap<u64, (G, R)>,
    next_entry: u64,
}

impl<G, R, F> Registry<G, R, F>
where
    G: Clone + Eq + Hash,
    R: Copy + Ord,
{
    /// Creates an empty registry with a fresh bus id.
    pub(crate) fn new(config: &BusConfig) -> Self {
        Self {
            bus: BUS_SEQ.fetch_add(1, Ordering::Relaxed),
            name: config.name.to_string(),
            capacity: config.bucket_capacity_clamped(),
            groups: HashMap::new(),
            dirty: HashSet::new(),
            locations: HashMap::new(),
            next_entry: 0,
        }
    }

    /// Id of the bus owning this registry.
    pub(crate) fn bus_id(&self) -> u64 {
        self.bus
    }

    /// Appends a listener to the `(group, rank)` bucket.
    ///
    /// `make` builds the erased callable; it runs only when a new entry is created.
    pub(crate) fn register(
        &mut self,
        group: G,
        rank: R,
        key: ListenerKey,
        name: Option<&'static str>,
        make: impl FnOnce() -> F,
    ) -> Registration {
        let capacity = self.capacity;
        let bucket = self
            .groups
            .entry(group.clone())
            .or_default()
            .entry(rank)
            .or_insert_with(|| Bucket::with_capacity(capacity));

        if let Some(existing) = bucket.find_live(key) {
            return Registration {
                id: existing.id,
                fresh: false,
            };
        }

        self.next_entry += 1;
        let id = ListenerId {
            bus: self.bus,
            entry: self.next_entry,
        };
        bucket
            .entries
            .push(Arc::new(Entry::new(id, key, name, make())));
        self.locations.insert(id.entry, (group, rank));

        Registration { id, fresh: true }
    }

    /// Tombstones every live entry of `key` in `group` (all ranks).
    ///
    /// Returns the number of entries tombstoned; `0` means nothing was live.
    pub(crate) fn unregister(&mut self, group: &G, key: ListenerKey) -> usize {
        let Some(ranks) = self.groups.get_mut(group) else {
            return 0;
        };

        let mut hit = 0;
        for bucket in ranks.values_mut() {
            for entry in &bucket.entries {
                if entry.key == key && entry.tombstone() {
                    bucket.pending.insert(entry.id.entry);
                    hit += 1;
                }
            }
        }
        if hit > 0 {
            self.dirty.insert(group.clone());
        }
        hit
    }

    /// Tombstones the entry registered under `id`.
    ///
    /// Returns `Ok(false)` if the entry is already dead or gone.
    pub(crate) fn remove(&mut self, id: ListenerId) -> Result<bool, BusError> {
        if id.bus != self.bus {
            return Err(BusError::invalid(format!(
                "listener {id} was issued by bus {} not bus {}",
                id.bus, self.bus
            )));
        }

        let Some((group, rank)) = self.locations.get(&id.entry) else {
            return Ok(false);
        };
        let Some(bucket) = self
            .groups
            .get_mut(group)
            .and_then(|ranks| ranks.get_mut(rank))
        else {
            return Ok(false);
        };

        let Some(entry) = bucket.entries.iter().find(|e| e.id == id) else {
            return Ok(false);
        };
        if !entry.tombstone() {
            return Ok(false);
        }
        bucket.pending.insert(id.entry);
        let group = group.clone();
        self.dirty.insert(group);
        Ok(true)
    }

    /// Compacts every dirty group, then returns the live entries of `group`
    /// ordered by rank (high → low) and insertion order within a rank.
    pub(crate) fn snapshot(&mut self, group: &G) -> Vec<Arc<Entry<F>>> {
        self.compact();

        let Some(ranks) = self.groups.get(group) else {
            return Vec::new();
        };
        ranks
            .values()
            .rev()
            .flat_map(|bucket| bucket.entries.iter().cloned())
            .collect()
    }

    /// Physically drops tombstoned entries of all dirty groups.
    pub(crate) fn compact(&mut self) {
        if self.dirty.is_empty() {
            return;
        }

        let mut dropped = 0usize;
        let mut pruned = 0usize;
        for group in std::mem::take(&mut self.dirty) {
            let Some(ranks) = self.groups.get_mut(&group) else {
                continue;
            };
            for bucket in ranks.values_mut() {
                if bucket.pending.is_empty() {
                    continue;
                }
                for id in bucket.pending.drain() {
                    self.locations.remove(&id);
                }
                let before = bucket.entries.len();
                bucket.entries.retain(|e| !e.is_removed());
                dropped += before - bucket.entries.len();
            }

            let before = ranks.len();
            ranks.retain(|_, bucket| !bucket.entries.is_empty());
            pruned += before - ranks.len();
            if ranks.is_empty() {
                self.groups.remove(&group);
            }
        }
        trace!(bus = %self.name, dropped, pruned, "registry compacted");
    }

    /// Live listeners in `group` across all ranks.
    pub(crate) fn count(&self, group: &G) -> usize {
        self.groups
            .get(group)
            .map(|ranks| ranks.values().map(Bucket::live).sum())
            .unwrap_or(0)
    }

    /// Live listeners in one `(group, rank)` bucket.
    pub(crate) fn count_at(&self, group: &G, rank: R) -> usize {
        self.groups
            .get(group)
            .and_then(|ranks| ranks.get(&rank))
            .map(Bucket::live)
            .unwrap_or(0)
    }

    /// Ranks of `group` holding at least one live listener, high → low.
    pub(crate) fn ranks(&self, group: &G) -> Vec<R> {
        self.groups
            .get(group)
            .map(|ranks| {
                ranks
                    .iter()
                    .rev()
                    .filter(|(_, bucket)| bucket.live() > 0)
                    .map(|(rank, _)| *rank)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Groups holding at least one live listener.
    pub(crate) fn live_groups(&self) -> impl Iterator<Item = &G> {
        self.groups
            .iter()
            .filter(|(_, ranks)| ranks.values().any(|b| b.live() > 0))
            .map(|(group, _)| group)
    }

    /// Drops every entry of `group` immediately. Returns the live count removed.
    pub(crate) fn clear(&mut self, group: &G) -> usize {
        self.clear_where(|g| g == group)
    }

    /// Drops every entry of every group matching `pred`.
    pub(crate) fn clear_where(&mut self, pred: impl Fn(&G) -> bool) -> usize {
        let doomed: Vec<G> = self.groups.keys().filter(|g| pred(g)).cloned().collect();

        let mut removed = 0;
        for group in doomed {
            if let Some(ranks) = self.groups.remove(&group) {
                for bucket in ranks.into_values() {
                    removed += self.drop_bucket(bucket);
                }
            }
            self.dirty.remove(&group);
        }
        removed
    }

    /// Drops every entry of every group.
    pub(crate) fn clear_all(&mut self) -> usize {
        let mut removed = 0;
        for (_, ranks) in std::mem::take(&mut self.groups) {
            for bucket in ranks.into_values() {
                removed += self.drop_bucket(bucket);
            }
        }
        self.dirty.clear();
        self.locations.clear();
        removed
    }

    fn drop_bucket(&mut self, bucket: Bucket<F>) -> usize {
        let mut live = 0;
        for entry in bucket.entries {
            if entry.tombstone() {
                live += 1;
            }
            self.locations.remove(&entry.id.entry);
        }
        live
    }
}
