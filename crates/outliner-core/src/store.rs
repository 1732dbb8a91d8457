//! Generation-spanning store of persistent view records.
//!
//! # Design
//!
//! Records live in a contiguous arena of slots. A [`RecordRef`] is a
//! `(slot, stamp)` pair; every allocation takes a fresh stamp from a
//! store-wide counter, so a handle to a removed or relocated record never
//! aliases a newer one.
//!
//! A hash index maps each [`RecordKey`] to the bucket of slots holding that
//! key. Buckets almost always contain one slot; they grow when one domain
//! object is shown several times (an object linked into two collections).
//!
//! ## Generations
//!
//! The store counts rebuilds. A record is *used* when it was claimed during
//! the current generation. [`IdentityStore::reset_marks`] starts a new
//! generation, which clears the used mark of every record at once.
//!
//! ```text
//! rebuild N     record claimed            last_used = N
//! rebuild N+1   record absent             kept (grace)
//! rebuild N+2   sweep at start            removed if still unused
//! ```
//!
//! [`IdentityStore::sweep_unused`] only runs at the top of a rebuild, never
//! while a tree is being built.
//!
//! | Operation          | Time                      |
//! |--------------------|---------------------------|
//! | `claim_or_create`  | O(1) expected, O(k) worst |
//! | `remove`           | O(k)                      |
//! | `sweep_unused`     | O(n) + full rehash        |
//! | `rebuild_index`    | O(n)                      |
//!
//! Where k = records sharing one key, n = records in the store.

use std::fmt;

use ahash::AHashMap;
use bitflags::bitflags;
use smallvec::SmallVec;

use crate::id::RecordKey;

/// Number of whole generations a record may stay unclaimed before the
/// sweep removes it.
pub const GRACE_GENERATIONS: u64 = 1;

bitflags! {
    /// User-visible state kept on a persistent record.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct RecordFlags: u8 {
        /// Node is collapsed.
        const CLOSED = 1 << 0;
        /// Node is selected.
        const SELECTED = 1 << 1;
        /// Node matched the active text search.
        const SEARCH_MATCH = 1 << 2;
        /// Node was built while a recursive search was active and counts
        /// as open for the duration of that search.
        const CHILD_SEARCH = 1 << 3;
    }
}

impl RecordFlags {
    /// Whether a node with these flags shows its children.
    #[inline]
    #[must_use]
    pub fn is_open(self, searching: bool) -> bool {
        !self.contains(Self::CLOSED) || (searching && self.contains(Self::CHILD_SEARCH))
    }
}

// ============================================================================
// RecordRef
// ============================================================================

/// Handle to a record in an [`IdentityStore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RecordRef {
    slot: u32,
    stamp: u32,
}

impl RecordRef {
    /// Arena slot, for diagnostics.
    #[must_use]
    pub fn slot(self) -> u32 {
        self.slot
    }
}

impl fmt::Display for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}#{}", self.slot, self.stamp)
    }
}

// ============================================================================
// PersistentRecord
// ============================================================================

/// State that survives across rebuilds for one displayed element.
///
/// The domain id inside the key is never dereferenced by the store; callers
/// re-validate it against the domain graph before use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistentRecord {
    key: RecordKey,
    /// Open/selected/search state.
    pub flags: RecordFlags,
    last_used: u64,
}

impl PersistentRecord {
    #[must_use]
    pub fn key(&self) -> &RecordKey {
        &self.key
    }

    /// Generation in which the record was last claimed.
    #[must_use]
    pub fn last_used(&self) -> u64 {
        self.last_used
    }
}

/// Result of [`IdentityStore::claim`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Claim {
    pub record: RecordRef,
    /// The record did not exist before this claim.
    pub created: bool,
}

#[derive(Debug, Clone)]
struct Slot {
    stamp: u32,
    record: Option<PersistentRecord>,
}

// ============================================================================
// Sweep results
// ============================================================================

/// Maps handles from before a compaction to their new location.
#[derive(Debug, Clone, Default)]
pub struct Relocation {
    moved: AHashMap<RecordRef, RecordRef>,
}

impl Relocation {
    /// New handle for `old`, or `None` when the record was removed.
    #[must_use]
    pub fn apply(&self, old: RecordRef) -> Option<RecordRef> {
        self.moved.get(&old).copied()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.moved.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.moved.is_empty()
    }
}

/// What [`IdentityStore::sweep_unused`] did.
#[derive(Debug, Clone)]
pub enum SweepOutcome {
    /// Nothing was stale; handles are unchanged.
    Untouched,
    /// Stale records were dropped and the arena compacted.
    Compacted {
        removed: usize,
        relocation: Relocation,
    },
    /// Every record was stale. The store is empty and should be torn down.
    Emptied { removed: usize },
}

impl SweepOutcome {
    /// Number of records removed.
    #[must_use]
    pub fn removed(&self) -> usize {
        match self {
            Self::Untouched => 0,
            Self::Compacted { removed, .. } | Self::Emptied { removed } => *removed,
        }
    }

    /// Translate a handle taken before the sweep.
    #[must_use]
    pub fn relocate(&self, old: RecordRef) -> Option<RecordRef> {
        match self {
            Self::Untouched => Some(old),
            Self::Compacted { relocation, .. } => relocation.apply(old),
            Self::Emptied { .. } => None,
        }
    }
}

// ============================================================================
// IdentityStore
// ============================================================================

/// Keyed table owning every [`PersistentRecord`] of one view.
#[derive(Debug, Clone, Default)]
pub struct IdentityStore {
    slots: Vec<Slot>,
    free: Vec<u32>,
    index: AHashMap<RecordKey, SmallVec<[u32; 1]>>,
    len: usize,
    generation: u64,
    next_stamp: u32,
}

impl IdentityStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Current generation.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Start a new generation, clearing the used mark on every record.
    pub fn reset_marks(&mut self) {
        self.generation += 1;
    }

    /// Return an unclaimed record for `key`, or allocate one.
    ///
    /// The returned record is marked used, so no other caller receives it
    /// during this generation. New records start closed and unselected.
    pub fn claim_or_create(&mut self, key: RecordKey) -> RecordRef {
        self.claim(key).record
    }

    /// Like [`claim_or_create`](Self::claim_or_create), also reporting
    /// whether the record was allocated by this call.
    pub fn claim(&mut self, key: RecordKey) -> Claim {
        let generation = self.generation;
        if let Some(bucket) = self.index.get(&key) {
            for &slot in bucket {
                let entry = &mut self.slots[slot as usize];
                if let Some(record) = entry.record.as_mut()
                    && record.last_used != generation
                {
                    record.last_used = generation;
                    return Claim {
                        record: RecordRef {
                            slot,
                            stamp: entry.stamp,
                        },
                        created: false,
                    };
                }
            }
        }

        let record = PersistentRecord {
            key,
            flags: RecordFlags::CLOSED,
            last_used: generation,
        };
        let handle = self.alloc(record);
        self.index.entry(key).or_default().push(handle.slot);
        Claim {
            record: handle,
            created: true,
        }
    }

    /// Whether the record was claimed in the current generation.
    #[must_use]
    pub fn is_used(&self, handle: RecordRef) -> bool {
        self.get(handle)
            .is_some_and(|record| record.last_used == self.generation)
    }

    #[must_use]
    pub fn get(&self, handle: RecordRef) -> Option<&PersistentRecord> {
        self.slots
            .get(handle.slot as usize)
            .filter(|slot| slot.stamp == handle.stamp)
            .and_then(|slot| slot.record.as_ref())
    }

    pub fn get_mut(&mut self, handle: RecordRef) -> Option<&mut PersistentRecord> {
        self.slots
            .get_mut(handle.slot as usize)
            .filter(|slot| slot.stamp == handle.stamp)
            .and_then(|slot| slot.record.as_mut())
    }

    /// Flags of a record; empty for stale handles.
    #[must_use]
    pub fn flags(&self, handle: RecordRef) -> RecordFlags {
        self.get(handle)
            .map(|record| record.flags)
            .unwrap_or_default()
    }

    /// Set or clear flags on a record. Returns `false` for stale handles.
    pub fn set_flags(&mut self, handle: RecordRef, flags: RecordFlags, on: bool) -> bool {
        match self.get_mut(handle) {
            Some(record) => {
                record.flags.set(flags, on);
                true
            }
            None => false,
        }
    }

    /// Iterate live records in arena order.
    pub fn iter(&self) -> impl Iterator<Item = (RecordRef, &PersistentRecord)> {
        self.slots.iter().enumerate().filter_map(|(slot, entry)| {
            entry.record.as_ref().map(|record| {
                (
                    RecordRef {
                        slot: slot as u32,
                        stamp: entry.stamp,
                    },
                    record,
                )
            })
        })
    }

    /// Every live record with `key`, in claim order.
    pub fn lookup(&self, key: &RecordKey) -> impl Iterator<Item = RecordRef> + '_ {
        self.index
            .get(key)
            .into_iter()
            .flatten()
            .map(|&slot| RecordRef {
                slot,
                stamp: self.slots[slot as usize].stamp,
            })
    }

    /// Remove one record and its index entry.
    ///
    /// For local node removal only; bulk cleanup goes through
    /// [`sweep_unused`](Self::sweep_unused).
    pub fn remove(&mut self, handle: RecordRef) -> Option<PersistentRecord> {
        let slot = self.slots.get_mut(handle.slot as usize)?;
        if slot.stamp != handle.stamp {
            return None;
        }
        let record = slot.record.take()?;
        slot.stamp = self.next_stamp;
        self.next_stamp = self.next_stamp.wrapping_add(1);
        self.free.push(handle.slot);
        self.len -= 1;

        if let Some(bucket) = self.index.get_mut(&record.key) {
            bucket.retain(|slot| *slot != handle.slot);
            if bucket.is_empty() {
                self.index.remove(&record.key);
            }
        }
        Some(record)
    }

    /// Drop every record that has not been claimed for longer than the
    /// grace period.
    ///
    /// When nothing survives the store is cleared and the caller should tear
    /// it down. Otherwise the survivors are packed into a fresh arena and the
    /// index is rebuilt from it; the returned outcome translates old handles.
    pub fn sweep_unused(&mut self) -> SweepOutcome {
        let generation = self.generation;
        let stale = |record: &PersistentRecord| {
            generation.saturating_sub(record.last_used) > GRACE_GENERATIONS
        };

        let removed = self
            .slots
            .iter()
            .filter_map(|slot| slot.record.as_ref())
            .filter(|record| stale(record))
            .count();

        if removed == 0 {
            return SweepOutcome::Untouched;
        }

        if removed == self.len {
            tracing::debug!(
                target: "outliner.store",
                removed,
                "identity store emptied"
            );
            self.slots = Vec::new();
            self.free = Vec::new();
            self.index = AHashMap::new();
            self.len = 0;
            return SweepOutcome::Emptied { removed };
        }

        let old = std::mem::take(&mut self.slots);
        let mut slots = Vec::with_capacity(self.len - removed);
        let mut relocation = Relocation::default();
        for (slot, entry) in old.into_iter().enumerate() {
            let Some(record) = entry.record else {
                continue;
            };
            if stale(&record) {
                continue;
            }
            let new_ref = RecordRef {
                slot: slots.len() as u32,
                stamp: self.next_stamp,
            };
            self.next_stamp = self.next_stamp.wrapping_add(1);
            relocation.moved.insert(
                RecordRef {
                    slot: slot as u32,
                    stamp: entry.stamp,
                },
                new_ref,
            );
            slots.push(Slot {
                stamp: new_ref.stamp,
                record: Some(record),
            });
        }

        self.slots = slots;
        self.free.clear();
        self.len = self.slots.len();
        self.rebuild_index();

        tracing::debug!(
            target: "outliner.store",
            removed,
            remaining = self.len,
            "identity store compacted"
        );
        SweepOutcome::Compacted {
            removed,
            relocation,
        }
    }

    /// Reconstruct the hash index from the arena.
    pub fn rebuild_index(&mut self) {
        self.index.clear();
        for (slot, entry) in self.slots.iter().enumerate() {
            if let Some(record) = &entry.record {
                self.index.entry(record.key).or_default().push(slot as u32);
            }
        }
    }

    fn alloc(&mut self, record: PersistentRecord) -> RecordRef {
        let stamp = self.next_stamp;
        self.next_stamp = self.next_stamp.wrapping_add(1);
        self.len += 1;
        if let Some(slot) = self.free.pop() {
            let entry = &mut self.slots[slot as usize];
            entry.stamp = stamp;
            entry.record = Some(record);
            RecordRef { slot, stamp }
        } else {
            let slot = self.slots.len() as u32;
            self.slots.push(Slot {
                stamp,
                record: Some(record),
            });
            RecordRef { slot, stamp }
        }
    }
}
