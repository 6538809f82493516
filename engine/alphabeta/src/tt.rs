//! Direct-mapped transposition table.
//!
//! One slot per index, index = `hash & (len - 1)`. A probe only returns
//! the slot when the stored hash matches, so a colliding entry can be
//! evicted but never mistaken for another position.

use search_core::{Action, Q};

/// How a stored value bounds the true score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Bound {
    Exact,
    LowerBound,
    UpperBound,
}

/// One cached search outcome.
#[derive(Debug, Clone)]
pub struct TtEntry {
    pub state_hash: u64,
    pub value: Q,
    pub best_action: Action,
    pub depth: i32,
    pub bound: Bound,
}

/// Fixed-size direct-mapped cache of search outcomes.
#[derive(Debug)]
pub struct TranspositionTable {
    slots: Vec<Option<TtEntry>>,
    mask: u64,
    probes: u64,
    hits: u64,
}

/// Smallest permitted slot count.
const MIN_SLOTS: usize = 1024;

impl TranspositionTable {
    /// Build a table from a megabyte budget. The slot count is rounded up
    /// to a power of two and never drops below 1024.
    pub fn with_size_mb(size_mb: usize) -> Self {
        let bytes = size_mb.max(1) * 1024 * 1024;
        let per_slot = std::mem::size_of::<Option<TtEntry>>();
        let slots = (bytes / per_slot).max(MIN_SLOTS).next_power_of_two();

        Self {
            slots: vec![None; slots],
            mask: slots as u64 - 1,
            probes: 0,
            hits: 0,
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Look up a position. Counts the probe, and the hit when the stored
    /// hash matches.
    pub fn probe(&mut self, hash: u64) -> Option<TtEntry> {
        self.probes += 1;
        let slot = &self.slots[(hash & self.mask) as usize];
        match slot {
            Some(entry) if entry.state_hash == hash => {
                self.hits += 1;
                Some(entry.clone())
            }
            _ => None,
        }
    }

    /// Store an entry. The slot is replaced when it is empty, holds the
    /// same position, or the incoming entry searched at least as deep.
    /// Entries with a zero hash are never stored.
    pub fn store(&mut self, entry: TtEntry) {
        if entry.state_hash == 0 {
            return;
        }
        let index = (entry.state_hash & self.mask) as usize;
        let replace = match &self.slots[index] {
            None => true,
            Some(existing) => {
                existing.state_hash == entry.state_hash || entry.depth >= existing.depth
            }
        };
        if replace {
            self.slots[index] = Some(entry);
        }
    }

    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.probes = 0;
        self.hits = 0;
    }

    #[inline]
    pub fn probes(&self) -> u64 {
        self.probes
    }

    #[inline]
    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn hit_rate(&self) -> f32 {
        if self.probes == 0 {
            0.0
        } else {
            self.hits as f32 / self.probes as f32
        }
    }
}
