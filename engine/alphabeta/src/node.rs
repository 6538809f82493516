//! Search tree node representation.
//!
//! Each node records the action that reached it together with the visit
//! statistics the planner reads back out. Nodes live in the tree's arena
//! and reference each other by index.

use search_core::{Action, Q};

/// Index into the node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    pub const NONE: NodeId = NodeId(u32::MAX);

    #[inline]
    pub fn is_none(self) -> bool {
        self == Self::NONE
    }

    #[inline]
    pub fn is_some(self) -> bool {
        !self.is_none()
    }
}

/// Node flag bits.
pub mod flags {
    pub const EXPANDED: u8 = 1 << 0;
    pub const TERMINAL: u8 = 1 << 1;
    pub const PRUNED: u8 = 1 << 2;
    pub const FULLY_EVALUATED: u8 = 1 << 3;
    pub const ON_PV: u8 = 1 << 4;
    pub const TRANSPOSITION: u8 = 1 << 5;
}

/// A node in the search tree.
#[derive(Debug, Clone)]
pub struct SearchNode {
    /// Parent index; non-owning back-reference (NONE for the root).
    pub parent: NodeId,

    /// Action that led here from the parent.
    pub action: Action,

    /// Best value seen through this node.
    pub value: Q,

    /// Sum of all recorded values; `average_value` = value_sum / visits.
    pub value_sum: Q,

    pub visits: u32,

    /// Distance from the root.
    pub depth: u32,

    pub state_hash: u64,

    pub flags: u8,

    /// Child indices, kept sorted by the Action total order.
    pub children: Vec<NodeId>,
}

impl SearchNode {
    pub fn new_root(state_hash: u64) -> Self {
        Self {
            parent: NodeId::NONE,
            action: Action::default(),
            value: Q::ZERO,
            value_sum: Q::ZERO,
            visits: 0,
            depth: 0,
            state_hash,
            flags: 0,
            children: Vec::new(),
        }
    }

    pub fn new_child(parent: NodeId, action: Action, depth: u32) -> Self {
        Self {
            parent,
            action,
            value: Q::ZERO,
            value_sum: Q::ZERO,
            visits: 0,
            depth,
            state_hash: 0,
            flags: 0,
            children: Vec::new(),
        }
    }

    /// Record one visit: bumps the counter, accumulates the value sum,
    /// and keeps `value` at the maximum seen.
    #[inline]
    pub fn record_visit(&mut self, value: Q) {
        self.visits += 1;
        self.value_sum = self.value_sum + value;
        self.value = self.value.max(value);
    }

    /// Mean recorded value; zero-visit nodes divide by one.
    #[inline]
    pub fn average_value(&self) -> Q {
        self.value_sum / Q::from_int(self.visits.max(1) as i32)
    }

    #[inline]
    pub fn set_flag(&mut self, flag: u8) {
        self.flags |= flag;
    }

    #[inline]
    pub fn clear_flag(&mut self, flag: u8) {
        self.flags &= !flag;
    }

    #[inline]
    pub fn has_flag(&self, flag: u8) -> bool {
        self.flags & flag != 0
    }

    #[inline]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }
}
