//! Search tree with arena allocation.
//!
//! Nodes are stored in a contiguous Vec and referenced by `NodeId`, which
//! gives the parent back-reference without ownership cycles: the arena
//! owns every node, parents list their children by index, and a child
//! holds only its parent's index.

use search_core::{Action, Q};

use crate::node::{NodeId, SearchNode};

/// Arena-backed search tree.
#[derive(Debug)]
pub struct SearchTree {
    nodes: Vec<SearchNode>,
    root: NodeId,
}

impl SearchTree {
    /// Create a tree holding only a root with the given state hash.
    pub fn new(root_hash: u64) -> Self {
        Self {
            nodes: vec![SearchNode::new_root(root_hash)],
            root: NodeId(0),
        }
    }

    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    #[inline]
    pub fn get(&self, id: NodeId) -> &SearchNode {
        &self.nodes[id.0 as usize]
    }

    #[inline]
    pub fn get_mut(&mut self, id: NodeId) -> &mut SearchNode {
        &mut self.nodes[id.0 as usize]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Add a child under `parent`, keeping the child list sorted by the
    /// Action total order. Duplicate actions never occur within one
    /// parent because action ids within one state are distinct.
    pub fn add_child(&mut self, parent: NodeId, action: Action) -> NodeId {
        let depth = self.get(parent).depth + 1;
        let child_id = NodeId(self.nodes.len() as u32);
        self.nodes.push(SearchNode::new_child(parent, action, depth));

        let position = {
            let siblings = &self.nodes[parent.0 as usize].children;
            siblings.partition_point(|&id| self.nodes[id.0 as usize].action < action)
        };
        self.nodes[parent.0 as usize]
            .children
            .insert(position, child_id);
        self.nodes[parent.0 as usize].set_flag(crate::node::flags::EXPANDED);

        child_id
    }

    /// Find the child of `parent` reached by `action`.
    pub fn find_child(&self, parent: NodeId, action: &Action) -> Option<NodeId> {
        let node = self.get(parent);
        node.children
            .iter()
            .copied()
            .find(|&id| self.get(id).action == *action)
    }

    /// Child with the maximum `value`; ties break toward the earlier
    /// action in the total order (child lists are stored in that order).
    pub fn best_child(&self, parent: NodeId) -> Option<NodeId> {
        let node = self.get(parent);
        let mut best: Option<(NodeId, Q)> = None;

        for &child_id in &node.children {
            let value = self.get(child_id).value;
            match best {
                Some((_, best_value)) if value <= best_value => {}
                _ => best = Some((child_id, value)),
            }
        }

        best.map(|(id, _)| id)
    }

    /// UCB child selection: `average + c * sqrt(ln(parent.visits) /
    /// child.visits) + prior * c`. Unvisited children come first, among
    /// themselves by ascending action id; ties among visited children
    /// break by action order. The parent log is computed once per call.
    pub fn best_child_ucb(&self, parent: NodeId, c: f64) -> Option<NodeId> {
        let node = self.get(parent);
        let parent_log = (node.visits.max(1) as f64).ln();

        let mut best: Option<(NodeId, f64)> = None;
        for &child_id in &node.children {
            let child = self.get(child_id);
            let score = if child.visits == 0 {
                f64::MAX - child.action.action_id as f64
            } else {
                let exploit = child.average_value().to_float() as f64;
                let explore = c * (parent_log / child.visits as f64).sqrt();
                exploit + explore + child.action.prior.to_float() as f64 * c
            };
            match best {
                Some((_, best_score)) if score <= best_score => {}
                _ => best = Some((child_id, score)),
            }
        }

        best.map(|(id, _)| id)
    }

    /// Walk `best_child` from the root until a leaf or `max_len` actions.
    pub fn principal_variation(&self, max_len: usize) -> Vec<Action> {
        let mut pv = Vec::new();
        let mut current = self.root;

        while pv.len() < max_len {
            match self.best_child(current) {
                Some(child_id) => {
                    pv.push(self.get(child_id).action);
                    current = child_id;
                }
                None => break,
            }
        }

        pv
    }

    /// Re-flag the nodes on the given principal variation, clearing the
    /// marks left by earlier iterations.
    pub fn mark_principal_variation(&mut self, pv: &[Action]) {
        for node in &mut self.nodes {
            node.clear_flag(crate::node::flags::ON_PV);
        }

        let mut current = self.root;
        self.get_mut(current).set_flag(crate::node::flags::ON_PV);
        for action in pv {
            match self.find_child(current, action) {
                Some(child) => {
                    self.get_mut(child).set_flag(crate::node::flags::ON_PV);
                    current = child;
                }
                None => break,
            }
        }
    }

    /// Detach a subtree from its parent for reuse. The node stays in the
    /// arena; only the ownership link is cut.
    pub fn detach_from_parent(&mut self, id: NodeId) {
        let parent = self.get(id).parent;
        if parent.is_none() {
            return;
        }
        self.nodes[parent.0 as usize]
            .children
            .retain(|&child| child != id);
        self.get_mut(id).parent = NodeId::NONE;
    }
}
