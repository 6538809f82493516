//! Result reporting and debug instrumentation.
//!
//! Deterministic JSON serialization of a search result for logs and
//! replays, an indented dump of the search tree, and a determinism
//! self-check that plans the same state twice and compares.

use serde::Serialize;
use tracing::{debug, error};

use search_core::GameState;

use crate::planner::{Planner, PlanningContext};
use crate::search::SearchResult;
use crate::tree::SearchTree;

/// Serializable view of a search result. Field order is fixed by the
/// struct, which keeps the JSON output byte-stable for a given result.
#[derive(Debug, Serialize)]
pub struct SearchReport {
    pub best_action: ActionReport,
    pub evaluation: f64,
    pub nodes_searched: u64,
    pub depth_reached: i32,
    pub time_ms: f64,
    pub tt_hit_rate: f32,
    pub completed: bool,
    pub entropy: f64,
    pub principal_variation: Vec<PvStep>,
}

#[derive(Debug, Serialize)]
pub struct ActionReport {
    pub from: u32,
    pub to: u32,
    pub type_flags: u32,
}

#[derive(Debug, Serialize)]
pub struct PvStep {
    pub from: u32,
    pub to: u32,
}

impl From<&SearchResult> for SearchReport {
    fn from(result: &SearchResult) -> Self {
        Self {
            best_action: ActionReport {
                from: result.best_action.from,
                to: result.best_action.to,
                type_flags: result.best_action.type_flags,
            },
            evaluation: result.evaluation.to_float() as f64,
            nodes_searched: result.nodes_searched,
            depth_reached: result.depth_reached,
            time_ms: result.elapsed_ms,
            tt_hit_rate: result.tt_hit_rate,
            completed: result.completed,
            entropy: result.entropy.to_float() as f64,
            principal_variation: result
                .principal_variation
                .iter()
                .map(|action| PvStep {
                    from: action.from,
                    to: action.to,
                })
                .collect(),
        }
    }
}

/// Serialize a search result as a single JSON object.
pub fn result_to_json(result: &SearchResult) -> String {
    serde_json::to_string(&SearchReport::from(result)).expect("report serialization is infallible")
}

/// Indented enumeration of the search tree down to `max_depth` levels.
pub fn describe_tree(tree: &SearchTree, max_depth: u32) -> String {
    let root = tree.get(tree.root());
    let mut out = format!(
        "search tree (root: hash={:#018x}, children={})\n",
        root.state_hash,
        root.children.len()
    );

    fn walk(tree: &SearchTree, id: crate::node::NodeId, level: u32, max_depth: u32, out: &mut String) {
        if level > max_depth {
            return;
        }
        let node = tree.get(id);
        for _ in 0..level {
            out.push_str("  ");
        }
        out.push_str(&format!(
            "[{}->{}] value: {:.3}, visits: {}\n",
            node.action.from,
            node.action.to,
            node.value.to_float(),
            node.visits
        ));
        for &child in &node.children {
            walk(tree, child, level + 1, max_depth, out);
        }
    }

    for &child in &tree.get(tree.root()).children {
        walk(tree, child, 0, max_depth, &mut out);
    }

    if tree.get(tree.root()).children.is_empty() {
        out.push_str("(no expanded children)\n");
    }

    out
}

/// Plan the same state twice through a fresh planner state and compare
/// the decisions. Returns true when the runs agree.
pub fn validate_determinism(planner: &mut Planner, state: &dyn GameState) -> bool {
    let context = PlanningContext {
        state: Some(state),
        frame_budget_ms: 1000.0,
        available_time_ms: 1000.0,
        urgent: false,
    };

    planner.reset();
    while !planner.plan_step(&context) {}
    let first = planner.planned_action();

    planner.reset();
    while !planner.plan_step(&context) {}
    let second = planner.planned_action();

    let deterministic = first.primary == second.primary
        && first.expected_value == second.expected_value
        && first.lookahead_depth == second.lookahead_depth;

    if deterministic {
        debug!("determinism validation passed");
    } else {
        error!(
            first_from = first.primary.from,
            first_to = first.primary.to,
            second_from = second.primary.from,
            second_to = second.primary.to,
            "determinism violation detected"
        );
    }

    deterministic
}
