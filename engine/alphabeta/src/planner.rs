//! Incremental planner.
//!
//! Drives the engine one frame at a time: detects root-state changes by
//! hash, resumes an in-flight search when the state is unchanged, and on
//! completion publishes a confidence-tagged planned action with up to
//! three alternatives.

use std::time::Instant;

use tracing::debug;

use search_core::{Action, DetHeap, GameState, Q};

use crate::config::{ConfigError, SearchConfig};
use crate::heuristics::Evaluator;
use crate::search::{AlphaBetaSearch, SearchResult};

/// Per-call planning input.
pub struct PlanningContext<'a> {
    /// Root state to plan from; `None` leaves the plan invalid.
    pub state: Option<&'a dyn GameState>,

    /// Frame budget for this call, milliseconds.
    pub frame_budget_ms: f64,

    /// Total wall-clock allowance for the whole plan, milliseconds.
    pub available_time_ms: f64,

    /// Urgent plans trade depth for latency.
    pub urgent: bool,
}

impl<'a> PlanningContext<'a> {
    pub fn new(state: &'a dyn GameState) -> Self {
        Self {
            state: Some(state),
            frame_budget_ms: 2.0,
            available_time_ms: 0.0,
            urgent: false,
        }
    }
}

/// A finished (or in-flight snapshot of a) planning decision.
#[derive(Debug, Clone, Default)]
pub struct PlannedAction {
    pub primary: Action,
    pub confidence: Q,
    /// Runner-up actions by root child value, best first; at most three.
    pub alternatives: Vec<Action>,
    pub expected_value: Q,
    pub lookahead_depth: i32,
    pub planning_time_ms: f64,
}

/// Frame-sliced wrapper around [`AlphaBetaSearch`].
pub struct Planner {
    search: AlphaBetaSearch,
    evaluator: Option<Box<dyn Evaluator>>,
    planning: bool,
    plan_valid: bool,
    last_root_hash: u64,
    total_planning_ms: f64,
    iterations: u32,
    current_plan: PlannedAction,
    /// Configured target depth, kept apart from the engine's live config
    /// so per-step urgency overrides never compound.
    nominal_base_depth: i32,
}

const MAX_ALTERNATIVES: usize = 3;

impl Planner {
    pub fn new() -> Self {
        let search = AlphaBetaSearch::new();
        let nominal_base_depth = search.config().base_depth;
        Self {
            search,
            evaluator: None,
            planning: false,
            plan_valid: false,
            last_root_hash: 0,
            total_planning_ms: 0.0,
            iterations: 0,
            current_plan: PlannedAction::default(),
            nominal_base_depth,
        }
    }

    /// Install the evaluator and configuration, then reset.
    pub fn initialize(
        &mut self,
        evaluator: Box<dyn Evaluator>,
        config: SearchConfig,
    ) -> Result<(), ConfigError> {
        self.nominal_base_depth = config.base_depth;
        self.search.set_config(config)?;
        self.evaluator = Some(evaluator);
        self.reset();
        Ok(())
    }

    /// Advance planning by one frame. Returns `true` once a valid plan
    /// exists for the context's state, `false` while work remains (or
    /// when the context is unusable).
    pub fn plan_step(&mut self, context: &PlanningContext<'_>) -> bool {
        let Some(state) = context.state else {
            return false;
        };
        if self.evaluator.is_none() {
            return false;
        }

        let root_hash = state.state_hash();
        if root_hash != self.last_root_hash {
            self.invalidate_plan();
            self.last_root_hash = root_hash;
        }

        if self.plan_valid && !self.planning {
            // Idempotent replan: nothing to do until the state changes.
            return true;
        }

        if !self.planning {
            self.begin_planning(state);
        }

        // Per-step budget comes from the frame context.
        let mut base_depth = self.nominal_base_depth;
        if context.urgent {
            base_depth = (base_depth - 2).max(4);
        }
        self.search
            .set_step_budget(context.frame_budget_ms, context.available_time_ms, base_depth);

        let step_start = Instant::now();
        let evaluator = self.evaluator.take().expect("checked above");
        let complete = self.search.search_step(state, evaluator.as_ref());
        self.evaluator = Some(evaluator);

        self.total_planning_ms += step_start.elapsed().as_secs_f64() * 1000.0;
        self.iterations += 1;

        let result = self.search.last_result().clone();
        if !result.best_action.is_empty() {
            self.current_plan = PlannedAction {
                primary: result.best_action,
                expected_value: result.evaluation,
                lookahead_depth: result.depth_reached,
                planning_time_ms: self.total_planning_ms,
                confidence: compute_confidence(&result),
                alternatives: self.extract_alternatives(&result.best_action),
            };
        }

        if complete {
            self.planning = false;
            self.plan_valid = true;

            debug!(
                depth = self.current_plan.lookahead_depth,
                confidence = self.current_plan.confidence.to_float(),
                time_ms = self.current_plan.planning_time_ms,
                "planning complete"
            );
            return true;
        }

        false
    }

    fn begin_planning(&mut self, state: &dyn GameState) {
        self.planning = true;
        self.plan_valid = false;
        self.total_planning_ms = 0.0;
        self.iterations = 0;
        self.current_plan = PlannedAction::default();

        // Killer and history data from the previous root would bias the
        // new search.
        self.search.clear_move_ordering();

        let evaluator = self.evaluator.take().expect("caller checked");
        self.search.begin_search(state, evaluator.as_ref());
        self.evaluator = Some(evaluator);
    }

    /// The finished plan (default while none is valid).
    pub fn planned_action(&self) -> PlannedAction {
        self.current_plan.clone()
    }

    /// Mid-search snapshot: the best action found so far with confidence
    /// recomputed from the live statistics.
    pub fn best_action_so_far(&self) -> PlannedAction {
        if self.planning {
            let result = self.search.last_result();
            return PlannedAction {
                primary: result.best_action,
                expected_value: result.evaluation,
                lookahead_depth: result.depth_reached,
                planning_time_ms: self.total_planning_ms,
                confidence: compute_confidence(result),
                alternatives: Vec::new(),
            };
        }
        self.current_plan.clone()
    }

    /// One-ply evaluation of an action through the heuristics.
    pub fn evaluate_action(&self, state: &dyn GameState, action: &Action) -> Q {
        let Some(evaluator) = &self.evaluator else {
            return Q::ZERO;
        };
        match state.apply(action) {
            Some(child) => -evaluator.evaluate(&*child),
            None => Q::MIN,
        }
    }

    /// Drop the current plan; cancels an in-flight search.
    pub fn invalidate_plan(&mut self) {
        if self.planning {
            self.search.cancel_search();
        }
        self.planning = false;
        self.plan_valid = false;
        self.current_plan = PlannedAction::default();
    }

    pub fn is_planning(&self) -> bool {
        self.planning
    }

    pub fn plan_valid(&self) -> bool {
        self.plan_valid
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Latest engine statistics.
    pub fn search_stats(&self) -> &SearchResult {
        self.search.last_result()
    }

    /// Search tree access for debug enumeration.
    pub fn search_tree(&self) -> &crate::tree::SearchTree {
        self.search.tree()
    }

    pub fn set_config(&mut self, config: SearchConfig) -> Result<(), ConfigError> {
        let base_depth = config.base_depth;
        self.search.set_config(config)?;
        if !self.search.is_searching() {
            self.nominal_base_depth = base_depth;
        }
        Ok(())
    }

    pub fn config(&self) -> &SearchConfig {
        self.search.config()
    }

    pub fn reset(&mut self) {
        self.invalidate_plan();
        self.search.reset();
        self.last_root_hash = 0;
        self.total_planning_ms = 0.0;
        self.iterations = 0;
    }

    fn extract_alternatives(&self, primary: &Action) -> Vec<Action> {
        let tree = self.search.tree();
        let root = tree.get(tree.root());

        // Highest value first; child lists are action-ordered and the
        // heap pops equal priorities in insertion order, so ties resolve
        // by the action total order.
        let mut ranked: DetHeap<i32, Action> = DetHeap::new();
        for &id in &root.children {
            let node = tree.get(id);
            if node.action != *primary {
                ranked.push(node.value.raw(), node.action);
            }
        }

        let mut alternatives = Vec::new();
        while alternatives.len() < MAX_ALTERNATIVES {
            match ranked.pop() {
                Some(action) => alternatives.push(action),
                None => break,
            }
        }
        alternatives
    }
}

impl Default for Planner {
    fn default() -> Self {
        Self::new()
    }
}

/// Confidence blends lookahead depth, time invested, and decisiveness of
/// the evaluation, each clamped to [0, 1].
fn compute_confidence(result: &SearchResult) -> Q {
    let depth_factor = (result.depth_reached as f32 / 10.0).clamp(0.0, 1.0);
    let time_factor = (result.elapsed_ms as f32 / 1000.0).clamp(0.0, 1.0);
    let eval_factor = result.evaluation.to_float().abs().clamp(0.0, 1.0);

    let confidence = 0.4 * depth_factor + 0.3 * time_factor + 0.3 * eval_factor;
    Q::from_float(confidence.clamp(0.0, 1.0))
}
