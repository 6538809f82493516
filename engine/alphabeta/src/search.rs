//! The search engine.
//!
//! Iterative-deepening alpha-beta with principal-variation search,
//! quiescence, null-move pruning, late-move reductions, aspiration
//! windows, and an entropy-driven adaptive depth policy. The driver is
//! incremental: `search_step` runs until the per-call frame budget is
//! spent and returns whether the search finished, so a host can spread
//! one search across many frames without threads.

use std::time::Instant;

use tracing::{debug, trace};

use search_core::{Action, GameState, Q, FLAG_CAPTURE, FLAG_FORCING};

use crate::config::{ConfigError, SearchConfig};
use crate::heuristics::Evaluator;
use crate::node::flags;
use crate::ordering::MoveOrderer;
use crate::tree::SearchTree;
use crate::tt::{Bound, TranspositionTable, TtEntry};

/// Buffer below the raw i32 ceiling so score adjustments cannot overflow.
pub const EVAL_SAFETY_MARGIN: i32 = 1000;

/// Raw value used as the search infinity.
pub const EVAL_INF: i32 = i32::MAX - EVAL_SAFETY_MARGIN;

/// Raw value band for mate scores, kept distinct from infinity.
pub const EVAL_MATE: i32 = EVAL_INF - EVAL_SAFETY_MARGIN;

/// Longest principal variation the driver extracts.
const PV_LIMIT: usize = 20;

/// Outcome of a search, updated after every completed depth.
#[derive(Debug, Clone, Default)]
pub struct SearchResult {
    pub best_action: Action,
    pub evaluation: Q,
    pub principal_variation: Vec<Action>,
    pub nodes_searched: u64,
    pub depth_reached: i32,
    pub elapsed_ms: f64,
    pub tt_hit_rate: f32,
    pub completed: bool,
    pub entropy: Q,
}

/// Deterministic frame-budgeted alpha-beta search.
pub struct AlphaBetaSearch {
    config: SearchConfig,
    tt: TranspositionTable,
    tree: SearchTree,
    orderer: MoveOrderer,
    searching: bool,
    cancel: bool,
    current_depth: i32,
    nodes_searched: u64,
    start: Option<Instant>,
    current_pv: Vec<Action>,
    last_result: SearchResult,
}

impl AlphaBetaSearch {
    pub fn new() -> Self {
        Self::build(SearchConfig::default())
    }

    /// Construct with a validated configuration.
    pub fn with_config(config: SearchConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: SearchConfig) -> Self {
        let tt = TranspositionTable::with_size_mb(config.tt_size_mb);
        Self {
            config,
            tt,
            tree: SearchTree::new(0),
            orderer: MoveOrderer::new(),
            searching: false,
            cancel: false,
            current_depth: 0,
            nodes_searched: 0,
            start: None,
            current_pv: Vec::new(),
            last_result: SearchResult::default(),
        }
    }

    pub fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// Replace the configuration. Rejected values leave the previous
    /// configuration untouched; while a search is in progress the call is
    /// a no-op.
    pub fn set_config(&mut self, config: SearchConfig) -> Result<(), ConfigError> {
        if self.searching {
            return Ok(());
        }
        config.validate()?;
        if config.tt_size_mb != self.config.tt_size_mb {
            self.tt = TranspositionTable::with_size_mb(config.tt_size_mb);
        }
        self.config = config;
        Ok(())
    }

    /// Per-step budget override used by the incremental planner. Bypasses
    /// the searching gate on purpose: the budget comes from the frame
    /// context, not from a caller reconfiguring mid-search.
    pub(crate) fn set_step_budget(&mut self, frame_budget_ms: f64, time_limit_ms: f64, base_depth: i32) {
        self.config.frame_budget_ms = frame_budget_ms.max(0.0);
        self.config.time_limit_ms = time_limit_ms.max(0.0);
        self.config.base_depth = base_depth.max(1).min(self.config.max_depth);
    }

    /// Drop all cached state: transposition table, tree, move ordering,
    /// and the last result.
    pub fn reset(&mut self) {
        self.cancel_search();
        self.tt.clear();
        self.orderer.clear();
        self.tree = SearchTree::new(0);
        self.current_pv.clear();
        self.last_result = SearchResult::default();
    }

    /// Request cancellation; the stop predicate picks it up at the next
    /// node boundary.
    pub fn cancel_search(&mut self) {
        self.cancel = true;
        self.searching = false;
    }

    pub fn is_searching(&self) -> bool {
        self.searching
    }

    /// Latest statistics, valid both mid-search and after completion.
    pub fn last_result(&self) -> &SearchResult {
        &self.last_result
    }

    /// Best action found so far, legal whenever at least one depth
    /// completed.
    pub fn best_action_so_far(&self) -> Action {
        self.last_result.best_action
    }

    /// The search tree, for debug enumeration and alternative extraction.
    pub fn tree(&self) -> &SearchTree {
        &self.tree
    }

    /// UCB-ordered child of a tree node, using the configured
    /// exploration constant. For tree consumers that balance
    /// exploration against the recorded values; the alpha-beta core
    /// itself never selects this way.
    pub fn select_child_ucb(&self, parent: crate::node::NodeId) -> Option<crate::node::NodeId> {
        self.tree
            .best_child_ucb(parent, self.config.exploration_constant)
    }

    /// Transposition table counters, for instrumentation.
    pub fn transposition_table(&self) -> &TranspositionTable {
        &self.tt
    }

    pub(crate) fn clear_move_ordering(&mut self) {
        self.orderer.clear();
    }

    /// Blocking convenience: run `begin_search` plus `search_step` until
    /// completion and return the result.
    pub fn search(&mut self, state: &dyn GameState, evaluator: &dyn Evaluator) -> SearchResult {
        self.begin_search(state, evaluator);
        while !self.search_step(state, evaluator) {}
        self.last_result.clone()
    }

    /// Reset per-search state and record the root entropy. The caller
    /// then drives `search_step` until it reports completion.
    pub fn begin_search(&mut self, state: &dyn GameState, evaluator: &dyn Evaluator) {
        self.searching = true;
        self.cancel = false;
        self.current_depth = 1;
        self.nodes_searched = 0;
        self.start = Some(Instant::now());
        self.tree = SearchTree::new(state.state_hash());
        self.current_pv.clear();
        self.last_result = SearchResult {
            entropy: evaluator.entropy(state),
            ..Default::default()
        };

        debug!(
            root_hash = state.state_hash(),
            entropy = self.last_result.entropy.to_float(),
            "search started"
        );
    }

    /// Run iterative deepening until the depth cap, the stop predicate,
    /// or the frame budget. Returns `true` when the search is finished
    /// (including degenerate roots); `false` means "call again next
    /// frame".
    pub fn search_step(&mut self, state: &dyn GameState, evaluator: &dyn Evaluator) -> bool {
        if !self.searching || self.cancel {
            self.searching = false;
            return true;
        }

        let step_start = Instant::now();

        let root_actions = state.legal_actions();
        if root_actions.is_empty() {
            self.last_result.evaluation = if state.is_terminal() {
                state.terminal_value()
            } else {
                Q::ZERO
            };
            self.last_result.best_action = Action::default();
            self.last_result.depth_reached = 1;
            self.last_result.elapsed_ms = self.elapsed_ms();
            self.last_result.completed = true;
            self.searching = false;
            debug!("search finished at an exhausted root");
            return true;
        }

        while self.current_depth <= self.config.max_depth && !self.should_stop() {
            let step_elapsed = step_start.elapsed().as_secs_f64() * 1000.0;
            if self.config.frame_budget_ms > 0.0 && step_elapsed >= self.config.frame_budget_ms {
                // Out of frame; resume at this depth next call.
                return false;
            }

            let mut depth = self.current_depth;
            if self.config.adaptive_depth {
                depth = self
                    .adaptive_depth(self.last_result.entropy)
                    .max(self.current_depth);
            }

            let value = self.search_root(state, depth, evaluator);

            if self.should_stop() {
                // The iteration in flight is discarded; the previous
                // completed depth stands.
                break;
            }

            self.last_result.depth_reached = self.current_depth;
            self.last_result.evaluation = value;
            self.last_result.nodes_searched = self.nodes_searched;
            self.last_result.elapsed_ms = self.elapsed_ms();
            self.last_result.tt_hit_rate = self.tt.hit_rate();

            self.current_pv = self.tree.principal_variation(PV_LIMIT);
            self.tree.mark_principal_variation(&self.current_pv);
            self.last_result.principal_variation = self.current_pv.clone();
            if let Some(&first) = self.current_pv.first() {
                self.last_result.best_action = first;
            }

            trace!(
                depth = self.current_depth,
                value = value.to_float(),
                nodes = self.nodes_searched,
                "iteration complete"
            );

            self.orderer.age_history();
            self.current_depth += 1;
        }

        self.last_result.completed = !self.cancel;
        self.searching = false;

        debug!(
            depth = self.last_result.depth_reached,
            nodes = self.last_result.nodes_searched,
            time_ms = self.last_result.elapsed_ms,
            eval = self.last_result.evaluation.to_float(),
            "search complete"
        );

        true
    }

    /// One full-width iteration over the root moves, with aspiration
    /// windows and principal-variation search.
    fn search_root(&mut self, state: &dyn GameState, depth: i32, evaluator: &dyn Evaluator) -> Q {
        let mut actions = state.legal_actions();

        if actions.is_empty() {
            return if state.is_terminal() {
                state.terminal_value()
            } else {
                Q::ZERO
            };
        }

        // A forced move needs no search, just a value for the caller.
        // The tree still gets the child so PV extraction stays
        // consistent with the searched paths.
        if actions.len() == 1 {
            self.last_result.best_action = actions[0];
            return match state.apply(&actions[0]) {
                Some(child) => {
                    let value = -evaluator.evaluate(&*child);
                    self.update_root_child(&actions[0], value, &*child);
                    value
                }
                None => Q::ZERO,
            };
        }

        let hash_move = self.current_pv.first().copied();
        self.orderer.order(&mut actions, 0, hash_move.as_ref());

        let mut alpha = Q::from_raw(-EVAL_INF);
        let mut beta = Q::from_raw(EVAL_INF);

        let previous_eval = self.last_result.evaluation;
        let window = self.config.aspiration_window;
        let aspiration = self.config.use_aspiration_windows
            && self.current_depth > 1
            && previous_eval.raw() != 0;
        if aspiration {
            alpha = previous_eval - window;
            beta = previous_eval + window;
        }

        let mut best_action = actions[0];
        let mut best_value = Q::from_raw(-EVAL_INF);

        for (index, action) in actions.iter().enumerate() {
            if self.should_stop() {
                break;
            }

            let Some(child) = state.apply(action) else {
                continue;
            };

            let value = if index == 0 {
                -self.alpha_beta(&*child, depth - 1, -beta, -alpha, 1, false, evaluator)
            } else {
                let mut value = -self.alpha_beta(
                    &*child,
                    depth - 1,
                    Q::from_raw(-(alpha.raw() + 1)),
                    -alpha,
                    1,
                    false,
                    evaluator,
                );
                if value > alpha && value < beta {
                    value =
                        -self.alpha_beta(&*child, depth - 1, -beta, -alpha, 1, false, evaluator);
                }
                value
            };

            if value > best_value {
                best_value = value;
                best_action = *action;
                self.update_root_child(action, value, &*child);
            }

            if value > alpha {
                alpha = value;
            }

            if alpha >= beta {
                self.orderer.record_killer(action, 0);
                self.orderer.record_history(action, depth);
                break;
            }
        }

        // Aspiration misses on either side trigger a full-window pass.
        if aspiration
            && (best_value <= previous_eval - window || best_value >= previous_eval + window)
        {
            trace!(
                value = best_value.to_float(),
                "aspiration window failed, re-searching full width"
            );

            alpha = Q::from_raw(-EVAL_INF);
            beta = Q::from_raw(EVAL_INF);
            best_value = Q::from_raw(-EVAL_INF);

            for action in &actions {
                if self.should_stop() {
                    break;
                }

                let Some(child) = state.apply(action) else {
                    continue;
                };

                let value =
                    -self.alpha_beta(&*child, depth - 1, -beta, -alpha, 1, false, evaluator);

                if value > best_value {
                    best_value = value;
                    best_action = *action;
                    self.update_root_child(action, value, &*child);
                }

                if value > alpha {
                    alpha = value;
                }

                if alpha >= beta {
                    self.orderer.record_killer(action, 0);
                    self.orderer.record_history(action, depth);
                    break;
                }
            }
        }

        self.tt.store(TtEntry {
            state_hash: state.state_hash(),
            value: best_value,
            best_action,
            depth,
            bound: Bound::Exact,
        });

        self.last_result.best_action = best_action;
        best_value
    }

    /// Keep the root's child list current for PV extraction and the
    /// planner's alternatives.
    fn update_root_child(&mut self, action: &Action, value: Q, child_state: &dyn GameState) {
        let root = self.tree.root();
        let child_id = match self.tree.find_child(root, action) {
            Some(id) => id,
            None => self.tree.add_child(root, *action),
        };

        let node = self.tree.get_mut(child_id);
        node.value = value;
        node.value_sum = node.value_sum + value;
        node.visits += 1;
        node.state_hash = child_state.state_hash();
        if child_state.is_terminal() {
            node.set_flag(flags::TERMINAL);
        }
    }

    /// Fail-soft alpha-beta.
    #[allow(clippy::too_many_arguments)]
    fn alpha_beta(
        &mut self,
        state: &dyn GameState,
        depth: i32,
        mut alpha: Q,
        beta: Q,
        ply: i32,
        is_null: bool,
        evaluator: &dyn Evaluator,
    ) -> Q {
        self.nodes_searched += 1;

        if self.should_stop() {
            return Q::ZERO;
        }

        if state.is_terminal() {
            return mate_adjust(state.terminal_value(), ply);
        }

        if depth <= 0 {
            return self.quiescence(state, alpha, beta, 0, evaluator);
        }

        let hash = state.state_hash();
        let mut tt_action: Option<Action> = None;
        if let Some(entry) = self.tt.probe(hash) {
            if !entry.best_action.is_empty() {
                tt_action = Some(entry.best_action);
            }
            if entry.depth >= depth {
                match entry.bound {
                    Bound::Exact => return entry.value,
                    Bound::LowerBound if entry.value >= beta => return entry.value,
                    Bound::UpperBound if entry.value <= alpha => return entry.value,
                    _ => {}
                }
            }
        }

        let mut actions = state.legal_actions();
        if actions.is_empty() {
            // No moves but not terminal: stalemate.
            return Q::ZERO;
        }

        // Null-move pruning: if passing still refutes beta at reduced
        // depth, the position is good enough to cut. Only attempted with
        // wide branching, where zugzwang-like traps are unlikely.
        if self.config.use_null_move
            && !is_null
            && depth >= self.config.null_move_reduction + 1
            && actions.len() > 5
        {
            let reduction = self.config.null_move_reduction;
            let null_value = -self.alpha_beta(
                state,
                depth - reduction - 1,
                -beta,
                Q::from_raw(-(beta.raw() - 1)),
                ply + 1,
                true,
                evaluator,
            );
            if null_value >= beta {
                return beta;
            }
        }

        self.orderer.order(&mut actions, ply, tt_action.as_ref());

        let mut best_action = actions[0];
        let mut best_value = Q::from_raw(-EVAL_INF);
        let mut bound = Bound::UpperBound;

        for (index, action) in actions.iter().enumerate() {
            if self.should_stop() {
                break;
            }

            let value = match state.apply(action) {
                Some(child) => {
                    self.search_move(&*child, depth, alpha, beta, ply, index, action, evaluator)
                }
                // Adapter could not produce a successor: dead end.
                None => Q::ZERO,
            };

            if value > best_value {
                best_value = value;
                best_action = *action;
            }

            if value > alpha {
                alpha = value;
                bound = Bound::Exact;
            }

            if alpha >= beta {
                self.orderer.record_killer(action, ply);
                self.orderer.record_history(action, depth);
                bound = Bound::LowerBound;
                break;
            }
        }

        self.tt.store(TtEntry {
            state_hash: hash,
            value: best_value,
            best_action,
            depth,
            bound,
        });

        best_value
    }

    /// Window selection for one child: late-move reduction when eligible,
    /// otherwise principal-variation search.
    #[allow(clippy::too_many_arguments)]
    fn search_move(
        &mut self,
        child: &dyn GameState,
        depth: i32,
        alpha: Q,
        beta: Q,
        ply: i32,
        index: usize,
        action: &Action,
        evaluator: &dyn Evaluator,
    ) -> Q {
        let null_alpha = Q::from_raw(-(alpha.raw() + 1));

        let reduce = self.config.use_lmr
            && index >= 4
            && depth >= 3
            && action.type_flags & (FLAG_CAPTURE | FLAG_FORCING) == 0;

        if reduce {
            let reduction = match index {
                4..=5 => 1,
                6..=11 => 2,
                _ => 3,
            };

            let value = -self.alpha_beta(
                child,
                depth - 1 - reduction,
                null_alpha,
                -alpha,
                ply + 1,
                false,
                evaluator,
            );
            if value > alpha {
                return -self.alpha_beta(child, depth - 1, -beta, -alpha, ply + 1, false, evaluator);
            }
            return value;
        }

        if index > 0 {
            let value =
                -self.alpha_beta(child, depth - 1, null_alpha, -alpha, ply + 1, false, evaluator);
            if value > alpha && value < beta {
                return -self.alpha_beta(child, depth - 1, -beta, -alpha, ply + 1, false, evaluator);
            }
            return value;
        }

        -self.alpha_beta(child, depth - 1, -beta, -alpha, ply + 1, false, evaluator)
    }

    /// Capture-only extension to a quiet position.
    fn quiescence(
        &mut self,
        state: &dyn GameState,
        mut alpha: Q,
        beta: Q,
        qdepth: i32,
        evaluator: &dyn Evaluator,
    ) -> Q {
        self.nodes_searched += 1;

        if self.should_stop() || qdepth >= self.config.quiescence_depth {
            return evaluator.evaluate(state);
        }

        let stand_pat = evaluator.evaluate(state);
        if stand_pat >= beta {
            return beta;
        }
        if stand_pat > alpha {
            alpha = stand_pat;
        }

        let mut tactical: Vec<Action> = state
            .legal_actions()
            .into_iter()
            .filter(Action::is_capture)
            .collect();
        // Most valuable victim first; stable, so generation order breaks ties.
        tactical.sort_by(|a, b| b.static_score.cmp(&a.static_score));

        let delta_margin = Q::from_float(0.2);

        for action in &tactical {
            if self.should_stop() {
                break;
            }

            // Delta pruning: even a clean capture cannot lift alpha.
            if stand_pat + action.static_score + delta_margin < alpha {
                continue;
            }

            let Some(child) = state.apply(action) else {
                continue;
            };

            let value = -self.quiescence(&*child, -beta, -alpha, qdepth + 1, evaluator);
            if value >= beta {
                return beta;
            }
            if value > alpha {
                alpha = value;
            }
        }

        alpha
    }

    fn should_stop(&self) -> bool {
        self.cancel
            || (self.config.time_limit_ms > 0.0 && self.elapsed_ms() >= self.config.time_limit_ms)
    }

    fn elapsed_ms(&self) -> f64 {
        self.start
            .map(|start| start.elapsed().as_secs_f64() * 1000.0)
            .unwrap_or(0.0)
    }

    /// Entropy policy: clear positions deserve deeper lines, chaotic ones
    /// a wider but shallower look. The extension never pierces the
    /// absolute depth cap.
    fn adaptive_depth(&self, entropy: Q) -> i32 {
        let target = if entropy < self.config.low_entropy_threshold {
            self.config.base_depth + 2
        } else if entropy > self.config.high_entropy_threshold {
            (self.config.base_depth - 2).max(4)
        } else {
            self.config.base_depth
        };
        target.min(self.config.max_depth)
    }
}

impl Default for AlphaBetaSearch {
    fn default() -> Self {
        Self::new()
    }
}

/// Shift a mate-band score by ply so shorter mates dominate.
#[inline]
fn mate_adjust(value: Q, ply: i32) -> Q {
    let raw = value.raw();
    if raw > EVAL_MATE - 100 {
        Q::from_raw(raw - ply)
    } else if raw < -EVAL_MATE + 100 {
        Q::from_raw(raw + ply)
    } else {
        value
    }
}
