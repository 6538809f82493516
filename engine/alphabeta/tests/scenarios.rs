//! End-to-end planning scenarios against purpose-built micro-domains.
//!
//! Each adapter here is deliberately trivial: a table of scripted nodes
//! (optionally sharing successors, for transposition coverage) or a
//! fixed-branching counter game for frame-slicing pressure.

use std::any::Any;
use std::cell::Cell;
use std::rc::Rc;

use alphabeta::heuristics::{Evaluator, FeatureSet};
use alphabeta::{
    validate_determinism, AlphaBetaSearch, Planner, PlanningContext, SearchConfig, EVAL_MATE,
};
use search_core::{Action, GameState, Q, FLAG_CAPTURE};

// ---------------------------------------------------------------------------
// Scripted graph fixture
// ---------------------------------------------------------------------------

#[derive(Clone)]
struct ScriptNode {
    terminal: Option<Q>,
    moves: Vec<(Action, usize)>,
}

fn node(moves: Vec<(Action, usize)>) -> ScriptNode {
    ScriptNode {
        terminal: None,
        moves,
    }
}

fn leaf(value: Q) -> ScriptNode {
    ScriptNode {
        terminal: Some(value),
        moves: Vec::new(),
    }
}

/// Graph-shaped game: distinct indices may describe the same position
/// only through their index-derived hash, so two paths converging on one
/// index are a genuine transposition.
#[derive(Clone)]
struct Script {
    nodes: Rc<Vec<ScriptNode>>,
    at: usize,
}

impl Script {
    fn new(nodes: Vec<ScriptNode>) -> Self {
        Self {
            nodes: Rc::new(nodes),
            at: 0,
        }
    }
}

impl GameState for Script {
    fn state_hash(&self) -> u64 {
        0x5C21_9700 + self.at as u64
    }

    fn legal_actions(&self) -> Vec<Action> {
        self.nodes[self.at]
            .moves
            .iter()
            .enumerate()
            .map(|(id, (action, _))| {
                let mut action = *action;
                action.action_id = id as u32;
                action
            })
            .collect()
    }

    fn apply(&self, action: &Action) -> Option<Box<dyn GameState>> {
        self.nodes[self.at]
            .moves
            .iter()
            .find(|(candidate, _)| candidate == action)
            .map(|&(_, target)| {
                Box::new(Script {
                    nodes: Rc::clone(&self.nodes),
                    at: target,
                }) as Box<dyn GameState>
            })
    }

    fn is_terminal(&self) -> bool {
        self.nodes[self.at].terminal.is_some()
    }

    fn terminal_value(&self) -> Q {
        self.nodes[self.at].terminal.unwrap_or(Q::ZERO)
    }

    fn active_agent(&self) -> i32 {
        (self.at % 2) as i32
    }

    fn clone_state(&self) -> Box<dyn GameState> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Evaluator that counts its static-evaluation calls.
struct CountingEvaluator {
    calls: Cell<u64>,
}

impl CountingEvaluator {
    fn new() -> Self {
        Self {
            calls: Cell::new(0),
        }
    }

    fn calls(&self) -> u64 {
        self.calls.get()
    }
}

impl Evaluator for CountingEvaluator {
    fn evaluate(&self, _state: &dyn GameState) -> Q {
        self.calls.set(self.calls.get() + 1);
        Q::ZERO
    }
}

fn ready_planner(config: SearchConfig) -> Planner {
    let mut planner = Planner::new();
    planner
        .initialize(Box::new(FeatureSet::new()), config)
        .unwrap();
    planner
}

fn context(state: &dyn GameState) -> PlanningContext<'_> {
    PlanningContext {
        state: Some(state),
        frame_budget_ms: 0.0,
        available_time_ms: 0.0,
        urgent: false,
    }
}

// ---------------------------------------------------------------------------
// S1: single legal move
// ---------------------------------------------------------------------------

#[test]
fn single_legal_move_plans_immediately() {
    let state = Script::new(vec![
        node(vec![(Action::new(0, 1, 0), 1)]),
        leaf(Q::ZERO),
    ]);

    let mut planner = ready_planner(SearchConfig::for_testing());
    assert!(planner.plan_step(&context(&state)));

    let plan = planner.planned_action();
    assert_eq!(plan.primary, Action::new(0, 1, 0));
    assert!(plan.lookahead_depth >= 1);
    assert!(plan.confidence > Q::ZERO);

    // The forced move is also the principal variation of the report.
    let stats = planner.search_stats();
    assert_eq!(stats.principal_variation, vec![Action::new(0, 1, 0)]);
    assert_eq!(stats.best_action, stats.principal_variation[0]);
}

// ---------------------------------------------------------------------------
// S2: terminal at root
// ---------------------------------------------------------------------------

#[test]
fn terminal_root_produces_valid_empty_plan() {
    let state = Script::new(vec![leaf(Q::from_int(1))]);

    let mut planner = ready_planner(SearchConfig::for_testing());
    assert!(planner.plan_step(&context(&state)));

    assert!(planner.plan_valid());
    assert!(planner.planned_action().primary.is_empty());
    assert_eq!(planner.search_stats().evaluation, Q::ONE);
    assert!(planner.search_stats().completed);
}

// ---------------------------------------------------------------------------
// S3: forced capture
// ---------------------------------------------------------------------------

#[test]
fn capture_with_better_outcome_is_preferred() {
    // The quiet move holds the balance; the capture wins 0.8 after the
    // negamax flip.
    let state = Script::new(vec![
        node(vec![
            (Action::new(0, 1, 0), 1),
            (Action::new(0, 2, FLAG_CAPTURE), 2),
        ]),
        leaf(Q::ZERO),
        leaf(Q::from_float(-0.8)),
    ]);

    let config = SearchConfig {
        base_depth: 2,
        max_depth: 2,
        ..SearchConfig::for_testing()
    };
    let mut planner = ready_planner(config);
    while !planner.plan_step(&context(&state)) {}

    let plan = planner.planned_action();
    assert_eq!(plan.primary, Action::new(0, 2, FLAG_CAPTURE));
    assert!(plan.expected_value > Q::from_float(0.5));
}

// ---------------------------------------------------------------------------
// S4: shorter mate preferred
// ---------------------------------------------------------------------------

#[test]
fn shorter_mate_dominates_longer_mate() {
    let mated = Q::from_raw(-EVAL_MATE);

    // Line A: forced mate at ply 3. Line B: forced mate at ply 5.
    let state = Script::new(vec![
        node(vec![
            (Action::new(0, 1, 0), 1),
            (Action::new(0, 2, 0), 4),
        ]),
        // Line A
        node(vec![(Action::new(1, 9, 0), 2)]),
        node(vec![(Action::new(9, 1, 0), 3)]),
        leaf(mated),
        // Line B
        node(vec![(Action::new(2, 9, 0), 5)]),
        node(vec![(Action::new(9, 2, 0), 6)]),
        node(vec![(Action::new(2, 8, 0), 7)]),
        node(vec![(Action::new(8, 2, 0), 8)]),
        leaf(mated),
    ]);

    let config = SearchConfig {
        base_depth: 6,
        max_depth: 6,
        ..SearchConfig::for_testing()
    };
    let mut search = AlphaBetaSearch::with_config(config).unwrap();
    let result = search.search(&state, &FeatureSet::new());

    assert!(result.completed);
    assert_eq!(result.principal_variation[0], Action::new(0, 1, 0));
    assert_eq!(result.best_action, Action::new(0, 1, 0));
    // Ply-adjusted mate score: three plies off the sentinel.
    assert_eq!(result.evaluation.raw(), EVAL_MATE - 3);
}

// ---------------------------------------------------------------------------
// S5: transposition reuse
// ---------------------------------------------------------------------------

/// Build the `[a,b] / [c,d]` diamond. With `share = true` both sequences
/// land on one node; otherwise the tail is duplicated under distinct
/// hashes.
fn diamond(share: bool) -> Script {
    let mut nodes = vec![
        node(vec![
            (Action::new(0, 1, 0), 1),
            (Action::new(0, 2, 0), 2),
        ]),
        node(vec![(Action::new(1, 3, 0), 3)]),
        node(vec![(Action::new(2, 3, 0), if share { 3 } else { 6 })]),
        // Shared tail: two quiet plies before a leaf.
        node(vec![(Action::new(3, 4, 0), 4)]),
        node(vec![(Action::new(4, 5, 0), 5)]),
        leaf(Q::from_float(-0.25)),
    ];
    if !share {
        nodes.extend([
            node(vec![(Action::new(3, 4, 0), 7)]),
            node(vec![(Action::new(4, 5, 0), 8)]),
            leaf(Q::from_float(-0.25)),
        ]);
    }
    Script::new(nodes)
}

#[test]
fn transposition_hit_skips_reevaluation() {
    let config = SearchConfig {
        base_depth: 3,
        max_depth: 3,
        ..SearchConfig::for_testing()
    };

    let shared = diamond(true);
    let shared_evaluator = CountingEvaluator::new();
    let mut search = AlphaBetaSearch::with_config(config.clone()).unwrap();
    search.search(&shared, &shared_evaluator);

    assert!(search.transposition_table().probes() > 0);
    assert!(
        search.transposition_table().hits() > 0,
        "converging paths must hit the table"
    );

    let split = diamond(false);
    let split_evaluator = CountingEvaluator::new();
    let mut search = AlphaBetaSearch::with_config(config).unwrap();
    search.search(&split, &split_evaluator);

    assert!(
        shared_evaluator.calls() < split_evaluator.calls(),
        "transposition must spare the evaluator: {} vs {}",
        shared_evaluator.calls(),
        split_evaluator.calls()
    );
}

// ---------------------------------------------------------------------------
// S6: frame slicing
// ---------------------------------------------------------------------------

/// Fixed-branching counter game, deep enough that a 1 ms frame cannot
/// finish the search in one step.
#[derive(Clone)]
struct Cascade {
    trail: u64,
    depth: u32,
    limit: u32,
}

impl Cascade {
    fn new(limit: u32) -> Self {
        Self {
            trail: 1,
            depth: 0,
            limit,
        }
    }
}

impl GameState for Cascade {
    fn state_hash(&self) -> u64 {
        self.trail
            .wrapping_mul(0x9E37_79B9_7F4A_7C15)
            .wrapping_add(self.depth as u64)
            | 1
    }

    fn legal_actions(&self) -> Vec<Action> {
        (0..4u32)
            .map(|i| {
                let mut action = Action::new(self.depth, self.depth * 8 + i + 1, 0);
                action.action_id = i;
                action
            })
            .collect()
    }

    fn apply(&self, action: &Action) -> Option<Box<dyn GameState>> {
        Some(Box::new(Cascade {
            trail: self.trail.wrapping_mul(5).wrapping_add(action.to as u64),
            depth: self.depth + 1,
            limit: self.limit,
        }))
    }

    fn is_terminal(&self) -> bool {
        self.depth >= self.limit
    }

    fn terminal_value(&self) -> Q {
        let spread = (self.state_hash() % 4001) as i32 - 2000;
        Q::from_raw(spread * 8)
    }

    fn active_agent(&self) -> i32 {
        (self.depth % 2) as i32
    }

    fn clone_state(&self) -> Box<dyn GameState> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[test]
fn frame_sliced_search_completes_and_always_has_a_move() {
    let state = Cascade::new(12);
    let legal = state.legal_actions();

    let config = SearchConfig {
        base_depth: 12,
        max_depth: 12,
        frame_budget_ms: 1.0,
        time_limit_ms: 200.0,
        tt_size_mb: 8,
        adaptive_depth: false,
        ..SearchConfig::default()
    };
    let mut search = AlphaBetaSearch::with_config(config).unwrap();
    let evaluator = FeatureSet::new();

    search.begin_search(&state, &evaluator);

    let mut steps = 0u32;
    loop {
        let complete = search.search_step(&state, &evaluator);
        steps += 1;

        if search.last_result().depth_reached >= 1 {
            let best = search.best_action_so_far();
            assert!(
                legal.contains(&best),
                "best-so-far must stay legal at step {steps}"
            );
        }

        if complete {
            break;
        }
        assert!(steps < 100_000, "search never completed");
    }

    assert!(search.last_result().completed);
    assert!(search.last_result().depth_reached >= 1);
    assert!(search.last_result().nodes_searched > 0);
}

// ---------------------------------------------------------------------------
// Determinism self-check
// ---------------------------------------------------------------------------

#[test]
fn double_run_determinism_validates() {
    let state = diamond(true);
    let mut planner = ready_planner(SearchConfig::for_testing());
    assert!(validate_determinism(&mut planner, &state));
}

#[test]
fn identical_runs_produce_identical_statistics() {
    let state = Cascade::new(6);
    let config = SearchConfig {
        base_depth: 6,
        max_depth: 6,
        ..SearchConfig::for_testing()
    };

    let run = || {
        let mut search = AlphaBetaSearch::with_config(config.clone()).unwrap();
        search.search(&state, &FeatureSet::new())
    };

    let first = run();
    let second = run();

    assert_eq!(first.best_action, second.best_action);
    assert_eq!(first.evaluation, second.evaluation);
    assert_eq!(first.depth_reached, second.depth_reached);
    assert_eq!(first.nodes_searched, second.nodes_searched);
    assert_eq!(first.principal_variation, second.principal_variation);
}
