//! Deterministic frame-budgeted alpha-beta search.
//!
//! This crate implements a tactical decision engine for turn-based
//! agents: iterative-deepening alpha-beta with principal-variation
//! search, quiescence, a transposition table, killer/history move
//! ordering, null-move pruning, late-move reductions, aspiration
//! windows, and an entropy-driven adaptive depth policy. A planner wraps
//! the engine and advances it one frame budget at a time.
//!
//! The defining property is bit-exact reproducibility: the same root
//! state under the same configuration and move-ordering history yields
//! the same action on every machine, every run. All decision-affecting
//! arithmetic flows through the fixed-point scalar from `search-core`,
//! and every container a decision reads iterates in insertion order.
//!
//! # Usage
//!
//! ```rust,ignore
//! use alphabeta::{Planner, PlanningContext, SearchConfig};
//! use alphabeta::heuristics::FeatureSet;
//!
//! let mut planner = Planner::new();
//! planner.initialize(Box::new(FeatureSet::new()), SearchConfig::default())?;
//!
//! // Once per frame, until the plan is ready:
//! let context = PlanningContext::new(&state);
//! if planner.plan_step(&context) {
//!     let plan = planner.planned_action();
//!     println!("primary: {}->{}", plan.primary.from, plan.primary.to);
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Planner                            │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌──────────────┐  ┌──────────────┐  ┌───────────────────┐  │
//! │  │ AlphaBeta    │  │ SearchTree   │  │ TranspositionTable│  │
//! │  │ Search       │  │ (arena)      │  │ (direct-mapped)   │  │
//! │  └──────┬───────┘  └──────┬───────┘  └─────────┬─────────┘  │
//! │         │                 │                    │            │
//! │         ▼                 ▼                    ▼            │
//! │  ┌───────────────────────────────────────────────────────┐  │
//! │  │  deepen → order → alpha-beta → quiescence → extract   │  │
//! │  └───────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod coordinator;
pub mod heuristics;
pub mod node;
pub mod ordering;
pub mod planner;
pub mod report;
pub mod search;
pub mod tree;
pub mod tt;

// Re-export main types
pub use config::{ConfigError, SearchConfig};
pub use coordinator::MultiAgentCoordinator;
pub use heuristics::{Evaluator, Feature, FeatureSet, Phase, PhaseDetector, PhasedEvaluator};
pub use node::{NodeId, SearchNode};
pub use ordering::MoveOrderer;
pub use planner::{PlannedAction, Planner, PlanningContext};
pub use report::{describe_tree, result_to_json, validate_determinism, SearchReport};
pub use search::{AlphaBetaSearch, SearchResult, EVAL_INF, EVAL_MATE, EVAL_SAFETY_MARGIN};
pub use tree::SearchTree;
pub use tt::{Bound, TranspositionTable, TtEntry};
