//! The game-state capability set the engine consumes.

use std::any::Any;

use crate::action::Action;
use crate::fixed::Q;

/// Object-safe capability trait a domain adapter implements.
///
/// The engine treats states as immutable values: `apply` returns a new
/// owned state and must succeed for any action the state itself listed as
/// legal. An adapter that cannot produce a successor (internal failure)
/// returns `None`, which the search treats as a dead end at that node.
pub trait GameState {
    /// Stable hash over every field that alters legal actions or values.
    /// Must stay constant for the lifetime of one state instance.
    fn state_hash(&self) -> u64;

    /// Legal actions in a deterministic order, with `action_id` assigned
    /// 0..N-1 in that order.
    fn legal_actions(&self) -> Vec<Action>;

    /// Functional update: the owned successor state after `action`.
    fn apply(&self, action: &Action) -> Option<Box<dyn GameState>>;

    fn is_terminal(&self) -> bool;

    /// Value of a terminal state from the active agent's perspective.
    /// Only meaningful when `is_terminal` returns true.
    fn terminal_value(&self) -> Q;

    /// Identifier of the agent to act.
    fn active_agent(&self) -> i32;

    /// Owned copy of this state.
    fn clone_state(&self) -> Box<dyn GameState>;

    /// Concrete-type access for domain feature extractors.
    fn as_any(&self) -> &dyn Any;
}
