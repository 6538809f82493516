//! Multi-agent coordination.
//!
//! Composes one search per agent over a shared insertion-ordered
//! blackboard. Phase one runs each agent's search in registration order
//! and posts the intended target; phase two checks the collected
//! intentions for conflicts. Everything iterates through `DetMap`, so
//! the whole round is deterministic.

use tracing::debug;

use search_core::{Action, DetMap, GameState, Q};

use crate::heuristics::Evaluator;
use crate::search::AlphaBetaSearch;

/// Coordinates independent per-agent searches.
pub struct MultiAgentCoordinator {
    agents: DetMap<i32, AlphaBetaSearch>,
    blackboard: DetMap<String, Q>,
}

impl MultiAgentCoordinator {
    pub fn new() -> Self {
        Self {
            agents: DetMap::new(),
            blackboard: DetMap::new(),
        }
    }

    /// Register an agent's search. Registration order fixes the search
    /// order for every later round.
    pub fn add_agent(&mut self, agent_id: i32, search: AlphaBetaSearch) {
        self.agents.insert(agent_id, search);
    }

    pub fn remove_agent(&mut self, agent_id: i32) {
        self.agents.remove(&agent_id);
    }

    pub fn agent_count(&self) -> usize {
        self.agents.len()
    }

    /// Run every registered agent's search against its own state view
    /// and return the chosen action per agent.
    pub fn coordinated_search(
        &mut self,
        agent_states: &DetMap<i32, Box<dyn GameState>>,
        evaluator: &dyn Evaluator,
    ) -> DetMap<i32, Action> {
        let mut intents: DetMap<i32, Action> = DetMap::new();

        // Phase 1: independent searches, intentions onto the blackboard.
        for (&agent_id, search) in self.agents.iter_mut() {
            let Some(state) = agent_states.get(&agent_id) else {
                continue;
            };

            let result = search.search(state.as_ref(), evaluator);
            if !result.best_action.is_empty() {
                self.blackboard.insert(
                    format!("agent_{agent_id}_target"),
                    Q::from_int(result.best_action.to as i32),
                );
            }
            intents.insert(agent_id, result.best_action);
        }

        // Phase 2: surface same-target conflicts. Agents keep their
        // choices; the blackboard lets a caller re-plan the losers.
        let mut results: DetMap<i32, Action> = DetMap::new();
        for (&agent_id, action) in intents.iter() {
            let conflict = intents.iter().any(|(&other_id, other)| {
                other_id != agent_id && !action.is_empty() && other.to == action.to
            });
            if conflict {
                debug!(agent_id, target = action.to, "target contested by another agent");
            }
            results.insert(agent_id, *action);
        }

        results
    }

    /// Post an advisory value for other agents to read.
    pub fn update_blackboard(&mut self, key: impl Into<String>, value: Q) {
        self.blackboard.insert(key.into(), value);
    }

    /// Read an advisory value; missing keys are neutral.
    pub fn read_blackboard(&self, key: &str) -> Q {
        self.blackboard
            .iter()
            .find(|(k, _)| k.as_str() == key)
            .map(|(_, v)| *v)
            .unwrap_or(Q::ZERO)
    }
}

impl Default for MultiAgentCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
