//! Tactical arena domain for the search engine.
//!
//! A small squad skirmish on a grid with walls, cover, high ground, and
//! objectives. Agents spend action points to move, attack along a line
//! of sight, or take cover; a team wins by eliminating the other. The
//! crate exists to exercise the engine end-to-end: it implements the
//! game-state capability set, an arena heuristic set, a phase detector,
//! and a scripted skirmish driver that plans every agent's actions with
//! a per-team planner.

use std::any::Any;

use tracing::{debug, info};

use alphabeta::heuristics::{Feature, FeatureSet, Phase, PhaseDetector};
use alphabeta::{PlannedAction, Planner, PlanningContext, SearchConfig, SearchResult};
use search_core::{Action, GameState, Q, FLAG_CAPTURE};

/// Attacks are the arena's captures: `type_flags` bit 0.
pub const ACTION_ATTACK: u32 = FLAG_CAPTURE;
/// Movement to an adjacent cell.
pub const ACTION_MOVE: u32 = 1 << 2;
/// Hunker down on a cover cell.
pub const ACTION_TAKE_COVER: u32 = 1 << 3;

pub const ARENA_WIDTH: i32 = 16;
pub const ARENA_HEIGHT: i32 = 16;

/// Terrain cell types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    Empty,
    Wall,
    Cover,
    HighGround,
    Objective,
}

/// One combatant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Agent {
    pub id: i32,
    pub team: i32,
    pub x: i32,
    pub y: i32,
    pub health: i32,
    pub max_health: i32,
    pub action_points: i32,
    pub max_action_points: i32,
    pub in_cover: bool,
    pub on_high_ground: bool,
}

impl Agent {
    pub fn new(id: i32, team: i32, x: i32, y: i32) -> Self {
        Self {
            id,
            team,
            x,
            y,
            health: 100,
            max_health: 100,
            action_points: 2,
            max_action_points: 2,
            in_cover: false,
            on_high_ground: false,
        }
    }

    #[inline]
    pub fn is_alive(&self) -> bool {
        self.health > 0
    }

    #[inline]
    fn position_index(&self) -> u32 {
        (self.y * ARENA_WIDTH + self.x) as u32
    }
}

/// Complete arena state: terrain, agents, whose turn it is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArenaState {
    grid: Vec<Cell>,
    agents: Vec<Agent>,
    active_agent: i32,
    turn: u32,
}

impl ArenaState {
    pub fn new() -> Self {
        Self {
            grid: vec![Cell::Empty; (ARENA_WIDTH * ARENA_HEIGHT) as usize],
            agents: Vec::new(),
            active_agent: 0,
            turn: 0,
        }
    }

    #[inline]
    fn grid_index(x: i32, y: i32) -> usize {
        (y * ARENA_WIDTH + x) as usize
    }

    #[inline]
    pub fn in_bounds(x: i32, y: i32) -> bool {
        x >= 0 && x < ARENA_WIDTH && y >= 0 && y < ARENA_HEIGHT
    }

    pub fn set_cell(&mut self, x: i32, y: i32, cell: Cell) {
        if Self::in_bounds(x, y) {
            self.grid[Self::grid_index(x, y)] = cell;
        }
    }

    /// Out-of-bounds cells read as walls.
    pub fn cell(&self, x: i32, y: i32) -> Cell {
        if Self::in_bounds(x, y) {
            self.grid[Self::grid_index(x, y)]
        } else {
            Cell::Wall
        }
    }

    pub fn add_agent(&mut self, agent: Agent) {
        self.agents.push(agent);
    }

    pub fn agent(&self, agent_id: i32) -> Option<&Agent> {
        self.agents.iter().find(|agent| agent.id == agent_id)
    }

    pub fn agent_mut(&mut self, agent_id: i32) -> Option<&mut Agent> {
        self.agents.iter_mut().find(|agent| agent.id == agent_id)
    }

    pub fn agents(&self) -> &[Agent] {
        &self.agents
    }

    pub fn set_active_agent(&mut self, agent_id: i32) {
        self.active_agent = agent_id;
    }

    pub fn advance_turn(&mut self) {
        self.turn += 1;
    }

    pub fn is_position_occupied(&self, x: i32, y: i32) -> bool {
        self.agents
            .iter()
            .any(|agent| agent.is_alive() && agent.x == x && agent.y == y)
    }

    /// Bresenham walk from (x1, y1) toward (x2, y2); walls block sight.
    pub fn has_line_of_sight(&self, x1: i32, y1: i32, x2: i32, y2: i32) -> bool {
        let dx = (x2 - x1).abs();
        let dy = (y2 - y1).abs();
        let sx = if x1 < x2 { 1 } else { -1 };
        let sy = if y1 < y2 { 1 } else { -1 };
        let mut err = dx - dy;

        let (mut x, mut y) = (x1, y1);
        while x != x2 || y != y2 {
            if self.cell(x, y) == Cell::Wall {
                return false;
            }
            let e2 = 2 * err;
            if e2 > -dy {
                err -= dy;
                x += sx;
            }
            if e2 < dx {
                err += dx;
                y += sy;
            }
        }

        true
    }

    #[inline]
    pub fn distance(x1: i32, y1: i32, x2: i32, y2: i32) -> i32 {
        (x2 - x1).abs() + (y2 - y1).abs()
    }

    /// Sum of a team's remaining health.
    pub fn team_score(&self, team: i32) -> i32 {
        self.agents
            .iter()
            .filter(|agent| agent.team == team)
            .map(|agent| agent.health)
            .sum()
    }

    pub fn alive_count(&self) -> usize {
        self.agents.iter().filter(|agent| agent.is_alive()).count()
    }

    fn damage_for(&self, attacker: &Agent, target: &Agent) -> i32 {
        let distance = Self::distance(attacker.x, attacker.y, target.x, target.y);
        let mut damage = 30 - distance * 2;
        if target.in_cover {
            damage /= 2;
        }
        if attacker.on_high_ground {
            damage = damage * 3 / 2;
        }
        damage
    }

    fn move_prior(&self, x: i32, y: i32) -> Q {
        match self.cell(x, y) {
            Cell::Cover => Q::from_float(0.5),
            Cell::HighGround => Q::from_float(0.6),
            Cell::Objective => Q::from_float(0.7),
            _ => Q::from_float(0.3),
        }
    }

    /// Activation always crosses to the opposing team so the engine's
    /// per-ply negation sees an alternating perspective: the next living
    /// opponent in cyclic id order, or the first opponent slot when the
    /// team is wiped out (terminal values then read from the loser's
    /// side).
    fn next_active_after(&self, actor_id: i32) -> i32 {
        let count = self.agents.len() as i32;
        let actor_team = self.agent(actor_id).map(|agent| agent.team).unwrap_or(0);

        let mut fallback = None;
        for offset in 1..=count {
            let id = (actor_id + offset).rem_euclid(count.max(1));
            let Some(agent) = self.agent(id) else {
                continue;
            };
            if agent.team == actor_team {
                continue;
            }
            if agent.is_alive() {
                return id;
            }
            if fallback.is_none() {
                fallback = Some(id);
            }
        }

        fallback.unwrap_or(actor_id)
    }
}

impl Default for ArenaState {
    fn default() -> Self {
        Self::new()
    }
}

const DIRECTIONS: [(i32, i32); 4] = [(-1, 0), (0, -1), (1, 0), (0, 1)];

impl GameState for ArenaState {
    fn state_hash(&self) -> u64 {
        let mut hash = fnv1a(0xcbf2_9ce4_8422_2325, &[self.active_agent as u8]);
        for cell in &self.grid {
            hash = fnv1a(hash, &[*cell as u8]);
        }
        for agent in &self.agents {
            hash = fnv1a(hash, &agent.id.to_le_bytes());
            hash = fnv1a(hash, &agent.x.to_le_bytes());
            hash = fnv1a(hash, &agent.y.to_le_bytes());
            hash = fnv1a(hash, &agent.health.to_le_bytes());
            hash = fnv1a(hash, &agent.action_points.to_le_bytes());
            hash = fnv1a(hash, &[agent.in_cover as u8, agent.on_high_ground as u8]);
        }
        fnv1a(hash, &self.turn.to_le_bytes()) | 1
    }

    fn legal_actions(&self) -> Vec<Action> {
        let mut actions = Vec::new();

        let Some(active) = self.agent(self.active_agent) else {
            return actions;
        };
        if !active.is_alive() || active.action_points <= 0 {
            return actions;
        }

        let from = active.position_index();

        // Moves into adjacent open cells.
        for (dx, dy) in DIRECTIONS {
            let (nx, ny) = (active.x + dx, active.y + dy);
            if !Self::in_bounds(nx, ny) {
                continue;
            }
            if self.cell(nx, ny) == Cell::Wall || self.is_position_occupied(nx, ny) {
                continue;
            }

            let mut action = Action::new(from, (ny * ARENA_WIDTH + nx) as u32, ACTION_MOVE);
            action.prior = self.move_prior(nx, ny);
            actions.push(action);
        }

        // Attacks on visible enemies.
        for target in &self.agents {
            if target.team == active.team || !target.is_alive() {
                continue;
            }
            if !self.has_line_of_sight(active.x, active.y, target.x, target.y) {
                continue;
            }

            let mut action = Action::new(from, target.position_index(), ACTION_ATTACK);
            let health_ratio = target.health as f32 / target.max_health as f32;
            action.prior = Q::from_float(0.8 - 0.3 * health_ratio);
            action.static_score = Q::from_int(self.damage_for(active, target));
            actions.push(action);
        }

        // Hunker down when standing on unused cover.
        if self.cell(active.x, active.y) == Cell::Cover && !active.in_cover {
            let mut action = Action::new(from, from, ACTION_TAKE_COVER);
            action.prior = Q::from_float(0.4);
            actions.push(action);
        }

        // Canonical order, then ids in that order.
        actions.sort();
        for (id, action) in actions.iter_mut().enumerate() {
            action.action_id = id as u32;
        }

        actions
    }

    fn apply(&self, action: &Action) -> Option<Box<dyn GameState>> {
        let mut next = self.clone();

        let active_id = next.active_agent;
        let active_team = next.agent(active_id)?.team;

        if action.type_flags & ACTION_MOVE != 0 {
            let nx = action.to as i32 % ARENA_WIDTH;
            let ny = action.to as i32 / ARENA_WIDTH;
            let on_high = next.cell(nx, ny) == Cell::HighGround;

            let agent = next.agent_mut(active_id)?;
            agent.x = nx;
            agent.y = ny;
            agent.in_cover = false;
            agent.on_high_ground = on_high;
        } else if action.type_flags & ACTION_ATTACK != 0 {
            let target_x = action.to as i32 % ARENA_WIDTH;
            let target_y = action.to as i32 / ARENA_WIDTH;
            let attacker = *next.agent(active_id)?;

            let target_index = next.agents.iter().position(|agent| {
                agent.x == target_x && agent.y == target_y && agent.team != active_team
            });
            if let Some(index) = target_index {
                let damage = next.damage_for(&attacker, &next.agents[index]).max(5);
                let target = &mut next.agents[index];
                target.health = (target.health - damage).max(0);
            }
        } else if action.type_flags & ACTION_TAKE_COVER != 0 {
            next.agent_mut(active_id)?.in_cover = true;
        }

        next.agent_mut(active_id)?.action_points -= 1;

        // Hand activation across; the incoming agent starts fresh.
        let incoming = next.next_active_after(active_id);
        next.active_agent = incoming;
        if let Some(agent) = next.agent_mut(incoming) {
            agent.action_points = agent.max_action_points;
        }

        Some(Box::new(next))
    }

    fn is_terminal(&self) -> bool {
        let team0_alive = self
            .agents
            .iter()
            .any(|agent| agent.is_alive() && agent.team == 0);
        let team1_alive = self
            .agents
            .iter()
            .any(|agent| agent.is_alive() && agent.team == 1);
        !team0_alive || !team1_alive
    }

    fn terminal_value(&self) -> Q {
        let Some(active) = self.agent(self.active_agent) else {
            return Q::ZERO;
        };

        let mut my_team_alive = 0;
        let mut enemy_alive = 0;
        for agent in &self.agents {
            if agent.is_alive() {
                if agent.team == active.team {
                    my_team_alive += 1;
                } else {
                    enemy_alive += 1;
                }
            }
        }

        if my_team_alive > 0 && enemy_alive == 0 {
            Q::ONE
        } else if my_team_alive == 0 && enemy_alive > 0 {
            -Q::ONE
        } else {
            Q::ZERO
        }
    }

    fn active_agent(&self) -> i32 {
        self.active_agent
    }

    fn clone_state(&self) -> Box<dyn GameState> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[inline]
fn fnv1a(mut hash: u64, bytes: &[u8]) -> u64 {
    for &byte in bytes {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x0000_0100_0000_01B3);
    }
    hash
}

// ---------------------------------------------------------------------------
// Heuristics
// ---------------------------------------------------------------------------

fn arena(state: &dyn GameState) -> Option<&ArenaState> {
    state.as_any().downcast_ref::<ArenaState>()
}

fn health_advantage(state: &dyn GameState) -> Q {
    let Some(arena) = arena(state) else {
        return Q::ZERO;
    };
    let Some(active) = arena.agent(arena.active_agent()) else {
        return Q::ZERO;
    };

    let mine = arena.team_score(active.team);
    let theirs = arena.team_score(1 - active.team);
    let total = mine + theirs;
    if total == 0 {
        return Q::ZERO;
    }

    Q::from_int(mine - theirs) / Q::from_int(total)
}

fn positional_advantage(state: &dyn GameState) -> Q {
    let Some(arena) = arena(state) else {
        return Q::ZERO;
    };
    let Some(active) = arena.agent(arena.active_agent()) else {
        return Q::ZERO;
    };

    let mut mine = 0;
    let mut theirs = 0;
    for agent in arena.agents() {
        if !agent.is_alive() {
            continue;
        }
        let mut value = 0;
        if arena.cell(agent.x, agent.y) == Cell::HighGround {
            value += 2;
        }
        if agent.in_cover {
            value += 1;
        }
        if agent.team == active.team {
            mine += value;
        } else {
            theirs += value;
        }
    }

    let total = mine + theirs;
    if total == 0 {
        return Q::ZERO;
    }

    (Q::from_int(mine - theirs) / Q::from_int(total)).clamp(-Q::ONE, Q::ONE)
}

fn objective_control(state: &dyn GameState) -> Q {
    let Some(arena) = arena(state) else {
        return Q::ZERO;
    };
    let Some(active) = arena.agent(arena.active_agent()) else {
        return Q::ZERO;
    };

    let mut objectives = 0;
    let mut mine = 0;
    let mut theirs = 0;
    for y in 0..ARENA_HEIGHT {
        for x in 0..ARENA_WIDTH {
            if arena.cell(x, y) != Cell::Objective {
                continue;
            }
            objectives += 1;
            for agent in arena.agents() {
                if agent.is_alive() && agent.x == x && agent.y == y {
                    if agent.team == active.team {
                        mine += 1;
                    } else {
                        theirs += 1;
                    }
                }
            }
        }
    }

    if objectives == 0 {
        return Q::ZERO;
    }

    Q::from_int(mine - theirs) / Q::from_int(objectives)
}

fn cover_utilization(state: &dyn GameState) -> Q {
    let Some(arena) = arena(state) else {
        return Q::ZERO;
    };
    match arena.agent(arena.active_agent()) {
        Some(active) if active.in_cover => Q::ONE,
        _ => Q::ZERO,
    }
}

fn threat_level(state: &dyn GameState) -> Q {
    let Some(arena) = arena(state) else {
        return Q::ZERO;
    };
    let Some(active) = arena.agent(arena.active_agent()) else {
        return Q::ZERO;
    };

    let mut visible_enemies = 0;
    for agent in arena.agents() {
        if !agent.is_alive() || agent.team == active.team {
            continue;
        }
        if arena.has_line_of_sight(active.x, active.y, agent.x, agent.y) {
            visible_enemies += 1;
        }
    }

    // Sightlines cut both ways: from cover or high ground they are
    // opportunities, in the open they are exposure.
    let balance = if active.in_cover || active.on_high_ground {
        visible_enemies
    } else {
        -visible_enemies
    };
    (Q::from_int(balance) / Q::from_int(3)).clamp(-Q::ONE, Q::ONE)
}

/// The standard arena evaluation: weighted health, position, objectives,
/// cover, and threat features.
pub fn arena_feature_set() -> FeatureSet {
    let mut set = FeatureSet::new();
    set.add_feature(Feature::new(
        "health_advantage",
        Q::from_float(0.3),
        health_advantage,
    ));
    set.add_feature(Feature::new(
        "positional_advantage",
        Q::from_float(0.25),
        positional_advantage,
    ));
    set.add_feature(Feature::new(
        "objective_control",
        Q::from_float(0.2),
        objective_control,
    ));
    set.add_feature(Feature::new(
        "cover_utilization",
        Q::from_float(0.15),
        cover_utilization,
    ));
    set.add_feature(Feature::new("threat_level", Q::from_float(0.1), threat_level));
    set
}

/// Phase by headcount: full squads are the opening, attrition the
/// endgame.
pub struct ArenaPhaseDetector;

impl PhaseDetector for ArenaPhaseDetector {
    fn detect(&self, state: &dyn GameState) -> Phase {
        let Some(arena) = arena(state) else {
            return Phase::Middlegame;
        };
        match arena.alive_count() {
            0..=2 => Phase::Endgame,
            3..=4 => Phase::Middlegame,
            _ => Phase::Opening,
        }
    }
}

// ---------------------------------------------------------------------------
// Skirmish driver
// ---------------------------------------------------------------------------

/// Scripted skirmish settings.
#[derive(Debug, Clone)]
pub struct SkirmishConfig {
    pub agents_per_team: i32,
    pub base_depth: i32,
    /// Per-decision wall-clock budget; 0 disables the clock so runs stay
    /// bit-identical across machines.
    pub search_time_ms: f64,
    pub max_turns: u32,
}

impl Default for SkirmishConfig {
    fn default() -> Self {
        Self {
            agents_per_team: 2,
            base_depth: 3,
            search_time_ms: 0.0,
            max_turns: 16,
        }
    }
}

/// Alternating-team skirmish where every decision comes from a planner.
pub struct Skirmish {
    config: SkirmishConfig,
    state: ArenaState,
    planners: Vec<Planner>,
    turn: u32,
    active_team: i32,
    history: Vec<SearchResult>,
    transcript: Vec<(i32, Action)>,
}

impl Skirmish {
    pub fn new(config: SkirmishConfig) -> Self {
        let search_config = SearchConfig {
            base_depth: config.base_depth,
            max_depth: config.base_depth + 4,
            time_limit_ms: config.search_time_ms,
            frame_budget_ms: 0.0,
            tt_size_mb: 4,
            ..Default::default()
        };

        let mut planners = Vec::new();
        for _ in 0..2 {
            let mut planner = Planner::new();
            planner
                .initialize(Box::new(arena_feature_set()), search_config.clone())
                .expect("skirmish search config is valid");
            planners.push(planner);
        }

        let mut skirmish = Self {
            config,
            state: ArenaState::new(),
            planners,
            turn: 0,
            active_team: 0,
            history: Vec::new(),
            transcript: Vec::new(),
        };
        skirmish.setup_arena();
        skirmish
    }

    /// Standard map: a wall down the middle, cover near each flank, high
    /// ground by the choke points, one objective per side.
    fn setup_arena(&mut self) {
        let state = &mut self.state;

        for y in 5..=10 {
            state.set_cell(7, y, Cell::Wall);
            state.set_cell(8, y, Cell::Wall);
        }

        for (x, y) in [(3, 3), (3, 12), (12, 3), (12, 12), (5, 7), (10, 8)] {
            state.set_cell(x, y, Cell::Cover);
        }
        state.set_cell(4, 8, Cell::HighGround);
        state.set_cell(11, 7, Cell::HighGround);
        state.set_cell(4, 4, Cell::Objective);
        state.set_cell(11, 11, Cell::Objective);

        for i in 0..self.config.agents_per_team {
            state.add_agent(Agent::new(i, 0, 2, 4 + i * 4));
        }
        for i in 0..self.config.agents_per_team {
            state.add_agent(Agent::new(
                self.config.agents_per_team + i,
                1,
                13,
                4 + i * 4,
            ));
        }

        state.set_active_agent(0);

        info!(
            agents_per_team = self.config.agents_per_team,
            base_depth = self.config.base_depth,
            "arena initialized"
        );
    }

    pub fn state(&self) -> &ArenaState {
        &self.state
    }

    pub fn history(&self) -> &[SearchResult] {
        &self.history
    }

    /// Every decision taken, in order: (agent id, action).
    pub fn transcript(&self) -> &[(i32, Action)] {
        &self.transcript
    }

    /// Plan one action for an agent with its team's planner.
    fn plan_agent_action(&mut self, agent_id: i32) -> PlannedAction {
        let Some(agent) = self.state.agent(agent_id).copied() else {
            return PlannedAction::default();
        };
        if !agent.is_alive() {
            return PlannedAction::default();
        }

        self.state.set_active_agent(agent_id);

        let planner = &mut self.planners[agent.team as usize];
        planner.reset();

        let context = PlanningContext {
            state: Some(&self.state),
            frame_budget_ms: 0.0,
            available_time_ms: self.config.search_time_ms,
            urgent: false,
        };
        while !planner.plan_step(&context) {}

        let plan = planner.planned_action();
        self.history.push(planner.search_stats().clone());

        debug!(
            agent_id,
            team = agent.team,
            from = plan.primary.from,
            to = plan.primary.to,
            confidence = plan.confidence.to_float(),
            depth = plan.lookahead_depth,
            "agent decision"
        );

        plan
    }

    /// Run one team's turn. Returns false once the game is over.
    pub fn run_turn(&mut self) -> bool {
        if self.state.is_terminal() || self.turn >= self.config.max_turns {
            return false;
        }

        self.turn += 1;
        self.state.advance_turn();

        for i in 0..self.config.agents_per_team {
            let agent_id = self.active_team * self.config.agents_per_team + i;
            let Some(agent) = self.state.agent(agent_id).copied() else {
                continue;
            };
            if !agent.is_alive() {
                continue;
            }

            if let Some(agent) = self.state.agent_mut(agent_id) {
                agent.action_points = agent.max_action_points;
            }

            while self
                .state
                .agent(agent_id)
                .map(|agent| agent.action_points > 0)
                .unwrap_or(false)
            {
                let plan = self.plan_agent_action(agent_id);
                if plan.primary.is_empty() {
                    break;
                }

                let Some(next) = self.state.apply(&plan.primary) else {
                    break;
                };
                self.transcript.push((agent_id, plan.primary));
                self.state = next
                    .as_any()
                    .downcast_ref::<ArenaState>()
                    .expect("arena apply returns an arena state")
                    .clone();

                if self.state.is_terminal() {
                    return false;
                }
            }
        }

        self.active_team = 1 - self.active_team;
        !self.state.is_terminal()
    }

    /// Play until a team wins or the turn cap is hit. Returns the
    /// winning team, if any.
    pub fn run_game(&mut self) -> Option<i32> {
        while self.run_turn() {}

        let team0 = self.state.team_score(0);
        let team1 = self.state.team_score(1);

        let total_nodes: u64 = self.history.iter().map(|result| result.nodes_searched).sum();
        info!(
            turns = self.turn,
            team0_health = team0,
            team1_health = team1,
            searches = self.history.len(),
            total_nodes,
            "skirmish finished"
        );

        match team0.cmp(&team1) {
            std::cmp::Ordering::Greater => Some(0),
            std::cmp::Ordering::Less => Some(1),
            std::cmp::Ordering::Equal => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alphabeta::heuristics::Evaluator;

    fn duel_state() -> ArenaState {
        let mut state = ArenaState::new();
        state.add_agent(Agent::new(0, 0, 2, 2));
        state.add_agent(Agent::new(1, 1, 5, 2));
        state.set_active_agent(0);
        state
    }

    #[test]
    fn test_action_ids_are_positional() {
        let state = duel_state();
        let actions = state.legal_actions();

        assert!(!actions.is_empty());
        for (index, action) in actions.iter().enumerate() {
            assert_eq!(action.action_id, index as u32);
        }
        // Canonical order.
        for pair in actions.windows(2) {
            assert!(pair[0] < pair[1]);
        }
    }

    #[test]
    fn test_attack_is_a_capture_with_damage_score() {
        let state = duel_state();
        let attack = state
            .legal_actions()
            .into_iter()
            .find(|action| action.type_flags == ACTION_ATTACK)
            .expect("enemy in line of sight");

        assert!(attack.is_capture());
        // Distance 3: 30 - 6 damage.
        assert_eq!(attack.static_score, Q::from_int(24));
        assert_eq!(attack.to, (2 * ARENA_WIDTH + 5) as u32);
    }

    #[test]
    fn test_walls_block_line_of_sight_and_movement() {
        let mut state = duel_state();
        state.set_cell(3, 2, Cell::Wall);
        state.set_cell(4, 2, Cell::Wall);

        assert!(!state.has_line_of_sight(2, 2, 5, 2));
        let actions = state.legal_actions();
        assert!(actions.iter().all(|action| !action.is_capture()));
        // The wall cell is not a legal move target.
        let wall_to = (2 * ARENA_WIDTH + 3) as u32;
        assert!(actions.iter().all(|action| action.to != wall_to));
    }

    #[test]
    fn test_apply_attack_reduces_health() {
        let state = duel_state();
        let attack = state
            .legal_actions()
            .into_iter()
            .find(|action| action.is_capture())
            .unwrap();

        let next = state.apply(&attack).unwrap();
        let next = next.as_any().downcast_ref::<ArenaState>().unwrap();

        assert_eq!(next.agent(1).unwrap().health, 76);
        assert_eq!(next.agent(0).unwrap().action_points, 1);
        // Functional update: the original is untouched.
        assert_eq!(state.agent(1).unwrap().health, 100);
    }

    #[test]
    fn test_cover_halves_damage() {
        let mut state = duel_state();
        state.agent_mut(1).unwrap().in_cover = true;

        let attack = state
            .legal_actions()
            .into_iter()
            .find(|action| action.is_capture())
            .unwrap();
        let next = state.apply(&attack).unwrap();
        let next = next.as_any().downcast_ref::<ArenaState>().unwrap();

        assert_eq!(next.agent(1).unwrap().health, 100 - 12);
    }

    #[test]
    fn test_take_cover_action() {
        let mut state = duel_state();
        state.set_cell(2, 2, Cell::Cover);

        let hunker = state
            .legal_actions()
            .into_iter()
            .find(|action| action.type_flags == ACTION_TAKE_COVER)
            .expect("standing on cover");

        let next = state.apply(&hunker).unwrap();
        let next = next.as_any().downcast_ref::<ArenaState>().unwrap();
        assert!(next.agent(0).unwrap().in_cover);

        // Already hunkered: no second take-cover action.
        assert!(next
            .legal_actions()
            .iter()
            .all(|action| action.type_flags != ACTION_TAKE_COVER));
    }

    #[test]
    fn test_exhausted_agent_has_no_actions() {
        let mut state = duel_state();
        state.agent_mut(0).unwrap().action_points = 0;
        assert!(state.legal_actions().is_empty());
    }

    #[test]
    fn test_terminal_on_team_elimination() {
        let mut state = duel_state();
        assert!(!state.is_terminal());

        state.agent_mut(1).unwrap().health = 0;
        assert!(state.is_terminal());
        assert_eq!(state.terminal_value(), Q::ONE);

        state.set_active_agent(1);
        assert_eq!(state.terminal_value(), -Q::ONE);
    }

    #[test]
    fn test_state_hash_tracks_changes() {
        let state = duel_state();
        let base = state.state_hash();
        assert_eq!(base, state.clone().state_hash());

        let mut moved = state.clone();
        moved.agent_mut(0).unwrap().x = 3;
        assert_ne!(base, moved.state_hash());

        let mut hurt = state.clone();
        hurt.agent_mut(1).unwrap().health = 50;
        assert_ne!(base, hurt.state_hash());

        let mut switched = state;
        switched.set_active_agent(1);
        assert_ne!(base, switched.state_hash());
    }

    #[test]
    fn test_health_advantage_feature() {
        let mut state = duel_state();
        assert_eq!(health_advantage(&state), Q::ZERO);

        state.agent_mut(1).unwrap().health = 50;
        // (100 - 50) / 150
        let expected = Q::from_int(50) / Q::from_int(150);
        assert_eq!(health_advantage(&state), expected);
    }

    #[test]
    fn test_arena_evaluation_in_range() {
        let set = arena_feature_set();
        let mut state = duel_state();
        state.agent_mut(1).unwrap().health = 10;
        state.agent_mut(0).unwrap().in_cover = true;

        let value = set.evaluate(&state);
        assert!(value >= -Q::ONE && value <= Q::ONE);
        assert!(value > Q::ZERO);
    }

    #[test]
    fn test_phase_detector_by_headcount() {
        let detector = ArenaPhaseDetector;

        let duel = duel_state();
        assert_eq!(detector.detect(&duel), Phase::Endgame);

        let mut squads = ArenaState::new();
        for i in 0..3 {
            squads.add_agent(Agent::new(i, 0, 1, 1 + i));
            squads.add_agent(Agent::new(3 + i, 1, 14, 1 + i));
        }
        squads.set_active_agent(0);
        assert_eq!(detector.detect(&squads), Phase::Opening);
    }

    #[test]
    fn test_search_prefers_finishing_blow() {
        // The enemy is one hit from elimination; the engine should attack
        // rather than reposition.
        let mut state = duel_state();
        state.agent_mut(1).unwrap().health = 10;

        let mut planner = Planner::new();
        planner
            .initialize(
                Box::new(arena_feature_set()),
                SearchConfig {
                    base_depth: 2,
                    max_depth: 4,
                    frame_budget_ms: 0.0,
                    tt_size_mb: 1,
                    ..Default::default()
                },
            )
            .unwrap();

        let context = PlanningContext {
            state: Some(&state),
            frame_budget_ms: 0.0,
            available_time_ms: 0.0,
            urgent: false,
        };
        while !planner.plan_step(&context) {}

        let plan = planner.planned_action();
        assert!(plan.primary.is_capture(), "expected an attack, got {:?}", plan.primary);
        assert!(plan.expected_value > Q::ZERO);
    }

    /// Random walks through the state space must preserve the adapter
    /// contract: positional action ids, canonical ordering, hash
    /// stability, and functional updates.
    #[test]
    fn test_random_playouts_uphold_adapter_invariants() {
        use rand::{Rng, SeedableRng};
        use rand_chacha::ChaCha20Rng;

        for seed in 0..20u64 {
            let mut rng = ChaCha20Rng::seed_from_u64(seed);
            let mut state = duel_state();

            for step in 0..40 {
                if state.is_terminal() {
                    break;
                }

                let actions = state.legal_actions();
                if actions.is_empty() {
                    break;
                }

                for (index, action) in actions.iter().enumerate() {
                    assert_eq!(
                        action.action_id, index as u32,
                        "seed {seed} step {step}: ids must be positional"
                    );
                }
                for pair in actions.windows(2) {
                    assert!(
                        pair[0] < pair[1],
                        "seed {seed} step {step}: canonical order violated"
                    );
                }

                let hash_before = state.state_hash();
                assert_eq!(hash_before, state.clone().state_hash());

                let pick = actions[rng.gen_range(0..actions.len())];
                let next = state.apply(&pick).expect("legal actions always apply");

                assert_eq!(
                    state.state_hash(),
                    hash_before,
                    "seed {seed} step {step}: apply must not mutate the source"
                );

                state = next
                    .as_any()
                    .downcast_ref::<ArenaState>()
                    .expect("arena apply returns an arena state")
                    .clone();
            }
        }
    }

    #[test]
    fn test_skirmish_runs_to_completion() {
        let mut skirmish = Skirmish::new(SkirmishConfig::default());
        skirmish.run_game();

        assert!(!skirmish.history().is_empty());
        assert!(!skirmish.transcript().is_empty());
        for result in skirmish.history() {
            assert!(result.completed);
        }
    }

    #[test]
    fn test_skirmish_transcript_is_deterministic() {
        let run = |seeded: SkirmishConfig| {
            let mut skirmish = Skirmish::new(seeded);
            skirmish.run_game();
            skirmish.transcript().to_vec()
        };

        let first = run(SkirmishConfig::default());
        let second = run(SkirmishConfig::default());
        assert_eq!(first, second);
    }
}
