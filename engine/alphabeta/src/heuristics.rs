//! Heuristic evaluation.
//!
//! An evaluator maps states to a `Q` in [-1, 1] and supplies action
//! priors and a root-entropy estimate. The standard implementation is a
//! weighted feature set; a phased wrapper can route evaluation through a
//! per-phase set chosen by a domain detector.

use search_core::{Action, DetMap, GameState, Q};

/// Position evaluation capability the engine consumes.
///
/// `evaluate` must stay within [-1, 1] for non-terminal states (terminal
/// values may carry mate sentinels). The action and entropy methods have
/// defaults that most adapters keep.
pub trait Evaluator {
    fn evaluate(&self, state: &dyn GameState) -> Q;

    /// Prior for an action: the adapter-provided prior when present,
    /// otherwise a flat base plus capture/forcing bonuses.
    fn evaluate_action(&self, _state: &dyn GameState, action: &Action) -> Q {
        if action.prior.raw() != 0 {
            return action.prior;
        }

        let mut score = Q::from_float(0.5);
        if action.is_capture() {
            score = score + Q::from_float(0.2);
        }
        if action.is_forcing() {
            score = score + Q::from_float(0.15);
        }
        score.clamp(-Q::ONE, Q::ONE)
    }

    /// Shannon entropy of the legal-action prior distribution. Feeds only
    /// the adaptive depth policy, never a decision, so the logarithm may
    /// use floating point.
    fn entropy(&self, state: &dyn GameState) -> Q {
        let actions = state.legal_actions();
        if actions.len() <= 1 {
            return Q::ZERO;
        }

        let mut total = Q::ZERO;
        for action in &actions {
            total = total + self.evaluate_action(state, action);
        }

        if total.raw() <= 0 {
            // Degenerate priors: fall back to the uniform distribution.
            return Q::from_float((actions.len() as f32).ln());
        }

        let total_f = total.to_float();
        let mut entropy = 0.0f32;
        for action in &actions {
            let p = self.evaluate_action(state, action).to_float() / total_f;
            if p > 0.001 {
                entropy -= p * p.ln();
            }
        }

        Q::from_float(entropy)
    }
}

/// Feature extractor: maps a state to a `Q` in [-1, 1].
pub type FeatureExtractor = fn(&dyn GameState) -> Q;

/// One weighted heuristic feature.
#[derive(Debug, Clone)]
pub struct Feature {
    pub name: &'static str,
    pub weight: Q,
    pub extract: FeatureExtractor,
}

impl Feature {
    pub fn new(name: &'static str, weight: Q, extract: FeatureExtractor) -> Self {
        Self {
            name,
            weight,
            extract,
        }
    }
}

/// Ordered list of weighted features.
///
/// Evaluation returns the terminal value for terminal states, `ZERO` when
/// no features are registered, and otherwise the weighted feature sum
/// normalized by the total absolute weight and clamped to [-1, 1].
#[derive(Debug, Clone, Default)]
pub struct FeatureSet {
    features: Vec<Feature>,
}

impl FeatureSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a feature; re-adding a name replaces it in place, keeping its
    /// position in the evaluation order.
    pub fn add_feature(&mut self, feature: Feature) {
        for existing in &mut self.features {
            if existing.name == feature.name {
                *existing = feature;
                return;
            }
        }
        self.features.push(feature);
    }

    pub fn set_weight(&mut self, name: &str, weight: Q) {
        for feature in &mut self.features {
            if feature.name == name {
                feature.weight = weight;
                return;
            }
        }
    }

    /// Current weights, in feature order.
    pub fn weights(&self) -> DetMap<&'static str, Q> {
        self.features
            .iter()
            .map(|feature| (feature.name, feature.weight))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}

impl Evaluator for FeatureSet {
    fn evaluate(&self, state: &dyn GameState) -> Q {
        if state.is_terminal() {
            return state.terminal_value();
        }

        if self.features.is_empty() {
            return Q::ZERO;
        }

        let mut total_value = Q::ZERO;
        let mut total_weight = Q::ZERO;
        for feature in &self.features {
            let value = (feature.extract)(state);
            total_value = total_value + feature.weight * value;
            total_weight = total_weight + feature.weight.abs();
        }

        if total_weight.raw() > 0 {
            total_value = total_value / total_weight;
        }

        total_value.clamp(-Q::ONE, Q::ONE)
    }
}

/// Game phase labels for phase-selected heuristics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Opening,
    Middlegame,
    Endgame,
    Terminal,
}

/// Domain hook that labels a state with its phase.
pub trait PhaseDetector {
    fn detect(&self, state: &dyn GameState) -> Phase;
}

/// Evaluator that routes through a per-phase feature set.
///
/// Without a detector every non-terminal state counts as middlegame;
/// phases without a registered set fall back to the default set.
pub struct PhasedEvaluator {
    default_set: FeatureSet,
    phase_sets: DetMap<Phase, FeatureSet>,
    detector: Option<Box<dyn PhaseDetector>>,
}

impl PhasedEvaluator {
    pub fn new(default_set: FeatureSet) -> Self {
        Self {
            default_set,
            phase_sets: DetMap::new(),
            detector: None,
        }
    }

    pub fn set_phase_set(&mut self, phase: Phase, set: FeatureSet) {
        self.phase_sets.insert(phase, set);
    }

    pub fn set_detector(&mut self, detector: Box<dyn PhaseDetector>) {
        self.detector = Some(detector);
    }

    pub fn current_phase(&self, state: &dyn GameState) -> Phase {
        if state.is_terminal() {
            return Phase::Terminal;
        }
        match &self.detector {
            Some(detector) => detector.detect(state),
            None => Phase::Middlegame,
        }
    }

    fn current_set(&self, state: &dyn GameState) -> &FeatureSet {
        let phase = self.current_phase(state);
        self.phase_sets.get(&phase).unwrap_or(&self.default_set)
    }
}

impl Evaluator for PhasedEvaluator {
    fn evaluate(&self, state: &dyn GameState) -> Q {
        self.current_set(state).evaluate(state)
    }
}
