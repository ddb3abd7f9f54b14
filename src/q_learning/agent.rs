//! Tabular Q-learning predator
//!
//! The agent owns its knowledge base, replay buffer and eligibility traces,
//! and offers three update variants over the same table:
//!
//! - [`learn`](QLearningAgent::learn): one-step TD, Q(s,a) ← Q(s,a) + α[r + γ max_a' Q(s',a') − Q(s,a)]
//! - [`learn_with_traces`](QLearningAgent::learn_with_traces): accumulating traces, Q(λ) style
//! - [`learn_batch`](QLearningAgent::learn_batch): one-step TD over a replay sample

use std::collections::HashMap;

use rand::{Rng, SeedableRng, rngs::StdRng, seq::IndexedRandom};
use tracing::trace;

use crate::{
    Error, Result,
    hunt::{GameState, PredatorAction, PreyAction},
    q_learning::{
        config::AgentConfig,
        knowledge_base::KnowledgeBase,
        replay::{ExperienceReplay, Transition},
        state_key::StateKey,
    },
};

/// Traces at or below this weight are dropped.
pub const TRACE_THRESHOLD: f64 = 0.01;

pub(crate) fn build_rng(seed: Option<u64>) -> StdRng {
    if let Some(seed) = seed {
        StdRng::seed_from_u64(seed)
    } else {
        StdRng::from_rng(&mut rand::rng())
    }
}

/// ε-greedy tabular Q-learning agent
#[derive(Debug, Clone)]
pub struct QLearningAgent {
    config: AgentConfig,
    knowledge: KnowledgeBase,
    replay: ExperienceReplay,
    traces: HashMap<(StateKey, PredatorAction), f64>,
    epsilon: f64,
    rng: StdRng,
}

impl QLearningAgent {
    /// Create an agent with an empty knowledge base.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfiguration`] if `config` fails validation.
    pub fn new(config: AgentConfig) -> Result<Self> {
        Self::with_knowledge(config, KnowledgeBase::new())
    }

    /// Create an agent that continues from existing knowledge.
    pub fn with_knowledge(config: AgentConfig, knowledge: KnowledgeBase) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            replay: ExperienceReplay::new(config.replay_capacity),
            traces: HashMap::new(),
            epsilon: config.epsilon_start,
            rng: build_rng(config.seed),
            knowledge,
            config,
        })
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    pub fn knowledge_mut(&mut self) -> &mut KnowledgeBase {
        &mut self.knowledge
    }

    pub fn into_knowledge(self) -> KnowledgeBase {
        self.knowledge
    }

    pub fn replay(&self) -> &ExperienceReplay {
        &self.replay
    }

    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    pub fn set_epsilon(&mut self, epsilon: f64) {
        self.epsilon = epsilon.clamp(0.0, 1.0);
    }

    /// Current eligibility of `(state, action)`, zero if untracked.
    pub fn eligibility(&self, state: &StateKey, action: PredatorAction) -> f64 {
        self.traces.get(&(*state, action)).copied().unwrap_or(0.0)
    }

    /// Number of pairs currently carrying a trace.
    pub fn active_traces(&self) -> usize {
        self.traces.len()
    }

    /// State key for `state` after the prey performed `prey_action`.
    pub fn state_key(&self, state: &GameState, prey_action: PreyAction) -> StateKey {
        StateKey::observe(state, prey_action)
    }

    /// ε-greedy choice over every predator action.
    pub fn choose_action(&mut self, state: &StateKey) -> PredatorAction {
        if self.rng.random::<f64>() < self.epsilon {
            PredatorAction::ALL[self.rng.random_range(0..PredatorAction::ALL.len())]
        } else {
            self.exploit(state, &PredatorAction::ALL)
        }
    }

    /// ε-greedy choice restricted to `candidates`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoCandidateActions`] if `candidates` is empty.
    pub fn choose_action_from(
        &mut self,
        state: &StateKey,
        candidates: &[PredatorAction],
    ) -> Result<PredatorAction> {
        if candidates.is_empty() {
            return Err(Error::NoCandidateActions);
        }
        if self.rng.random::<f64>() < self.epsilon {
            candidates
                .choose(&mut self.rng)
                .copied()
                .ok_or(Error::NoCandidateActions)
        } else {
            Ok(self.exploit(state, candidates))
        }
    }

    /// Greedy choice with no exploration.
    pub fn greedy_action(&mut self, state: &StateKey) -> PredatorAction {
        self.exploit(state, &PredatorAction::ALL)
    }

    /// Highest-valued candidate; an untouched row yields a uniform pick.
    fn exploit(&mut self, state: &StateKey, candidates: &[PredatorAction]) -> PredatorAction {
        let row = self.knowledge.row(state);

        if candidates.iter().all(|action| row[action.index()] == 0.0) {
            let pick = self.rng.random_range(0..candidates.len());
            return candidates[pick];
        }

        let mut best = candidates[0];
        for &action in &candidates[1..] {
            if row[action.index()] > row[best.index()] {
                best = action;
            }
        }
        best
    }

    fn td_target(&mut self, reward: f64, next_state: &StateKey, done: bool) -> f64 {
        let max_next = if done {
            0.0
        } else {
            self.knowledge.max_q_value(next_state)
        };
        reward + self.config.discount_factor * max_next
    }

    fn one_step_update(
        &mut self,
        state: &StateKey,
        action: PredatorAction,
        reward: f64,
        next_state: &StateKey,
        done: bool,
    ) -> f64 {
        let current = self.knowledge.get_q_value(state, action);
        let target = self.td_target(reward, next_state, done);
        let updated = current + self.config.learning_rate * (target - current);
        self.knowledge.update_q_value(state, action, updated);
        updated
    }

    /// One-step TD update; the transition is also kept for replay.
    ///
    /// Returns the new value of `Q(state, action)`.
    pub fn learn(
        &mut self,
        state: &StateKey,
        action: PredatorAction,
        reward: f64,
        next_state: &StateKey,
        done: bool,
    ) -> f64 {
        let updated = self.one_step_update(state, action, reward, next_state, done);
        self.remember(state, action, reward, next_state, done);
        updated
    }

    /// Accumulating-trace update, to be called once per tick.
    ///
    /// The TD error of this transition is applied to every pair whose trace
    /// exceeds [`TRACE_THRESHOLD`]; those traces then decay by γλ. The
    /// transition is also kept for replay. Returns the TD error.
    pub fn learn_with_traces(
        &mut self,
        state: &StateKey,
        action: PredatorAction,
        reward: f64,
        next_state: &StateKey,
        done: bool,
    ) -> f64 {
        let current = self.knowledge.get_q_value(state, action);
        let td_error = self.td_target(reward, next_state, done) - current;

        *self.traces.entry((*state, action)).or_insert(0.0) += 1.0;

        let alpha = self.config.learning_rate;
        let decay = self.config.discount_factor * self.config.trace_decay;
        let knowledge = &mut self.knowledge;

        self.traces.retain(|(key, traced_action), trace| {
            if *trace <= TRACE_THRESHOLD {
                return false;
            }
            let value = knowledge.get_q_value(key, *traced_action);
            knowledge.update_q_value(key, *traced_action, value + alpha * td_error * *trace);
            *trace *= decay;
            *trace > TRACE_THRESHOLD
        });

        self.remember(state, action, reward, next_state, done);
        td_error
    }

    /// Replay a uniform sample of `batch_size` stored transitions.
    ///
    /// Does nothing until the buffer holds at least `batch_size` transitions.
    /// Returns the number of updates applied.
    pub fn learn_batch(&mut self, batch_size: usize) -> usize {
        if batch_size == 0 || self.replay.size() < batch_size {
            return 0;
        }

        let batch = self.replay.sample(batch_size, &mut self.rng);
        for transition in &batch {
            self.one_step_update(
                &transition.state,
                transition.action,
                transition.reward,
                &transition.next_state,
                transition.done,
            );
        }
        trace!(applied = batch.len(), "replayed batch");
        batch.len()
    }

    fn remember(
        &mut self,
        state: &StateKey,
        action: PredatorAction,
        reward: f64,
        next_state: &StateKey,
        done: bool,
    ) {
        self.replay.add(Transition {
            state: *state,
            action,
            reward,
            next_state: *next_state,
            done,
        });
    }

    /// Drop all eligibility traces; call at the start of each episode.
    pub fn reset_eligibility(&mut self) {
        self.traces.clear();
    }

    /// ε ← max(ε_end, ε·decay); call once per completed episode.
    pub fn decay_epsilon(&mut self) {
        self.epsilon = (self.epsilon * self.config.epsilon_decay).max(self.config.epsilon_end);
    }

    /// Restore the starting exploration rate.
    pub fn reset_epsilon(&mut self) {
        self.epsilon = self.config.epsilon_start;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        geometry::GridPoint,
        hunt::{PredatorState, PreyAction},
    };

    fn key(row: i32, col: i32) -> StateKey {
        StateKey::new(GridPoint::new(row, col), PreyAction::Drink, PredatorState::Normal)
    }

    fn agent(alpha: f64, gamma: f64) -> QLearningAgent {
        let config = AgentConfig::default()
            .with_learning_rate(alpha)
            .with_discount_factor(gamma)
            .with_seed(42);
        QLearningAgent::new(config).unwrap()
    }

    #[test]
    fn test_one_step_update() {
        let mut agent = agent(0.1, 0.9);
        let s = key(0, 9);
        let next = key(1, 9);
        agent
            .knowledge_mut()
            .update_q_value(&next, PredatorAction::Advance, 5.0);
        agent
            .knowledge_mut()
            .update_q_value(&next, PredatorAction::Hide, 3.0);

        let updated = agent.learn(&s, PredatorAction::Advance, 10.0, &next, false);

        assert!((updated - 1.45).abs() < 1e-12);
        assert!((agent.knowledge_mut().get_q_value(&s, PredatorAction::Advance) - 1.45).abs() < 1e-12);
        assert_eq!(agent.replay().size(), 1);
    }

    #[test]
    fn test_terminal_update_ignores_next_state() {
        let mut agent = agent(0.5, 0.9);
        let s = key(8, 9);
        let terminal = key(9, 9);
        agent
            .knowledge_mut()
            .update_q_value(&terminal, PredatorAction::Attack, 1000.0);

        let updated = agent.learn(&s, PredatorAction::Attack, 100.0, &terminal, true);
        assert_eq!(updated, 50.0);
    }

    #[test]
    fn test_learning_materializes_next_row() {
        let mut agent = agent(0.1, 0.9);
        agent.learn(&key(0, 0), PredatorAction::Hide, -1.0, &key(1, 1), false);
        assert_eq!(agent.knowledge().len(), 2);
    }

    #[test]
    fn test_traces_spread_error_backwards() {
        let mut agent = agent(0.5, 1.0);
        let a = key(0, 0);
        let b = key(1, 1);
        let c = key(2, 2);

        agent.reset_eligibility();
        agent.learn_with_traces(&a, PredatorAction::Advance, 0.0, &b, false);
        // γλ = 0.8 after the first update
        assert!((agent.eligibility(&a, PredatorAction::Advance) - 0.8).abs() < 1e-12);

        let td_error = agent.learn_with_traces(&b, PredatorAction::Advance, 10.0, &c, true);
        assert_eq!(td_error, 10.0);

        // a: 0.5 * 10 * 0.8, b: 0.5 * 10 * 1.0
        let kb = agent.knowledge();
        assert!((kb.q_values(&a).unwrap()[0] - 4.0).abs() < 1e-12);
        assert!((kb.q_values(&b).unwrap()[0] - 5.0).abs() < 1e-12);
        assert_eq!(agent.active_traces(), 2);

        agent.reset_eligibility();
        assert_eq!(agent.active_traces(), 0);
    }

    #[test]
    fn test_negligible_traces_are_pruned() {
        let config = AgentConfig::default()
            .with_discount_factor(0.1)
            .with_trace_decay(0.05)
            .with_seed(1);
        let mut agent = QLearningAgent::new(config).unwrap();

        agent.learn_with_traces(&key(0, 0), PredatorAction::Hide, 0.0, &key(0, 1), false);
        // 1.0 * 0.1 * 0.05 = 0.005 falls under the threshold.
        assert_eq!(agent.active_traces(), 0);
    }

    #[test]
    fn test_learn_batch_waits_for_enough_transitions() {
        let mut agent = agent(0.1, 0.9);
        agent.learn(&key(0, 0), PredatorAction::Advance, 1.0, &key(0, 1), false);
        assert_eq!(agent.learn_batch(4), 0);

        for col in 1..5 {
            agent.learn(&key(0, col), PredatorAction::Advance, 1.0, &key(0, col + 1), false);
        }
        assert_eq!(agent.learn_batch(4), 4);
        assert_eq!(agent.replay().size(), 5);
    }

    #[test]
    fn test_greedy_prefers_highest_value() {
        let mut agent = agent(0.1, 0.9);
        let s = key(3, 3);
        agent
            .knowledge_mut()
            .update_q_value(&s, PredatorAction::Hide, 2.0);
        agent
            .knowledge_mut()
            .update_q_value(&s, PredatorAction::Attack, -1.0);
        agent.set_epsilon(0.0);

        for _ in 0..20 {
            assert_eq!(agent.choose_action(&s), PredatorAction::Hide);
        }
        assert_eq!(
            agent
                .choose_action_from(&s, &[PredatorAction::Advance, PredatorAction::Attack])
                .unwrap(),
            PredatorAction::Advance
        );
    }

    #[test]
    fn test_untouched_state_breaks_ties_randomly() {
        let mut agent = agent(0.1, 0.9);
        agent.set_epsilon(0.0);

        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            seen.insert(agent.greedy_action(&key(5, 5)));
        }
        assert_eq!(seen.len(), 3);
    }

    #[test]
    fn test_empty_candidates_is_an_error() {
        let mut agent = agent(0.1, 0.9);
        assert!(matches!(
            agent.choose_action_from(&key(0, 0), &[]),
            Err(Error::NoCandidateActions)
        ));
    }

    #[test]
    fn test_epsilon_schedule() {
        let config = AgentConfig::default().with_epsilon(1.0, 0.5, 0.5);
        let mut agent = QLearningAgent::new(config).unwrap();

        agent.decay_epsilon();
        assert_eq!(agent.epsilon(), 0.5);
        agent.decay_epsilon();
        assert_eq!(agent.epsilon(), 0.5);

        agent.reset_epsilon();
        assert_eq!(agent.epsilon(), 1.0);
    }
}
