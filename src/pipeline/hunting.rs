//! Step-by-step hunts with a trained predator

use rand::rngs::StdRng;
use serde::Serialize;
use tracing::debug;

use crate::{
    Error, Result,
    geometry::{GridPoint, line_points},
    hunt::{GameEngine, GameState, GameStatus, PredatorAction, PreyAction, StepOutcome, StepRecord},
    pipeline::prey::PreyBehavior,
    q_learning::{
        AgentConfig, KnowledgeBase, QLearningAgent, StateKey, abstraction::best_action,
        agent::build_rng,
    },
};

/// Why the predator did what it did on a given tick
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Explanation {
    pub tick: u32,
    /// Key the decision was made from.
    pub state_key: StateKey,
    /// Values stored for the key when the decision was made, in
    /// advance/hide/attack order; `None` if the state was new.
    pub q_values: Option<[f64; 3]>,
    pub best_action: Option<PredatorAction>,
    pub chosen_action: PredatorAction,
    /// Rules that cover the key.
    pub rules: Vec<String>,
    /// Cells between predator and prey after the tick, both ends included.
    pub line_of_sight: Vec<GridPoint>,
    pub summary: String,
}

/// One hunt driven by the greedy policy
pub struct HuntSession {
    agent: QLearningAgent,
    engine: GameEngine,
    prey: PreyBehavior,
    rng: StdRng,
    state: GameState,
    start_position: usize,
    /// Key and stored values for each tick, read before the decision.
    decisions: Vec<(StateKey, Option<[f64; 3]>)>,
}

impl HuntSession {
    /// Start a hunt from perimeter position `start_position` (1-8).
    pub fn new(
        knowledge: KnowledgeBase,
        start_position: usize,
        prey: PreyBehavior,
        seed: Option<u64>,
    ) -> Result<Self> {
        prey.validate()?;
        let state = GameState::from_start_index(start_position)?;

        let config = match seed {
            Some(seed) => AgentConfig::default().with_seed(seed),
            None => AgentConfig::default(),
        };
        let mut agent = QLearningAgent::with_knowledge(config, knowledge)?;
        agent.set_epsilon(0.0);

        Ok(Self {
            agent,
            engine: GameEngine::new(),
            prey,
            rng: build_rng(seed.map(|s| s.wrapping_add(1))),
            state,
            start_position,
            decisions: Vec::new(),
        })
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn start_position(&self) -> usize {
        self.start_position
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        self.agent.knowledge()
    }

    pub fn result(&self) -> GameStatus {
        self.state.status
    }

    pub fn is_over(&self) -> bool {
        self.state.is_terminal()
    }

    /// Record of the most recent tick.
    pub fn last_record(&self) -> Option<&StepRecord> {
        self.state.history.last()
    }

    /// Advance the hunt by one tick.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EpisodeOver`] once the hunt has ended.
    pub fn step(&mut self) -> Result<StepOutcome> {
        if self.state.is_terminal() {
            return Err(Error::EpisodeOver {
                status: self.state.status.to_string(),
            });
        }

        let prey_action = self.prey.next_action(self.state.time_step, &mut self.rng);
        let key = StateKey::observe(&self.state, prey_action);
        let known = self.agent.knowledge().q_values(&key);
        let action = self.agent.greedy_action(&key);

        let outcome = self.engine.step(&mut self.state, action, prey_action)?;
        self.decisions.push((key, known));

        debug!(
            tick = self.state.time_step,
            %key,
            %action,
            status = %self.state.status,
            "hunt step"
        );
        Ok(outcome)
    }

    /// Step until the hunt ends or `max_steps` ticks have been played in total.
    pub fn run_to_end(&mut self, max_steps: u32) -> Result<GameStatus> {
        while !self.state.is_terminal() && self.state.time_step < max_steps {
            self.step()?;
        }
        Ok(self.state.status)
    }

    /// Explain the decision taken on `tick` (1-based).
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownTick`] for ticks that have not been played.
    pub fn explain(&self, tick: u32) -> Result<Explanation> {
        let index = (tick as usize)
            .checked_sub(1)
            .filter(|&i| i < self.decisions.len())
            .ok_or(Error::UnknownTick { tick })?;

        let (key, q_values) = self.decisions[index];
        let record = &self.state.history[index];
        let knowledge = self.agent.knowledge();

        let best = q_values.map(|row| best_action(&row).0);
        let rules: Vec<String> = knowledge
            .rules_matching(&key)
            .into_iter()
            .map(ToString::to_string)
            .collect();

        let mut summary = format!(
            "At tick {tick}, predator was at {} ({}) and the prey chose {}; predator did {}.",
            key.position, key.predator_state, key.prey_action, record.predator_action
        );
        if key.prey_action != record.prey_action {
            summary.push_str(" Prey was already fleeing.");
        }
        if rules.is_empty() {
            summary.push_str(" Decision based on specific Q-values.");
        } else {
            summary.push_str(" Decision influenced by general rules.");
        }

        Ok(Explanation {
            tick,
            state_key: key,
            q_values,
            best_action: best,
            chosen_action: record.predator_action,
            rules,
            line_of_sight: line_points(record.predator_position, record.prey_position),
            summary,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hunt::{GameMap, PredatorState};

    fn drinking_prey() -> PreyBehavior {
        PreyBehavior::programmed(vec![PreyAction::Drink]).unwrap()
    }

    #[test]
    fn test_trained_preference_is_followed() {
        let mut knowledge = KnowledgeBase::new();
        let start = StateKey::new(GridPoint::new(0, 9), PreyAction::Drink, PredatorState::Normal);
        knowledge.update_q_value(&start, PredatorAction::Hide, 5.0);

        let mut hunt = HuntSession::new(knowledge, 1, drinking_prey(), Some(9)).unwrap();
        hunt.step().unwrap();

        let record = hunt.last_record().unwrap();
        assert_eq!(record.predator_action, PredatorAction::Hide);
        assert_eq!(record.predator_state, PredatorState::Hidden);
    }

    #[test]
    fn test_hunt_ends_and_rejects_more_steps() {
        let mut knowledge = KnowledgeBase::new();
        // Always advance along column 9 from the north.
        for row in 0..9 {
            let key = StateKey::new(GridPoint::new(row, 9), PreyAction::Drink, PredatorState::Normal);
            knowledge.update_q_value(&key, PredatorAction::Advance, 1.0);
        }

        let mut hunt = HuntSession::new(knowledge, 1, drinking_prey(), Some(1)).unwrap();
        let status = hunt.run_to_end(50).unwrap();

        assert!(status.is_terminal());
        assert!(hunt.is_over());
        assert!(matches!(hunt.step(), Err(Error::EpisodeOver { .. })));
    }

    #[test]
    fn test_explain_reports_values_and_rules() {
        let mut knowledge = KnowledgeBase::new();
        let key = StateKey::new(GridPoint::new(0, 9), PreyAction::Drink, PredatorState::Normal);
        knowledge.update_q_value(&key, PredatorAction::Advance, 3.0);
        knowledge.add_abstraction(
            "IF Lion at 0,9 AND Lion is normal AND Impala does [drink, look_left] THEN advance"
                .parse()
                .unwrap(),
        );

        let mut hunt = HuntSession::new(knowledge, 1, drinking_prey(), Some(5)).unwrap();
        hunt.step().unwrap();

        let explanation = hunt.explain(1).unwrap();
        assert_eq!(explanation.state_key, key);
        assert_eq!(explanation.q_values, Some([3.0, 0.0, 0.0]));
        assert_eq!(explanation.best_action, Some(PredatorAction::Advance));
        assert_eq!(explanation.chosen_action, PredatorAction::Advance);
        assert_eq!(explanation.rules.len(), 1);
        assert_eq!(explanation.line_of_sight.first(), Some(&GridPoint::new(1, 9)));
        assert_eq!(explanation.line_of_sight.last(), Some(&GameMap::PREY_HOME));

        assert!(matches!(hunt.explain(0), Err(Error::UnknownTick { tick: 0 })));
        assert!(matches!(hunt.explain(2), Err(Error::UnknownTick { tick: 2 })));
    }

    #[test]
    fn test_explain_marks_unseen_states() {
        let mut hunt =
            HuntSession::new(KnowledgeBase::new(), 1, drinking_prey(), Some(2)).unwrap();
        hunt.step().unwrap();

        let explanation = hunt.explain(1).unwrap();
        assert_eq!(explanation.q_values, None);
        assert_eq!(explanation.best_action, None);
        assert!(explanation.rules.is_empty());
    }

    #[test]
    fn test_same_seed_replays_same_hunt() {
        let play = || {
            let mut hunt =
                HuntSession::new(KnowledgeBase::new(), 3, PreyBehavior::Random, Some(11)).unwrap();
            hunt.run_to_end(30).unwrap();
            hunt.state().history.clone()
        };

        assert_eq!(play(), play());
    }

    #[test]
    fn test_invalid_start_is_rejected() {
        let result = HuntSession::new(KnowledgeBase::new(), 0, PreyBehavior::Random, None);
        assert!(matches!(result, Err(Error::InvalidStartPosition { index: 0 })));
    }
}
