//! Per-tick state machine for a single hunting episode

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    Error, Result,
    geometry::{GRID_MAX, GridPoint, distance},
    hunt::{
        entities::{
            Facing, GameMap, Predator, PredatorAction, PredatorState, Prey, PreyAction, PreyState,
        },
        vision::VisionCalculator,
    },
};

/// Reward for catching the prey
pub const SUCCESS_REWARD: f64 = 100.0;

/// Reward when the prey gets away
pub const FAILURE_REWARD: f64 = -100.0;

/// Penalty applied on every non-terminal tick
pub const STEP_PENALTY: f64 = 1.0;

/// Distance at or under which the predator catches the prey
pub const CATCH_DISTANCE: f64 = 1.0;

/// Distance under which the prey notices the predator regardless of vision
pub const ALERT_DISTANCE: f64 = 3.0;

/// Distance beyond which a fleeing prey is out of reach
pub const ESCAPE_DISTANCE: f64 = 10.0;

/// Squares per tick the predator covers while attacking
pub const ATTACK_SPEED: u32 = 2;

/// Status of an episode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameStatus {
    #[default]
    InProgress,
    Success,
    Failed,
}

impl GameStatus {
    pub fn is_terminal(self) -> bool {
        self != GameStatus::InProgress
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GameStatus::InProgress => "in_progress",
            GameStatus::Success => "success",
            GameStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for GameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why the prey started to flee
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FleeReason {
    PredatorVisible,
    PredatorAttacking,
    TooClose,
}

impl fmt::Display for FleeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FleeReason::PredatorVisible => "predator visible",
            FleeReason::PredatorAttacking => "predator attacking",
            FleeReason::TooClose => "too close",
        };
        f.write_str(label)
    }
}

/// One entry of the episode history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    pub time_step: u32,
    pub predator_position: GridPoint,
    pub prey_position: GridPoint,
    pub predator_state: PredatorState,
    pub prey_state: PreyState,
    /// Action actually performed (attacks override the request).
    pub predator_action: PredatorAction,
    /// Action actually performed (fleeing overrides the request).
    pub prey_action: PreyAction,
    pub info: String,
}

/// Result of a single tick
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub reward: f64,
    pub done: bool,
    pub info: String,
    /// Set on the tick the prey starts to flee.
    pub flee_reason: Option<FleeReason>,
}

/// Full state of one episode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub map: GameMap,
    pub predator: Predator,
    pub prey: Prey,
    pub time_step: u32,
    pub status: GameStatus,
    /// Tick on which the prey started fleeing.
    pub flee_start_time: Option<u32>,
    pub history: Vec<StepRecord>,
}

impl GameState {
    /// Start an episode with the predator at `predator_start` and the prey at home.
    pub fn new(predator_start: GridPoint) -> Self {
        Self {
            map: GameMap::default(),
            predator: Predator::new(predator_start),
            prey: Prey::new(GameMap::PREY_HOME),
            time_step: 0,
            status: GameStatus::InProgress,
            flee_start_time: None,
            history: Vec::new(),
        }
    }

    /// Start an episode from one of the eight numbered perimeter positions.
    pub fn from_start_index(index: usize) -> Result<Self> {
        Ok(Self::new(GameMap::start_position(index)?))
    }

    /// Current predator-prey distance.
    pub fn distance(&self) -> f64 {
        distance(self.predator.position, self.prey.position)
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Copy of the current positions and states, without the history.
    pub fn frame(&self) -> GameState {
        GameState {
            map: self.map,
            predator: self.predator.clone(),
            prey: self.prey.clone(),
            time_step: self.time_step,
            status: self.status,
            flee_start_time: self.flee_start_time,
            history: Vec::new(),
        }
    }

    /// Ticks elapsed since the prey started fleeing, if it is.
    pub fn flee_duration(&self) -> Option<u32> {
        self.flee_start_time
            .map(|start| self.time_step.saturating_sub(start))
    }
}

/// Advances episodes one tick at a time
#[derive(Debug, Clone, Default)]
pub struct GameEngine {
    vision: VisionCalculator,
}

impl GameEngine {
    pub fn new() -> Self {
        Self {
            vision: VisionCalculator::new(),
        }
    }

    pub fn vision(&self) -> &VisionCalculator {
        &self.vision
    }

    /// Squares the prey covers on a tick, given how long it has been fleeing.
    pub fn prey_speed(flee_duration: u32) -> u32 {
        flee_duration + 1
    }

    /// Advance `state` by one tick.
    ///
    /// The prey resolves first, then the predator, then the flee triggers and
    /// the termination rules are evaluated against the post-move positions.
    ///
    /// # Errors
    ///
    /// Returns [`Error::EpisodeOver`] if the episode has already ended.
    pub fn step(
        &self,
        state: &mut GameState,
        predator_action: PredatorAction,
        prey_action: PreyAction,
    ) -> Result<StepOutcome> {
        if state.is_terminal() {
            return Err(Error::EpisodeOver {
                status: state.status.to_string(),
            });
        }

        state.time_step += 1;
        let mut notes: Vec<String> = Vec::new();

        let prey_action = self.resolve_prey(state, prey_action);
        let predator_action = self.resolve_predator(state, predator_action);

        let dist = state.distance();

        let mut flee_reason = None;
        if state.prey.state != PreyState::Fleeing {
            flee_reason = self.flee_trigger(state, predator_action, prey_action, dist);
            if let Some(reason) = flee_reason {
                state.prey.state = PreyState::Fleeing;
                state.flee_start_time = Some(state.time_step);
                notes.push(format!("Flee triggered: {reason}"));
            }
        }

        let mut done = false;
        let mut reward = 0.0;

        if dist <= CATCH_DISTANCE {
            state.status = GameStatus::Success;
            done = true;
            reward = SUCCESS_REWARD;
            notes.push("Predator caught prey!".to_string());
        } else if let Some(duration) = state.flee_duration() {
            let speed = Self::prey_speed(duration);
            if speed > ATTACK_SPEED && dist > CATCH_DISTANCE {
                state.status = GameStatus::Failed;
                done = true;
                reward = FAILURE_REWARD;
                notes.push("Prey escaped.".to_string());
            } else if dist > ESCAPE_DISTANCE {
                state.status = GameStatus::Failed;
                done = true;
                reward = FAILURE_REWARD;
                notes.push("Prey out of reach.".to_string());
            }
        }

        if !done {
            reward -= STEP_PENALTY;
        }

        let info = notes.join(" ");
        state.history.push(StepRecord {
            time_step: state.time_step,
            predator_position: state.predator.position,
            prey_position: state.prey.position,
            predator_state: state.predator.state,
            prey_state: state.prey.state,
            predator_action,
            prey_action,
            info: info.clone(),
        });

        Ok(StepOutcome {
            reward,
            done,
            info,
            flee_reason,
        })
    }

    fn resolve_prey(&self, state: &mut GameState, requested: PreyAction) -> PreyAction {
        if state.prey.state == PreyState::Fleeing {
            self.flee_movement(state);
            return PreyAction::Flee;
        }

        state.prey.state = if requested == PreyAction::Drink {
            PreyState::Drinking
        } else {
            PreyState::Normal
        };
        requested
    }

    fn resolve_predator(&self, state: &mut GameState, requested: PredatorAction) -> PredatorAction {
        let action = if state.predator.state == PredatorState::Attacking {
            PredatorAction::Attack
        } else {
            requested
        };

        let target = state.prey.position;
        match action {
            PredatorAction::Attack => {
                state.predator.state = PredatorState::Attacking;
                for _ in 0..ATTACK_SPEED {
                    state.predator.move_towards(target);
                }
            }
            PredatorAction::Advance => {
                state.predator.state = PredatorState::Normal;
                state.predator.move_towards(target);
            }
            PredatorAction::Hide => {
                state.predator.state = PredatorState::Hidden;
            }
        }
        action
    }

    fn flee_trigger(
        &self,
        state: &GameState,
        predator_action: PredatorAction,
        prey_action: PreyAction,
        dist: f64,
    ) -> Option<FleeReason> {
        if self.vision.is_predator_visible(
            state.predator.position,
            state.predator.state,
            prey_action,
        ) {
            Some(FleeReason::PredatorVisible)
        } else if predator_action == PredatorAction::Attack {
            Some(FleeReason::PredatorAttacking)
        } else if dist < ALERT_DISTANCE {
            Some(FleeReason::TooClose)
        } else {
            None
        }
    }

    /// Run the prey along its row, away from the predator's column.
    fn flee_movement(&self, state: &mut GameState) {
        let duration = state.flee_duration().unwrap_or(0);
        let speed = Self::prey_speed(duration) as i32;

        let facing = if state.predator.position.col > state.prey.position.col {
            Facing::West
        } else {
            Facing::East
        };

        let col = (state.prey.position.col + facing.column_step() * speed).clamp(0, GRID_MAX);
        state.prey.position.col = col;
        state.prey.facing = Some(facing);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fleeing_state(predator: GridPoint, flee_start: u32, time_step: u32) -> GameState {
        let mut state = GameState::new(predator);
        state.prey.state = PreyState::Fleeing;
        state.flee_start_time = Some(flee_start);
        state.time_step = time_step;
        state
    }

    #[test]
    fn test_prey_speed_formula() {
        let speeds: Vec<u32> = (0..5).map(GameEngine::prey_speed).collect();
        assert_eq!(speeds, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_time_step_increments() {
        let engine = GameEngine::new();
        let mut state = GameState::new(GridPoint::new(18, 9));

        engine
            .step(&mut state, PredatorAction::Hide, PreyAction::Drink)
            .unwrap();
        assert_eq!(state.time_step, 1);
        engine
            .step(&mut state, PredatorAction::Hide, PreyAction::Drink)
            .unwrap();
        assert_eq!(state.time_step, 2);
    }

    #[test]
    fn test_visible_predator_triggers_flee() {
        let engine = GameEngine::new();
        let mut state = GameState::new(GridPoint::new(0, 9));

        let outcome = engine
            .step(&mut state, PredatorAction::Advance, PreyAction::LookFront)
            .unwrap();

        assert_eq!(state.prey.state, PreyState::Fleeing);
        assert_eq!(state.flee_start_time, Some(1));
        assert_eq!(outcome.flee_reason, Some(FleeReason::PredatorVisible));
        assert!(outcome.info.contains("Flee triggered"));
        assert!(!outcome.done);
        assert_eq!(outcome.reward, -1.0);
    }

    #[test]
    fn test_attack_triggers_flee_even_unseen() {
        let engine = GameEngine::new();
        let mut state = GameState::new(GridPoint::new(18, 9));

        let outcome = engine
            .step(&mut state, PredatorAction::Attack, PreyAction::Drink)
            .unwrap();

        assert_eq!(state.predator.state, PredatorState::Attacking);
        assert_eq!(outcome.flee_reason, Some(FleeReason::PredatorAttacking));
        // Two squares straight north
        assert_eq!(state.predator.position, GridPoint::new(16, 9));
    }

    #[test]
    fn test_close_predator_triggers_flee() {
        let engine = GameEngine::new();
        let mut state = GameState::new(GridPoint::new(13, 9));

        let outcome = engine
            .step(&mut state, PredatorAction::Advance, PreyAction::Drink)
            .unwrap();

        assert_eq!(state.predator.position, GridPoint::new(12, 9));
        assert!(state.distance() >= ALERT_DISTANCE);
        assert_eq!(outcome.flee_reason, None);

        let outcome = engine
            .step(&mut state, PredatorAction::Advance, PreyAction::Drink)
            .unwrap();
        assert_eq!(state.predator.position, GridPoint::new(11, 9));
        assert_eq!(outcome.flee_reason, Some(FleeReason::TooClose));
    }

    #[test]
    fn test_catch_is_success() {
        let engine = GameEngine::new();
        let mut state = GameState::new(GridPoint::new(9, 7));

        let outcome = engine
            .step(&mut state, PredatorAction::Advance, PreyAction::Drink)
            .unwrap();

        assert!(outcome.done);
        assert_eq!(outcome.reward, 100.0);
        assert_eq!(state.status, GameStatus::Success);
    }

    #[test]
    fn test_fast_prey_escapes() {
        let engine = GameEngine::new();
        let mut state = fleeing_state(GridPoint::new(0, 9), 0, 10);
        state.prey.position = GridPoint::new(9, 18);

        let outcome = engine
            .step(&mut state, PredatorAction::Advance, PreyAction::Flee)
            .unwrap();

        assert!(outcome.done);
        assert_eq!(outcome.reward, -100.0);
        assert_eq!(state.status, GameStatus::Failed);
    }

    #[test]
    fn test_flee_moves_away_along_row() {
        let engine = GameEngine::new();
        // Predator east of the prey: prey runs west.
        let mut state = fleeing_state(GridPoint::new(9, 16), 0, 0);

        engine
            .step(&mut state, PredatorAction::Hide, PreyAction::Drink)
            .unwrap();

        assert_eq!(state.prey.position, GridPoint::new(9, 7));
        assert_eq!(state.prey.facing, Some(Facing::West));
        assert_eq!(state.history[0].prey_action, PreyAction::Flee);
    }

    #[test]
    fn test_flee_defaults_east_and_clamps() {
        let engine = GameEngine::new();
        let mut state = fleeing_state(GridPoint::new(0, 9), 0, 3);
        state.prey.position = GridPoint::new(9, 16);
        state.predator.position = GridPoint::new(9, 16);

        engine
            .step(&mut state, PredatorAction::Hide, PreyAction::Drink)
            .unwrap();

        assert_eq!(state.prey.position, GridPoint::new(9, 18));
        assert_eq!(state.prey.facing, Some(Facing::East));
    }

    #[test]
    fn test_stepping_terminal_state_fails() {
        let engine = GameEngine::new();
        let mut state = GameState::new(GridPoint::new(9, 8));
        state.status = GameStatus::Failed;

        let result = engine.step(&mut state, PredatorAction::Advance, PreyAction::Drink);
        assert!(matches!(result, Err(Error::EpisodeOver { .. })));
        assert_eq!(state.time_step, 0);
    }

    #[test]
    fn test_history_records_effective_actions() {
        let engine = GameEngine::new();
        let mut state = GameState::new(GridPoint::new(18, 9));

        engine
            .step(&mut state, PredatorAction::Attack, PreyAction::Drink)
            .unwrap();
        engine
            .step(&mut state, PredatorAction::Hide, PreyAction::LookLeft)
            .unwrap();

        assert_eq!(state.history.len(), 2);
        let second = &state.history[1];
        assert_eq!(second.time_step, 2);
        assert_eq!(second.predator_action, PredatorAction::Attack);
        assert_eq!(second.prey_action, PreyAction::Flee);
        assert_eq!(second.predator_state, PredatorState::Attacking);
        assert_eq!(second.prey_state, PreyState::Fleeing);
        assert_eq!(second.predator_position, state.predator.position);
        assert_eq!(second.prey_position, state.prey.position);
    }
}
