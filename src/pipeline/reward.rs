//! Reward shaping strategies

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    Error,
    hunt::{
        GameState, GameStatus, PredatorAction, PreyState, StepOutcome,
        engine::{FAILURE_REWARD, SUCCESS_REWARD},
    },
    ports::RewardShaper,
};

/// Learns from the engine's reward unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineReward;

impl RewardShaper for EngineReward {
    fn name(&self) -> &str {
        "engine"
    }

    fn shape(&self, _: &GameState, _: PredatorAction, _: &GameState, outcome: &StepOutcome) -> f64 {
        outcome.reward
    }
}

/// Dense shaping from distance changes and action context
///
/// Terminal transitions keep their ±100. Otherwise the reward sums:
/// +2 for closing in and −2 for falling back; +1 for hiding beyond 5 cells;
/// +3 for attacking within 3 cells or −2 for attacking beyond 5; +1 for
/// advancing from between 3 and 6 cells; −5 for startling the prey from
/// beyond 5 cells; and a flat −0.5.
#[derive(Debug, Clone, Copy, Default)]
pub struct DistanceShaping;

impl RewardShaper for DistanceShaping {
    fn name(&self) -> &str {
        "distance"
    }

    fn shape(
        &self,
        previous: &GameState,
        action: PredatorAction,
        current: &GameState,
        _outcome: &StepOutcome,
    ) -> f64 {
        match current.status {
            GameStatus::Success => return SUCCESS_REWARD,
            GameStatus::Failed => return FAILURE_REWARD,
            GameStatus::InProgress => {}
        }

        let before = previous.distance();
        let after = current.distance();
        let mut reward = 0.0;

        if after < before {
            reward += 2.0;
        } else if after > before {
            reward -= 2.0;
        }

        match action {
            PredatorAction::Hide if after > 5.0 => reward += 1.0,
            PredatorAction::Attack if after <= 3.0 => reward += 3.0,
            PredatorAction::Attack if after > 5.0 => reward -= 2.0,
            _ => {}
        }

        if action == PredatorAction::Advance && after > 3.0 && after <= 6.0 {
            reward += 1.0;
        }

        let startled = current.prey.state == PreyState::Fleeing
            && previous.prey.state != PreyState::Fleeing;
        if startled && after > 5.0 {
            reward -= 5.0;
        }

        reward - 0.5
    }
}

/// Only the terminal ±100 counts; every other tick is worth nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalOnly;

impl RewardShaper for TerminalOnly {
    fn name(&self) -> &str {
        "terminal"
    }

    fn shape(&self, _: &GameState, _: PredatorAction, current: &GameState, _: &StepOutcome) -> f64 {
        match current.status {
            GameStatus::Success => SUCCESS_REWARD,
            GameStatus::Failed => FAILURE_REWARD,
            GameStatus::InProgress => 0.0,
        }
    }
}

/// Named choice of shaper, for configuration files and the CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardShaping {
    #[default]
    Engine,
    Distance,
    Terminal,
}

impl RewardShaping {
    pub fn shaper(self) -> Box<dyn RewardShaper> {
        match self {
            RewardShaping::Engine => Box::new(EngineReward),
            RewardShaping::Distance => Box::new(DistanceShaping),
            RewardShaping::Terminal => Box::new(TerminalOnly),
        }
    }
}

impl fmt::Display for RewardShaping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RewardShaping::Engine => "engine",
            RewardShaping::Distance => "distance",
            RewardShaping::Terminal => "terminal",
        };
        f.write_str(name)
    }
}

impl FromStr for RewardShaping {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "engine" => Ok(RewardShaping::Engine),
            "distance" => Ok(RewardShaping::Distance),
            "terminal" | "terminal-only" | "terminal_only" => Ok(RewardShaping::Terminal),
            _ => Err(Error::ParseRewardShaping {
                input: s.to_string(),
            }),
        }
    }
}
