//! Discretized learning state

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    Error,
    geometry::GridPoint,
    hunt::{GameState, PredatorState, PreyAction},
};

/// Q-table key: where the predator is, what the prey just did, and the predator's state
///
/// Renders as `"row,col|prey_action|predator_state"`, e.g. `"0,9|look_front|normal"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StateKey {
    pub position: GridPoint,
    pub prey_action: PreyAction,
    pub predator_state: PredatorState,
}

impl StateKey {
    pub fn new(position: GridPoint, prey_action: PreyAction, predator_state: PredatorState) -> Self {
        Self {
            position,
            prey_action,
            predator_state,
        }
    }

    /// Key describing `state` as seen after the prey performed `prey_action`.
    pub fn observe(state: &GameState, prey_action: PreyAction) -> Self {
        Self::new(state.predator.position, prey_action, state.predator.state)
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}|{}|{}",
            self.position, self.prey_action, self.predator_state
        )
    }
}

impl FromStr for StateKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidStateKey { key: s.to_string() };

        let mut parts = s.split('|');
        let (Some(position), Some(prey_action), Some(predator_state), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(invalid());
        };

        Ok(Self {
            position: position.parse().map_err(|_| invalid())?,
            prey_action: prey_action.parse().map_err(|_| invalid())?,
            predator_state: predator_state.parse().map_err(|_| invalid())?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_key_text_form() {
        let key = StateKey::new(
            GridPoint::new(0, 9),
            PreyAction::LookFront,
            PredatorState::Normal,
        );
        assert_eq!(key.to_string(), "0,9|look_front|normal");
        assert_eq!("0,9|look_front|normal".parse::<StateKey>().unwrap(), key);
    }

    #[test]
    fn test_state_key_rejects_malformed_input() {
        for bad in [
            "",
            "0,9|look_front",
            "0,9|look_front|normal|extra",
            "0;9|look_front|normal",
            "0,9|sniff|normal",
            "0,9|drink|sleeping",
            "30,9|drink|normal",
        ] {
            assert!(
                matches!(bad.parse::<StateKey>(), Err(Error::InvalidStateKey { .. })),
                "accepted {bad:?}"
            );
        }
    }
}
