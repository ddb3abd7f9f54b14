//! Prey behaviour: where the prey's chosen action comes from each tick

use std::fmt;

use rand::{Rng, seq::IndexedRandom};
use serde::{Deserialize, Serialize};

use crate::{Error, Result, hunt::PreyAction};

/// Source of the prey's chosen action
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum PreyBehavior {
    /// Uniform choice among every action except flee.
    #[default]
    Random,
    /// A fixed sequence replayed cyclically by tick.
    Programmed { sequence: Vec<PreyAction> },
}

impl PreyBehavior {
    /// Build a programmed behaviour, rejecting empty sequences and flee.
    pub fn programmed(sequence: Vec<PreyAction>) -> Result<Self> {
        let behavior = PreyBehavior::Programmed { sequence };
        behavior.validate()?;
        Ok(behavior)
    }

    /// Parse a comma-separated list such as `"look_left, drink, look_front"`.
    pub fn parse_sequence(text: &str) -> Result<Vec<PreyAction>> {
        text.split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(str::parse)
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            PreyBehavior::Random => Ok(()),
            PreyBehavior::Programmed { sequence } => {
                if sequence.is_empty() {
                    return Err(Error::EmptyPreySequence);
                }
                match sequence.iter().position(|a| *a == PreyAction::Flee) {
                    Some(position) => Err(Error::FleeInPreySequence { position }),
                    None => Ok(()),
                }
            }
        }
    }

    /// Action for the tick that starts at `time_step`.
    pub fn next_action<R: Rng + ?Sized>(&self, time_step: u32, rng: &mut R) -> PreyAction {
        match self {
            PreyBehavior::Random => *PreyAction::CHOOSABLE
                .choose(rng)
                .unwrap_or(&PreyAction::LookFront),
            PreyBehavior::Programmed { sequence } => {
                if sequence.is_empty() {
                    return PreyAction::LookFront;
                }
                sequence[time_step as usize % sequence.len()]
            }
        }
    }
}

impl fmt::Display for PreyBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreyBehavior::Random => f.write_str("random"),
            PreyBehavior::Programmed { sequence } => {
                let items: Vec<&str> = sequence.iter().map(|a| a.as_str()).collect();
                write!(f, "programmed [{}]", items.join(", "))
            }
        }
    }
}
