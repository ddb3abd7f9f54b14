//! Reward shaping port
//!
//! The engine's own reward (−1 per tick, ±100 on termination) is the default
//! learning signal. A shaper may replace it with something denser.

use crate::hunt::{GameState, PredatorAction, StepOutcome};

/// Strategy turning one engine transition into the reward used for learning
///
/// # Examples
///
/// ```
/// use savanna::hunt::{GameState, PredatorAction, StepOutcome};
/// use savanna::ports::RewardShaper;
///
/// struct Halved;
///
/// impl RewardShaper for Halved {
///     fn name(&self) -> &str {
///         "halved"
///     }
///
///     fn shape(
///         &self,
///         _previous: &GameState,
///         _action: PredatorAction,
///         _current: &GameState,
///         outcome: &StepOutcome,
///     ) -> f64 {
///         outcome.reward / 2.0
///     }
/// }
/// ```
pub trait RewardShaper: Send {
    fn name(&self) -> &str;

    /// Reward for the transition `previous → current` produced by `action`.
    ///
    /// `outcome` carries the engine's raw reward, the done flag and the info string.
    fn shape(
        &self,
        previous: &GameState,
        action: PredatorAction,
        current: &GameState,
        outcome: &StepOutcome,
    ) -> f64;
}
