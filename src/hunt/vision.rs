//! Prey line of sight
//!
//! Each look direction covers one triangular sector spanned by the map
//! centre and two corners of the grid.

use crate::{
    geometry::{GridPoint, point_in_triangle},
    hunt::entities::{PredatorState, PreyAction},
};

const CENTRE: GridPoint = GridPoint::new(9, 9);
const CORNER_NW: GridPoint = GridPoint::new(0, 0);
const CORNER_NE: GridPoint = GridPoint::new(0, 18);
const CORNER_SE: GridPoint = GridPoint::new(18, 18);
const CORNER_SW: GridPoint = GridPoint::new(18, 0);

/// Decides whether the prey can see the predator
#[derive(Debug, Clone, Copy, Default)]
pub struct VisionCalculator;

impl VisionCalculator {
    pub fn new() -> Self {
        Self
    }

    /// The sector watched under a look action, or `None` for actions without one.
    pub fn sector(&self, prey_action: PreyAction) -> Option<[GridPoint; 3]> {
        match prey_action {
            PreyAction::LookFront => Some([CORNER_NW, CENTRE, CORNER_NE]),
            PreyAction::LookLeft => Some([CORNER_NW, CENTRE, CORNER_SW]),
            PreyAction::LookRight => Some([CORNER_NE, CENTRE, CORNER_SE]),
            PreyAction::Drink | PreyAction::Flee => None,
        }
    }

    /// Whether a predator at `position` in `state` is seen while the prey performs `prey_action`.
    ///
    /// A hidden predator is never seen. A drinking prey sees nothing; a fleeing
    /// prey is treated as seeing everything.
    pub fn is_predator_visible(
        &self,
        position: GridPoint,
        state: PredatorState,
        prey_action: PreyAction,
    ) -> bool {
        if state == PredatorState::Hidden {
            return false;
        }

        match prey_action {
            PreyAction::Flee => true,
            PreyAction::Drink => false,
            look => self
                .sector(look)
                .is_some_and(|[a, b, c]| point_in_triangle(position, a, b, c)),
        }
    }
}
