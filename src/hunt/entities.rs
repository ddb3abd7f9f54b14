//! Agents, their states and actions, and the fixed map layout

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::geometry::{GRID_SIZE, GridPoint};

/// Behavioural state of the predator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredatorState {
    #[default]
    Normal,
    Hidden,
    /// Entered by attacking; the predator keeps attacking for the rest of the episode.
    Attacking,
}

impl PredatorState {
    pub const ALL: [PredatorState; 3] = [
        PredatorState::Normal,
        PredatorState::Hidden,
        PredatorState::Attacking,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PredatorState::Normal => "normal",
            PredatorState::Hidden => "hidden",
            PredatorState::Attacking => "attacking",
        }
    }
}

impl fmt::Display for PredatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PredatorState {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "normal" => Ok(PredatorState::Normal),
            "hidden" => Ok(PredatorState::Hidden),
            "attacking" => Ok(PredatorState::Attacking),
            _ => Err(crate::Error::ParsePredatorState {
                input: s.to_string(),
            }),
        }
    }
}

/// Behavioural state of the prey
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreyState {
    #[default]
    Normal,
    Drinking,
    /// Entered once a flee trigger fires; never left within an episode.
    Fleeing,
}

impl PreyState {
    pub fn as_str(self) -> &'static str {
        match self {
            PreyState::Normal => "normal",
            PreyState::Drinking => "drinking",
            PreyState::Fleeing => "fleeing",
        }
    }
}

impl fmt::Display for PreyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Action available to the predator on each tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredatorAction {
    Advance,
    Hide,
    Attack,
}

impl PredatorAction {
    /// All actions, in Q-table row order.
    pub const ALL: [PredatorAction; 3] = [
        PredatorAction::Advance,
        PredatorAction::Hide,
        PredatorAction::Attack,
    ];

    /// Index of this action within a Q-table row.
    pub fn index(self) -> usize {
        match self {
            PredatorAction::Advance => 0,
            PredatorAction::Hide => 1,
            PredatorAction::Attack => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PredatorAction::Advance => "advance",
            PredatorAction::Hide => "hide",
            PredatorAction::Attack => "attack",
        }
    }
}

impl fmt::Display for PredatorAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PredatorAction {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "advance" => Ok(PredatorAction::Advance),
            "hide" => Ok(PredatorAction::Hide),
            "attack" => Ok(PredatorAction::Attack),
            _ => Err(crate::Error::ParsePredatorAction {
                input: s.to_string(),
            }),
        }
    }
}

/// Action taken by the prey on each tick
///
/// `Flee` is never chosen by a prey policy; it only appears as the effective
/// action once the prey is fleeing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PreyAction {
    LookLeft,
    LookRight,
    LookFront,
    Drink,
    Flee,
}

impl PreyAction {
    pub const ALL: [PreyAction; 5] = [
        PreyAction::LookLeft,
        PreyAction::LookRight,
        PreyAction::LookFront,
        PreyAction::Drink,
        PreyAction::Flee,
    ];

    /// Actions a prey policy may pick.
    pub const CHOOSABLE: [PreyAction; 4] = [
        PreyAction::LookLeft,
        PreyAction::LookRight,
        PreyAction::LookFront,
        PreyAction::Drink,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            PreyAction::LookLeft => "look_left",
            PreyAction::LookRight => "look_right",
            PreyAction::LookFront => "look_front",
            PreyAction::Drink => "drink",
            PreyAction::Flee => "flee",
        }
    }
}

impl fmt::Display for PreyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PreyAction {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "look_left" => Ok(PreyAction::LookLeft),
            "look_right" => Ok(PreyAction::LookRight),
            "look_front" => Ok(PreyAction::LookFront),
            "drink" => Ok(PreyAction::Drink),
            "flee" => Ok(PreyAction::Flee),
            _ => Err(crate::Error::ParsePreyAction {
                input: s.to_string(),
            }),
        }
    }
}

/// Direction the prey runs while fleeing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facing {
    East,
    West,
}

impl Facing {
    /// Column delta for one square of movement.
    pub fn column_step(self) -> i32 {
        match self {
            Facing::East => 1,
            Facing::West => -1,
        }
    }
}

/// Neighbour offsets examined by a single "move toward" step, in tie-break order.
const NEIGHBOUR_OFFSETS: [(i32, i32); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

/// The hunting agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Predator {
    pub position: GridPoint,
    pub state: PredatorState,
}

impl Predator {
    pub fn new(position: GridPoint) -> Self {
        Self {
            position,
            state: PredatorState::Normal,
        }
    }

    /// Move one cell toward `target`.
    ///
    /// Picks the neighbour closest to the target; staying put is not an option,
    /// so a predator already on the target steps onto an adjacent cell.
    pub fn move_towards(&mut self, target: GridPoint) {
        let mut best = self.position;
        let mut best_distance = f64::INFINITY;

        for (d_row, d_col) in NEIGHBOUR_OFFSETS {
            let candidate = self.position.offset(d_row, d_col);
            let candidate_distance = candidate.distance_to(target);
            if candidate_distance < best_distance {
                best_distance = candidate_distance;
                best = candidate;
            }
        }

        self.position = best;
    }
}

/// The hunted agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prey {
    pub position: GridPoint,
    pub state: PreyState,
    /// Set once the prey starts running.
    pub facing: Option<Facing>,
}

impl Prey {
    pub fn new(position: GridPoint) -> Self {
        Self {
            position,
            state: PreyState::Normal,
            facing: None,
        }
    }
}

impl Default for Prey {
    fn default() -> Self {
        Self::new(GameMap::PREY_HOME)
    }
}

/// Fixed layout of the play area
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameMap {
    pub width: i32,
    pub height: i32,
    pub waterhole_top_left: GridPoint,
    pub waterhole_bottom_right: GridPoint,
}

impl GameMap {
    /// Where the prey starts every episode.
    pub const PREY_HOME: GridPoint = GridPoint::new(9, 9);

    /// Predator start positions on the map perimeter, indexed 1 through 8.
    pub const START_POSITIONS: [(usize, GridPoint); 8] = [
        (1, GridPoint::new(0, 9)),
        (2, GridPoint::new(0, 18)),
        (3, GridPoint::new(9, 18)),
        (4, GridPoint::new(18, 18)),
        (5, GridPoint::new(18, 9)),
        (6, GridPoint::new(18, 0)),
        (7, GridPoint::new(9, 0)),
        (8, GridPoint::new(0, 0)),
    ];

    /// Look up a predator start position by its index.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidStartPosition`] for indices outside 1-8.
    pub fn start_position(index: usize) -> crate::Result<GridPoint> {
        Self::START_POSITIONS
            .iter()
            .find(|(i, _)| *i == index)
            .map(|(_, point)| *point)
            .ok_or(crate::Error::InvalidStartPosition { index })
    }

    /// Whether a point lies inside the waterhole rectangle.
    pub fn is_waterhole(&self, point: GridPoint) -> bool {
        (self.waterhole_top_left.row..=self.waterhole_bottom_right.row).contains(&point.row)
            && (self.waterhole_top_left.col..=self.waterhole_bottom_right.col).contains(&point.col)
    }
}

impl Default for GameMap {
    fn default() -> Self {
        Self {
            width: GRID_SIZE,
            height: GRID_SIZE,
            waterhole_top_left: GridPoint::new(6, 7),
            waterhole_bottom_right: GridPoint::new(8, 11),
        }
    }
}
