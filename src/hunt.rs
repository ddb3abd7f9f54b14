//! The hunting world: map, agents, vision and the per-tick engine

pub mod engine;
pub mod entities;
pub mod vision;

pub use engine::{FleeReason, GameEngine, GameState, GameStatus, StepOutcome, StepRecord};
pub use entities::{
    Facing, GameMap, Predator, PredatorAction, PredatorState, Prey, PreyAction, PreyState,
};
pub use vision::VisionCalculator;
