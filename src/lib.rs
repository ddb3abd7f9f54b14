//! Savanna: a lion learns to hunt an impala at a waterhole
//!
//! This crate provides:
//! - A deterministic 19x19 hunt simulation with a vision model for the prey
//! - A tabular Q-learning predator with eligibility traces and replay
//! - Rule abstraction over the learned Q-table
//! - JSON and MessagePack persistence for learned knowledge
//! - Training and step-by-step hunt pipelines behind a CLI

pub mod adapters;
pub mod cli;
pub mod error;
pub mod geometry;
pub mod hunt;
pub mod pipeline;
pub mod ports;
pub mod q_learning;

pub use error::{Error, Result};
pub use hunt::{GameEngine, GameState, GameStatus, PredatorAction, PreyAction};
pub use q_learning::{KnowledgeBase, QLearningAgent};
