//! Tabular Q-learning for the predator
//!
//! ## Components
//!
//! - [`StateKey`]: predator position, last prey action, predator state
//! - [`KnowledgeBase`]: lazily-populated Q-table plus abstraction rules
//! - [`ExperienceReplay`]: bounded FIFO of transitions for batch updates
//! - [`QLearningAgent`]: ε-greedy policy with one-step, trace and batch updates
//! - [`AbstractionEngine`]: mines the Q-table for readable rules
//!
//! ## Usage Example
//!
//! ```no_run
//! use savanna::hunt::{GameEngine, GameState, PreyAction};
//! use savanna::q_learning::{AgentConfig, QLearningAgent};
//!
//! let mut agent = QLearningAgent::new(AgentConfig::default().with_seed(7))?;
//! let engine = GameEngine::new();
//! let mut state = GameState::from_start_index(1)?;
//!
//! let key = agent.state_key(&state, PreyAction::Drink);
//! let action = agent.choose_action(&key);
//! let outcome = engine.step(&mut state, action, PreyAction::LookLeft)?;
//! let next = agent.state_key(&state, PreyAction::LookLeft);
//! agent.learn(&key, action, outcome.reward, &next, outcome.done);
//! # Ok::<(), savanna::Error>(())
//! ```

pub mod abstraction;
pub mod agent;
pub mod config;
pub mod knowledge_base;
pub mod replay;
pub mod state_key;

pub use abstraction::{AbstractionEngine, AbstractionRule};
pub use agent::QLearningAgent;
pub use config::AgentConfig;
pub use knowledge_base::{KnowledgeBase, KnowledgeSnapshot};
pub use replay::{ExperienceReplay, Transition};
pub use state_key::StateKey;
