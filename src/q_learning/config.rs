//! Hyperparameters for the Q-learning agent.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Configuration for creating a [`QLearningAgent`](super::QLearningAgent).
///
/// # Examples
///
/// ```
/// use savanna::q_learning::AgentConfig;
///
/// let config = AgentConfig::default()
///     .with_learning_rate(0.2)
///     .with_epsilon(0.5, 0.05, 0.99)
///     .with_seed(42);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Learning rate α
    pub learning_rate: f64,
    /// Discount factor γ
    pub discount_factor: f64,
    /// Exploration rate at the start of training
    pub epsilon_start: f64,
    /// Floor for the exploration rate
    pub epsilon_end: f64,
    /// Multiplicative decay applied once per episode
    pub epsilon_decay: f64,
    /// Eligibility trace decay λ
    pub trace_decay: f64,
    /// Maximum number of transitions kept for replay
    pub replay_capacity: usize,
    /// Random seed for reproducibility
    pub seed: Option<u64>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            discount_factor: 0.9,
            epsilon_start: 0.3,
            epsilon_end: 0.01,
            epsilon_decay: 0.995,
            trace_decay: 0.8,
            replay_capacity: 10_000,
            seed: None,
        }
    }
}

impl AgentConfig {
    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_discount_factor(mut self, discount_factor: f64) -> Self {
        self.discount_factor = discount_factor;
        self
    }

    /// Set the exploration schedule.
    pub fn with_epsilon(mut self, start: f64, end: f64, decay: f64) -> Self {
        self.epsilon_start = start;
        self.epsilon_end = end;
        self.epsilon_decay = decay;
        self
    }

    pub fn with_trace_decay(mut self, trace_decay: f64) -> Self {
        self.trace_decay = trace_decay;
        self
    }

    pub fn with_replay_capacity(mut self, capacity: usize) -> Self {
        self.replay_capacity = capacity;
        self
    }

    /// Set the random seed for deterministic behavior.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Check that every rate lies in `[0, 1]` and the replay buffer can hold something.
    pub fn validate(&self) -> Result<()> {
        let rates = [
            ("learning_rate", self.learning_rate),
            ("discount_factor", self.discount_factor),
            ("epsilon_start", self.epsilon_start),
            ("epsilon_end", self.epsilon_end),
            ("epsilon_decay", self.epsilon_decay),
            ("trace_decay", self.trace_decay),
        ];
        for (name, value) in rates {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::InvalidConfiguration {
                    message: format!("{name} must be within [0, 1], got {value}"),
                });
            }
        }

        if self.epsilon_end > self.epsilon_start {
            return Err(Error::InvalidConfiguration {
                message: format!(
                    "epsilon_end ({}) must not exceed epsilon_start ({})",
                    self.epsilon_end, self.epsilon_start
                ),
            });
        }

        if self.replay_capacity == 0 {
            return Err(Error::InvalidConfiguration {
                message: "replay_capacity must be greater than zero".to_string(),
            });
        }

        Ok(())
    }
}
