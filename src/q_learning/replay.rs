//! Fixed-capacity experience replay buffer

use std::collections::VecDeque;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{hunt::PredatorAction, q_learning::state_key::StateKey};

/// One learning transition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub state: StateKey,
    pub action: PredatorAction,
    pub reward: f64,
    pub next_state: StateKey,
    pub done: bool,
}

/// FIFO buffer of transitions; the oldest entry is evicted once full
#[derive(Debug, Clone)]
pub struct ExperienceReplay {
    buffer: VecDeque<Transition>,
    capacity: usize,
}

impl ExperienceReplay {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    pub fn add(&mut self, transition: Transition) {
        if self.capacity == 0 {
            return;
        }
        if self.buffer.len() == self.capacity {
            self.buffer.pop_front();
        }
        self.buffer.push_back(transition);
    }

    /// Draw `n` distinct transitions uniformly, or everything if fewer are held.
    pub fn sample<R: Rng + ?Sized>(&self, n: usize, rng: &mut R) -> Vec<Transition> {
        if self.buffer.len() <= n {
            return self.buffer.iter().cloned().collect();
        }
        rand::seq::index::sample(rng, self.buffer.len(), n)
            .into_iter()
            .map(|i| self.buffer[i].clone())
            .collect()
    }

    pub fn size(&self) -> usize {
        self.buffer.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &Transition> {
        self.buffer.iter()
    }
}
