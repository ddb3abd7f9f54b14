//! Shared helpers for the integration tests.

#![allow(dead_code)]

use savanna::{
    geometry::GridPoint,
    hunt::{PredatorAction, PredatorState, PreyAction},
    q_learning::{KnowledgeBase, StateKey},
};

pub fn key(row: i32, col: i32, prey_action: PreyAction, state: PredatorState) -> StateKey {
    StateKey::new(GridPoint::new(row, col), prey_action, state)
}

/// Knowledge with a handful of learned rows, two of which agree on advancing.
pub fn sample_knowledge() -> KnowledgeBase {
    let mut knowledge = KnowledgeBase::new();
    knowledge.update_q_value(
        &key(3, 9, PreyAction::Drink, PredatorState::Hidden),
        PredatorAction::Advance,
        4.5,
    );
    knowledge.update_q_value(
        &key(3, 9, PreyAction::LookRight, PredatorState::Hidden),
        PredatorAction::Advance,
        1.25,
    );
    knowledge.update_q_value(
        &key(8, 8, PreyAction::LookFront, PredatorState::Normal),
        PredatorAction::Attack,
        -7.0,
    );
    knowledge
}
