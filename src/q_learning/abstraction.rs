//! Rule abstraction over the Q-table
//!
//! Entries that share a predator position and state, and agree on a positive
//! best action across several prey actions, are generalized into a single
//! readable rule:
//!
//! ```text
//! IF Lion at 5,5 AND Lion is attacking AND Impala does [look_left, look_front] THEN attack
//! ```

use std::{collections::BTreeMap, fmt, str::FromStr};

use tracing::debug;

use crate::{
    Error,
    geometry::GridPoint,
    hunt::{PredatorAction, PredatorState, PreyAction},
    q_learning::{knowledge_base::KnowledgeBase, state_key::StateKey},
};

/// A generalized statement about which predator action pays off
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AbstractionRule {
    pub position: GridPoint,
    pub predator_state: PredatorState,
    /// Prey actions whose entries contributed, in discovery order.
    pub prey_actions: Vec<PreyAction>,
    pub action: PredatorAction,
}

impl AbstractionRule {
    /// Whether this rule speaks about the situation described by `key`.
    pub fn matches(&self, key: &StateKey) -> bool {
        self.position == key.position
            && self.predator_state == key.predator_state
            && self.prey_actions.contains(&key.prey_action)
    }
}

impl fmt::Display for AbstractionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let prey_actions = self
            .prey_actions
            .iter()
            .map(|action| action.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        write!(
            f,
            "IF Lion at {} AND Lion is {} AND Impala does [{}] THEN {}",
            self.position, self.predator_state, prey_actions, self.action
        )
    }
}

impl FromStr for AbstractionRule {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| Error::InvalidRule {
            rule: s.to_string(),
            reason: reason.to_string(),
        };

        let rest = s
            .strip_prefix("IF Lion at ")
            .ok_or_else(|| invalid("missing 'IF Lion at' prefix"))?;
        let (position, rest) = rest
            .split_once(" AND Lion is ")
            .ok_or_else(|| invalid("missing predator state clause"))?;
        let (predator_state, rest) = rest
            .split_once(" AND Impala does [")
            .ok_or_else(|| invalid("missing prey action clause"))?;
        let (prey_actions, action) = rest
            .split_once("] THEN ")
            .ok_or_else(|| invalid("missing THEN clause"))?;

        let position = position
            .parse::<GridPoint>()
            .map_err(|e| invalid(&e.to_string()))?;
        let predator_state = predator_state
            .parse::<PredatorState>()
            .map_err(|e| invalid(&e.to_string()))?;
        let action = action
            .parse::<PredatorAction>()
            .map_err(|e| invalid(&e.to_string()))?;
        let prey_actions = prey_actions
            .split(", ")
            .map(|item| item.parse::<PreyAction>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| invalid(&e.to_string()))?;

        Ok(Self {
            position,
            predator_state,
            prey_actions,
            action,
        })
    }
}

/// Best action in a Q-table row; ties go to the earliest action.
pub fn best_action(row: &[f64; 3]) -> (PredatorAction, f64) {
    let mut best = (PredatorAction::ALL[0], row[0]);
    for action in PredatorAction::ALL.into_iter().skip(1) {
        let value = row[action.index()];
        if value > best.1 {
            best = (action, value);
        }
    }
    best
}

type RuleScope = (GridPoint, PredatorState);

/// Mines the knowledge base for rules
#[derive(Debug, Clone, Copy, Default)]
pub struct AbstractionEngine;

impl AbstractionEngine {
    pub fn new() -> Self {
        Self
    }

    /// Scan the Q-table and append any newly discovered rules.
    ///
    /// Returns only the rules added by this pass. Existing rules are never
    /// edited or removed.
    pub fn abstract_knowledge(&self, knowledge: &mut KnowledgeBase) -> Vec<AbstractionRule> {
        let mut groups: BTreeMap<RuleScope, BTreeMap<PredatorAction, Vec<PreyAction>>> =
            BTreeMap::new();

        let mut entries: Vec<(&StateKey, &[f64; 3])> = knowledge.entries().collect();
        entries.sort_by_key(|(key, _)| **key);

        for (key, row) in entries {
            let (action, value) = best_action(row);
            if value > 0.0 {
                groups
                    .entry((key.position, key.predator_state))
                    .or_default()
                    .entry(action)
                    .or_default()
                    .push(key.prey_action);
            }
        }

        let mut discovered = Vec::new();
        for ((position, predator_state), by_action) in groups {
            for (action, prey_actions) in by_action {
                if prey_actions.len() < 2 {
                    continue;
                }
                let rule = AbstractionRule {
                    position,
                    predator_state,
                    prey_actions,
                    action,
                };
                if knowledge.add_abstraction(rule.clone()) {
                    discovered.push(rule);
                }
            }
        }

        debug!(
            new_rules = discovered.len(),
            total_rules = knowledge.abstractions().len(),
            "abstraction pass complete"
        );
        discovered
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(row: i32, col: i32, prey_action: PreyAction, state: PredatorState) -> StateKey {
        StateKey::new(GridPoint::new(row, col), prey_action, state)
    }

    #[test]
    fn test_rule_text_roundtrip() {
        let text = "IF Lion at 5,5 AND Lion is attacking AND Impala does [look_front, look_left] THEN attack";
        let rule: AbstractionRule = text.parse().unwrap();
        assert_eq!(rule.position, GridPoint::new(5, 5));
        assert_eq!(
            rule.prey_actions,
            vec![PreyAction::LookFront, PreyAction::LookLeft]
        );
        assert_eq!(rule.to_string(), text);
    }

    #[test]
    fn test_malformed_rule_is_rejected() {
        let result = "IF Lion at 5,5 THEN attack".parse::<AbstractionRule>();
        assert!(matches!(result, Err(Error::InvalidRule { .. })));
    }

    #[test]
    fn test_two_prey_actions_sharing_best_action_yield_one_rule() {
        let mut kb = KnowledgeBase::new();
        let a = key(4, 4, PreyAction::LookLeft, PredatorState::Normal);
        let b = key(4, 4, PreyAction::Drink, PredatorState::Normal);
        kb.update_q_value(&a, PredatorAction::Advance, 2.0);
        kb.update_q_value(&b, PredatorAction::Advance, 0.5);

        let engine = AbstractionEngine::new();
        let rules = engine.abstract_knowledge(&mut kb);

        assert_eq!(rules.len(), 1);
        assert_eq!(
            rules[0].to_string(),
            "IF Lion at 4,4 AND Lion is normal AND Impala does [look_left, drink] THEN advance"
        );

        let again = engine.abstract_knowledge(&mut kb);
        assert!(again.is_empty());
        assert_eq!(kb.abstractions().len(), 1);
    }

    #[test]
    fn test_non_positive_and_split_entries_are_ignored() {
        let mut kb = KnowledgeBase::new();
        // Different best actions
        kb.update_q_value(
            &key(2, 2, PreyAction::LookLeft, PredatorState::Hidden),
            PredatorAction::Hide,
            1.0,
        );
        kb.update_q_value(
            &key(2, 2, PreyAction::LookRight, PredatorState::Hidden),
            PredatorAction::Attack,
            1.0,
        );
        // Negative values
        kb.update_q_value(
            &key(3, 3, PreyAction::LookLeft, PredatorState::Normal),
            PredatorAction::Advance,
            -1.0,
        );
        kb.update_q_value(
            &key(3, 3, PreyAction::LookRight, PredatorState::Normal),
            PredatorAction::Advance,
            -1.0,
        );
        // Different predator states
        kb.update_q_value(
            &key(5, 5, PreyAction::LookLeft, PredatorState::Normal),
            PredatorAction::Advance,
            1.0,
        );
        kb.update_q_value(
            &key(5, 5, PreyAction::LookRight, PredatorState::Hidden),
            PredatorAction::Advance,
            1.0,
        );

        let rules = AbstractionEngine::new().abstract_knowledge(&mut kb);
        assert!(rules.is_empty());
    }

    #[test]
    fn test_rule_matches_state_key() {
        let rule: AbstractionRule =
            "IF Lion at 0,9 AND Lion is normal AND Impala does [drink] THEN advance"
                .parse()
                .unwrap();
        assert!(rule.matches(&key(0, 9, PreyAction::Drink, PredatorState::Normal)));
        assert!(!rule.matches(&key(0, 9, PreyAction::LookLeft, PredatorState::Normal)));
        assert!(!rule.matches(&key(0, 9, PreyAction::Drink, PredatorState::Hidden)));
    }

    #[test]
    fn test_best_action_prefers_earliest_on_tie() {
        assert_eq!(best_action(&[1.0, 1.0, 0.0]).0, PredatorAction::Advance);
        assert_eq!(best_action(&[0.0, 2.0, 2.0]).0, PredatorAction::Hide);
        assert_eq!(best_action(&[-1.0, -3.0, 0.5]).0, PredatorAction::Attack);
    }
}
