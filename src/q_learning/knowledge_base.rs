//! Q-table plus the generalized rules mined from it

use std::{
    collections::{BTreeMap, HashMap, HashSet},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    Error, Result,
    adapters::PersistenceFormat,
    hunt::PredatorAction,
    ports::KnowledgeRepository,
    q_learning::{abstraction::AbstractionRule, state_key::StateKey},
};

/// Persistable form of a [`KnowledgeBase`]
///
/// `q_table` maps rendered state keys to action names to values. Maps are
/// ordered so serialized output is stable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeSnapshot {
    pub q_table: BTreeMap<String, BTreeMap<String, f64>>,
    #[serde(default)]
    pub abstractions: Vec<String>,
}

/// Learned action values and abstraction rules
///
/// Reads through [`get_q_value`](Self::get_q_value) create a zeroed row for
/// unseen keys; [`q_values`](Self::q_values) inspects without side effects.
#[derive(Debug, Clone, Default)]
pub struct KnowledgeBase {
    q_table: HashMap<StateKey, [f64; 3]>,
    abstractions: Vec<AbstractionRule>,
    rendered: HashSet<String>,
}

impl KnowledgeBase {
    pub fn new() -> Self {
        Self::default()
    }

    fn row_mut(&mut self, key: &StateKey) -> &mut [f64; 3] {
        self.q_table.entry(*key).or_insert([0.0; 3])
    }

    /// Current estimate for `(key, action)`, materializing the row if needed.
    pub fn get_q_value(&mut self, key: &StateKey, action: PredatorAction) -> f64 {
        self.row_mut(key)[action.index()]
    }

    /// Overwrite the estimate for `(key, action)`.
    pub fn update_q_value(&mut self, key: &StateKey, action: PredatorAction, value: f64) {
        self.row_mut(key)[action.index()] = value;
    }

    /// Whole row for `key`, materializing it if needed.
    pub fn row(&mut self, key: &StateKey) -> [f64; 3] {
        *self.row_mut(key)
    }

    /// Largest estimate over all predator actions in `key`.
    pub fn max_q_value(&mut self, key: &StateKey) -> f64 {
        self.row(key).into_iter().fold(f64::NEG_INFINITY, f64::max)
    }

    /// Row for `key` if it has been seen; never creates one.
    pub fn q_values(&self, key: &StateKey) -> Option<[f64; 3]> {
        self.q_table.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.q_table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.q_table.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&StateKey, &[f64; 3])> {
        self.q_table.iter()
    }

    pub fn abstractions(&self) -> &[AbstractionRule] {
        &self.abstractions
    }

    /// Append a rule unless an identical one is already known.
    ///
    /// Returns `true` if the rule was added.
    pub fn add_abstraction(&mut self, rule: AbstractionRule) -> bool {
        if self.rendered.insert(rule.to_string()) {
            self.abstractions.push(rule);
            true
        } else {
            false
        }
    }

    /// Rules that speak about `key`.
    pub fn rules_matching(&self, key: &StateKey) -> Vec<&AbstractionRule> {
        self.abstractions
            .iter()
            .filter(|rule| rule.matches(key))
            .collect()
    }

    /// Forget all values and rules.
    pub fn clear(&mut self) {
        self.q_table.clear();
        self.abstractions.clear();
        self.rendered.clear();
    }

    pub fn snapshot(&self) -> KnowledgeSnapshot {
        let q_table = self
            .q_table
            .iter()
            .map(|(key, row)| {
                let actions = PredatorAction::ALL
                    .into_iter()
                    .map(|action| (action.to_string(), row[action.index()]))
                    .collect();
                (key.to_string(), actions)
            })
            .collect();

        KnowledgeSnapshot {
            q_table,
            abstractions: self.abstractions.iter().map(ToString::to_string).collect(),
        }
    }

    /// Rebuild a knowledge base from a snapshot.
    ///
    /// Actions missing from a stored row default to 0.0.
    ///
    /// # Errors
    ///
    /// Fails on malformed state keys, unknown action names or malformed rules.
    pub fn from_snapshot(snapshot: KnowledgeSnapshot) -> Result<Self> {
        let mut knowledge = Self::new();

        for (key, actions) in snapshot.q_table {
            let key: StateKey = key.parse()?;
            let row = knowledge.row_mut(&key);
            for (action, value) in actions {
                let action: PredatorAction = action.parse()?;
                row[action.index()] = value;
            }
        }

        for rule in snapshot.abstractions {
            knowledge.add_abstraction(rule.parse()?);
        }

        Ok(knowledge)
    }

    /// Replace the contents of `self` with those of `other`.
    pub fn replace(&mut self, other: KnowledgeBase) {
        *self = other;
    }

    /// Path of the artifact called `name` in `dir` for `format`.
    pub fn artifact_path(dir: &Path, name: &str, format: PersistenceFormat) -> PathBuf {
        dir.join(format!("{name}.{}", format.extension()))
    }

    /// Knowledge artifacts directly inside `dir`, sorted by path.
    ///
    /// A missing directory has no artifacts.
    pub fn list_artifacts(dir: &Path) -> Result<Vec<(PathBuf, PersistenceFormat)>> {
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let entries = std::fs::read_dir(dir).map_err(|source| Error::Io {
            operation: format!("list knowledge directory {dir:?}"),
            source,
        })?;

        let mut artifacts = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            let format = path
                .extension()
                .and_then(|ext| ext.to_str())
                .and_then(|ext| {
                    PersistenceFormat::LOAD_ORDER
                        .into_iter()
                        .find(|format| format.extension() == ext)
                });
            if let Some(format) = format {
                artifacts.push((path, format));
            }
        }
        artifacts.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(artifacts)
    }

    /// Delete every knowledge artifact in `dir`, returning the removed paths.
    pub fn remove_artifacts(dir: &Path) -> Result<Vec<PathBuf>> {
        let mut removed = Vec::new();
        for (path, _) in Self::list_artifacts(dir)? {
            std::fs::remove_file(&path).map_err(|source| Error::Io {
                operation: format!("remove knowledge artifact {path:?}"),
                source,
            })?;
            removed.push(path);
        }
        if !removed.is_empty() {
            warn!(dir = %dir.display(), removed = removed.len(), "knowledge artifacts deleted");
        }
        Ok(removed)
    }

    /// Save through an arbitrary repository.
    pub fn save_to(&self, repo: &dyn KnowledgeRepository, path: &Path) -> Result<()> {
        repo.save(&self.snapshot(), path)
    }

    /// Load through an arbitrary repository, replacing the current contents.
    ///
    /// Returns `Ok(false)` and leaves `self` unchanged if nothing is stored at `path`.
    pub fn load_from(&mut self, repo: &dyn KnowledgeRepository, path: &Path) -> Result<bool> {
        if !repo.exists(path) {
            return Ok(false);
        }
        let loaded = Self::from_snapshot(repo.load(path)?)?;
        self.replace(loaded);
        Ok(true)
    }

    /// Save as `dir/name.<ext>`, creating `dir` if needed.
    pub fn save(&self, dir: &Path, name: &str, format: PersistenceFormat) -> Result<PathBuf> {
        std::fs::create_dir_all(dir).map_err(|source| Error::Io {
            operation: format!("create knowledge directory {dir:?}"),
            source,
        })?;

        let path = Self::artifact_path(dir, name, format);
        self.save_to(format.repository().as_ref(), &path)?;
        debug!(path = %path.display(), states = self.len(), "knowledge saved");
        Ok(path)
    }

    /// Load `dir/name`, trying JSON first and MessagePack second.
    ///
    /// Returns the format that was read, or `None` (with a warning) when no
    /// artifact exists, in which case the current contents are kept.
    ///
    /// # Errors
    ///
    /// An artifact that exists but cannot be read or decoded is an error.
    pub fn load(&mut self, dir: &Path, name: &str) -> Result<Option<PersistenceFormat>> {
        for format in PersistenceFormat::LOAD_ORDER {
            let path = Self::artifact_path(dir, name, format);
            if self.load_from(format.repository().as_ref(), &path)? {
                debug!(path = %path.display(), states = self.len(), "knowledge loaded");
                return Ok(Some(format));
            }
        }

        warn!(
            dir = %dir.display(),
            name,
            "no knowledge artifact found; keeping current knowledge"
        );
        Ok(None)
    }
}
