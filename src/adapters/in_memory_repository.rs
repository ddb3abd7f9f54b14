//! In-memory knowledge repository for testing.
//!
//! Keeps encoded snapshots in a shared map so sessions can be exercised
//! without touching the file system.

use std::{
    collections::HashMap,
    path::Path,
    sync::{Arc, Mutex, MutexGuard},
};

use crate::{Result, error::Error, ports::KnowledgeRepository, q_learning::KnowledgeSnapshot};

/// In-memory repository.
///
/// All clones share the same underlying storage.
///
/// # Examples
///
/// ```
/// use savanna::adapters::InMemoryRepository;
/// use savanna::ports::KnowledgeRepository;
/// use savanna::q_learning::KnowledgeBase;
/// use std::path::Path;
///
/// let repo = InMemoryRepository::new();
/// let knowledge = KnowledgeBase::new();
///
/// repo.save(&knowledge.snapshot(), Path::new("brain"))?;
/// let loaded = repo.load(Path::new("brain"))?;
/// assert!(loaded.q_table.is_empty());
/// # Ok::<(), savanna::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryRepository {
    storage: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl InMemoryRepository {
    /// Create a new empty in-memory repository.
    pub fn new() -> Self {
        Self::default()
    }

    fn storage(&self) -> MutexGuard<'_, HashMap<String, Vec<u8>>> {
        // A poisoned map still holds complete entries.
        self.storage
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Number of snapshots currently stored.
    pub fn count(&self) -> usize {
        self.storage().len()
    }

    /// Drop every stored snapshot.
    pub fn clear(&self) {
        self.storage().clear();
    }
}

fn key(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

impl KnowledgeRepository for InMemoryRepository {
    fn extension(&self) -> &'static str {
        "mem"
    }

    fn exists(&self, path: &Path) -> bool {
        self.storage().contains_key(&key(path))
    }

    fn save(&self, snapshot: &KnowledgeSnapshot, path: &Path) -> Result<()> {
        let bytes = rmp_serde::to_vec_named(snapshot).map_err(|e| Error::SerializationContext {
            operation: "serialize knowledge for in-memory storage".to_string(),
            message: e.to_string(),
        })?;

        self.storage().insert(key(path), bytes);
        Ok(())
    }

    fn load(&self, path: &Path) -> Result<KnowledgeSnapshot> {
        let storage = self.storage();
        let bytes = storage.get(&key(path)).ok_or_else(|| Error::Io {
            operation: format!("load knowledge from in-memory storage at {path:?}"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "key not found in memory"),
        })?;

        rmp_serde::from_slice(bytes).map_err(|e| Error::SerializationContext {
            operation: "deserialize knowledge from in-memory storage".to_string(),
            message: e.to_string(),
        })
    }
}
