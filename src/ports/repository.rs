//! Repository port for knowledge persistence.
//!
//! This module defines the trait boundary between the learning core and the
//! storage formats used for its snapshots.

use std::path::Path;

use crate::{Result, q_learning::KnowledgeSnapshot};

/// Port for persisting and loading knowledge snapshots.
///
/// Implementations decide the encoding; the learning core only deals in
/// [`KnowledgeSnapshot`] values.
///
/// # Examples
///
/// ```no_run
/// use savanna::ports::KnowledgeRepository;
/// use savanna::q_learning::KnowledgeBase;
/// use std::path::Path;
///
/// fn checkpoint<R: KnowledgeRepository>(
///     repo: &R,
///     knowledge: &KnowledgeBase,
///     path: &Path,
/// ) -> savanna::Result<()> {
///     repo.save(&knowledge.snapshot(), path)
/// }
/// ```
pub trait KnowledgeRepository {
    /// File extension used by this repository, without the leading dot.
    fn extension(&self) -> &'static str;

    /// Whether an artifact exists at `path`.
    fn exists(&self, path: &Path) -> bool;

    /// Save a snapshot to persistent storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the path cannot be written or serialization fails.
    fn save(&self, snapshot: &KnowledgeSnapshot, path: &Path) -> Result<()>;

    /// Load a snapshot from persistent storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the artifact is missing, unreadable or corrupt.
    fn load(&self, path: &Path) -> Result<KnowledgeSnapshot>;
}
