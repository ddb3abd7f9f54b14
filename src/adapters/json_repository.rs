//! JSON implementation of the knowledge repository.
//!
//! The primary on-disk format: pretty-printed and key-sorted so that two
//! checkpoints can be diffed by eye.

use std::{
    fs::{self, File},
    io::BufWriter,
    path::Path,
};

use crate::{Result, error::Error, ports::KnowledgeRepository, q_learning::KnowledgeSnapshot};

/// JSON-based knowledge repository.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonRepository;

impl JsonRepository {
    pub fn new() -> Self {
        Self
    }
}

impl KnowledgeRepository for JsonRepository {
    fn extension(&self) -> &'static str {
        "json"
    }

    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn save(&self, snapshot: &KnowledgeSnapshot, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(|source| Error::Io {
            operation: format!("create file {path:?}"),
            source,
        })?;
        serde_json::to_writer_pretty(BufWriter::new(file), snapshot)?;
        Ok(())
    }

    fn load(&self, path: &Path) -> Result<KnowledgeSnapshot> {
        let contents = fs::read_to_string(path).map_err(|source| Error::Io {
            operation: format!("read file {path:?}"),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|e| Error::SerializationContext {
            operation: format!("parse knowledge JSON {path:?}"),
            message: e.to_string(),
        })
    }
}
