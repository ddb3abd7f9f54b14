//! MessagePack implementation of the knowledge repository.
//!
//! Compact binary encoding via rmp_serde; used as the secondary format when
//! no JSON artifact exists.

use std::{
    fs::File,
    io::{BufReader, BufWriter},
    path::Path,
};

use crate::{Result, error::Error, ports::KnowledgeRepository, q_learning::KnowledgeSnapshot};

/// MessagePack-based knowledge repository.
#[derive(Debug, Clone, Copy, Default)]
pub struct MsgPackRepository;

impl MsgPackRepository {
    /// Create a new MessagePack repository.
    pub fn new() -> Self {
        Self
    }
}

impl KnowledgeRepository for MsgPackRepository {
    fn extension(&self) -> &'static str {
        "msgpack"
    }

    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn save(&self, snapshot: &KnowledgeSnapshot, path: &Path) -> Result<()> {
        let file = File::create(path).map_err(|source| Error::Io {
            operation: format!("create file {path:?}"),
            source,
        })?;
        let mut writer = BufWriter::new(file);

        rmp_serde::encode::write_named(&mut writer, snapshot).map_err(|e| {
            Error::SerializationContext {
                operation: "serialize knowledge to MessagePack".to_string(),
                message: e.to_string(),
            }
        })?;

        Ok(())
    }

    fn load(&self, path: &Path) -> Result<KnowledgeSnapshot> {
        let file = File::open(path).map_err(|source| Error::Io {
            operation: format!("open file {path:?}"),
            source,
        })?;

        rmp_serde::decode::from_read(BufReader::new(file)).map_err(|e| {
            Error::SerializationContext {
                operation: "deserialize knowledge from MessagePack".to_string(),
                message: e.to_string(),
            }
        })
    }
}
