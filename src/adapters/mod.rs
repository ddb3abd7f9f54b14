//! Adapters implementing domain ports.
//!
//! Infrastructure implementations of the traits defined in the ports module.
//! Adapters depend on domain ports, not the other way around.

pub mod in_memory_repository;
pub mod json_repository;
pub mod msgpack_repository;

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

pub use in_memory_repository::InMemoryRepository;
pub use json_repository::JsonRepository;
pub use msgpack_repository::MsgPackRepository;

use crate::{Error, ports::KnowledgeRepository};

/// On-disk encoding for knowledge artifacts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PersistenceFormat {
    #[default]
    Json,
    MsgPack,
}

impl PersistenceFormat {
    /// Formats in load-preference order.
    pub const LOAD_ORDER: [PersistenceFormat; 2] =
        [PersistenceFormat::Json, PersistenceFormat::MsgPack];

    pub fn repository(self) -> Box<dyn KnowledgeRepository> {
        match self {
            PersistenceFormat::Json => Box::new(JsonRepository::new()),
            PersistenceFormat::MsgPack => Box::new(MsgPackRepository::new()),
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            PersistenceFormat::Json => "json",
            PersistenceFormat::MsgPack => "msgpack",
        }
    }
}

impl fmt::Display for PersistenceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for PersistenceFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(PersistenceFormat::Json),
            "msgpack" | "messagepack" => Ok(PersistenceFormat::MsgPack),
            _ => Err(Error::ParsePersistenceFormat {
                input: s.to_string(),
            }),
        }
    }
}
