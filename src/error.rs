//! Error types for the savanna crate

use thiserror::Error;

/// Main error type for the savanna crate
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    #[error("episode already over (status: {status})")]
    EpisodeOver { status: String },

    #[error("invalid start position index {index} (expected 1-8)")]
    InvalidStartPosition { index: usize },

    #[error("grid point ({row},{col}) is outside the 19x19 map")]
    PointOutOfBounds { row: i32, col: i32 },

    #[error("invalid state key '{key}' (expected format: 'row,col|prey_action|predator_state')")]
    InvalidStateKey { key: String },

    #[error("invalid abstraction rule '{rule}': {reason}")]
    InvalidRule { rule: String, reason: String },

    #[error("invalid predator action '{input}'. Expected one of: advance, hide, attack")]
    ParsePredatorAction { input: String },

    #[error("invalid predator state '{input}'. Expected one of: normal, hidden, attacking")]
    ParsePredatorState { input: String },

    #[error(
        "invalid prey action '{input}'. Expected one of: look_left, look_right, look_front, drink, flee"
    )]
    ParsePreyAction { input: String },

    #[error("invalid persistence format '{input}'. Expected one of: json, msgpack")]
    ParsePersistenceFormat { input: String },

    #[error("invalid learning mode '{input}'. Expected one of: one-step, traces")]
    ParseLearningMode { input: String },

    #[error("invalid reward shaping '{input}'. Expected one of: engine, distance, terminal")]
    ParseRewardShaping { input: String },

    #[error("programmed prey behaviour needs at least one action")]
    EmptyPreySequence,

    #[error("programmed prey behaviour cannot contain 'flee' (position {position})")]
    FleeInPreySequence { position: usize },

    #[error("no candidate actions to choose from")]
    NoCandidateActions,

    #[error("no start positions configured for training")]
    NoStartPositions,

    #[error("training already completed all {episodes} episodes")]
    TrainingComplete { episodes: usize },

    #[error("no step recorded at tick {tick}")]
    UnknownTick { tick: u32 },

    #[error("invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    #[error("failed to {operation}: {source}")]
    Io {
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("failed to {operation}: {message}")]
    SerializationContext { operation: String, message: String },

    #[error("progress bar template error: {message}")]
    ProgressBarTemplate { message: String },
}

/// Convenience type alias for Results using the crate's Error type
pub type Result<T> = std::result::Result<T, Error>;

impl From<std::io::Error> for Error {
    fn from(source: std::io::Error) -> Self {
        Error::Io {
            operation: "IO operation".to_string(),
            source,
        }
    }
}
