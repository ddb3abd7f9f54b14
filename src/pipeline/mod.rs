//! Training and hunting pipelines
//!
//! This module provides:
//! - Training sessions that run episodes and learn from them
//! - Step-by-step hunts with explanations of each decision
//! - Prey behaviours and reward shapers for configuring runs
//! - Observers for progress display and metrics

pub mod hunting;
pub mod observers;
pub mod prey;
pub mod reward;
pub mod training;

pub use hunting::{Explanation, HuntSession};
pub use observers::{
    JsonlObserver, MetricsObserver, MetricsSummary, ProgressObserver, SharedObserver,
};
pub use prey::PreyBehavior;
pub use reward::{DistanceShaping, EngineReward, RewardShaping, TerminalOnly};
pub use training::{
    EpisodeLog, EpisodeSummary, LOG_DIR, LearningMode, TrainingConfig, TrainingSession,
    TrainingStats, purge_episode_logs,
};

pub use crate::ports::{RewardShaper, TrainingObserver};
