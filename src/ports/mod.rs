//! Ports (trait boundaries) for external dependencies.
//!
//! These traits are owned by the domain and implemented by adapters or by
//! the pipeline's pluggable strategies.

pub mod observer;
pub mod repository;
pub mod reward;

pub use observer::TrainingObserver;
pub use repository::KnowledgeRepository;
pub use reward::RewardShaper;
