//! Observer port - abstraction for training observation
//!
//! Lets progress display and metrics collection follow a training session
//! without the session knowing about either.

use crate::{
    Result,
    pipeline::training::{EpisodeSummary, TrainingStats},
};

/// Observer trait for monitoring training
///
/// # Event Sequence
///
/// 1. `on_training_start(total_episodes, first_episode)` - once per run or resume
/// 2. `on_episode_end(summary, stats)` - after every completed episode
/// 3. `on_checkpoint(episode, new_rules)` - after each periodic abstraction and save
/// 4. `on_training_end(stats)` - once, also when stopped early
///
/// # Examples
///
/// ```no_run
/// use savanna::{
///     pipeline::{EpisodeSummary, TrainingStats},
///     ports::TrainingObserver,
/// };
///
/// struct CatchCounter {
///     catches: usize,
/// }
///
/// impl TrainingObserver for CatchCounter {
///     fn on_episode_end(
///         &mut self,
///         summary: &EpisodeSummary,
///         _stats: &TrainingStats,
///     ) -> savanna::Result<()> {
///         if summary.is_success() {
///             self.catches += 1;
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait TrainingObserver: Send {
    /// Called when a run starts.
    ///
    /// `first_episode` is non-zero when resuming.
    fn on_training_start(&mut self, _total_episodes: usize, _first_episode: usize) -> Result<()> {
        Ok(())
    }

    /// Called after each episode has finished and been learned from.
    fn on_episode_end(&mut self, _summary: &EpisodeSummary, _stats: &TrainingStats) -> Result<()> {
        Ok(())
    }

    /// Called after the periodic abstraction pass and checkpoint.
    fn on_checkpoint(&mut self, _episode: usize, _new_rules: usize) -> Result<()> {
        Ok(())
    }

    /// Called when the run ends, whether completed or stopped.
    fn on_training_end(&mut self, _stats: &TrainingStats) -> Result<()> {
        Ok(())
    }
}
