//! Observers for training sessions
//!
//! Observers collect data while a session runs without the session knowing
//! how it is displayed or stored.

use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};

use crate::{
    Error, Result,
    pipeline::training::{EpisodeSummary, TrainingStats},
    ports::TrainingObserver,
};

/// Progress bar observer - shows catches and escapes as episodes finish
pub struct ProgressObserver {
    progress_bar: Option<ProgressBar>,
    hidden: bool,
}

impl ProgressObserver {
    pub fn new() -> Self {
        Self {
            progress_bar: None,
            hidden: false,
        }
    }

    /// Observer that tracks progress without drawing anything.
    pub fn hidden() -> Self {
        Self {
            progress_bar: None,
            hidden: true,
        }
    }

    fn message(stats: &TrainingStats) -> String {
        format!(
            "caught:{} escaped:{} rate:{:.1}%",
            stats.successes,
            stats.failures + stats.truncated,
            stats.success_rate() * 100.0
        )
    }
}

impl Default for ProgressObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl TrainingObserver for ProgressObserver {
    fn on_training_start(&mut self, total_episodes: usize, first_episode: usize) -> Result<()> {
        let pb = if self.hidden {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(total_episodes as u64)
        };
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} episodes ({msg})")
                .map_err(|e| Error::ProgressBarTemplate {
                    message: e.to_string(),
                })?
                .progress_chars("=>-"),
        );
        pb.set_length(total_episodes as u64);
        pb.set_position(first_episode as u64);
        self.progress_bar = Some(pb);
        Ok(())
    }

    fn on_episode_end(&mut self, summary: &EpisodeSummary, stats: &TrainingStats) -> Result<()> {
        if let Some(pb) = &self.progress_bar {
            pb.set_position(summary.episode as u64);
            pb.set_message(Self::message(stats));
        }
        Ok(())
    }

    fn on_training_end(&mut self, stats: &TrainingStats) -> Result<()> {
        if let Some(pb) = self.progress_bar.take() {
            pb.finish_with_message(Self::message(stats));
        }
        Ok(())
    }
}

/// Metrics observer - keeps a success curve over the run
pub struct MetricsObserver {
    window: usize,
    summaries: Vec<EpisodeSummary>,
    checkpoints: Vec<(usize, usize)>,
    final_stats: Option<TrainingStats>,
}

impl MetricsObserver {
    /// `window` is the number of episodes per point on the success curve.
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
            summaries: Vec::new(),
            checkpoints: Vec::new(),
            final_stats: None,
        }
    }

    pub fn summaries(&self) -> &[EpisodeSummary] {
        &self.summaries
    }

    /// `(episode, new_rules)` for every checkpoint seen.
    pub fn checkpoints(&self) -> &[(usize, usize)] {
        &self.checkpoints
    }

    /// Success rate over consecutive windows, keyed by the window's last episode.
    pub fn success_curve(&self) -> Vec<(usize, f64)> {
        self.summaries
            .chunks(self.window)
            .filter_map(|chunk| {
                let last = chunk.last()?;
                let caught = chunk.iter().filter(|s| s.is_success()).count();
                Some((last.episode, caught as f64 / chunk.len() as f64))
            })
            .collect()
    }

    /// First episode that ended in a catch.
    pub fn first_success(&self) -> Option<usize> {
        self.summaries
            .iter()
            .find(|s| s.is_success())
            .map(|s| s.episode)
    }

    pub fn average_reward(&self) -> f64 {
        if self.summaries.is_empty() {
            0.0
        } else {
            self.summaries.iter().map(|s| s.total_reward).sum::<f64>()
                / self.summaries.len() as f64
        }
    }

    pub fn summary(&self) -> MetricsSummary {
        let stats = self.final_stats.clone().unwrap_or_default();
        MetricsSummary {
            episodes: self.summaries.len(),
            successes: stats.successes,
            failures: stats.failures,
            truncated: stats.truncated,
            success_rate: stats.success_rate(),
            average_steps: stats.average_steps(),
            average_reward: self.average_reward(),
            first_success: self.first_success(),
            rules_learned: self.checkpoints.iter().map(|&(_, rules)| rules).sum(),
            success_curve: self.success_curve(),
        }
    }
}

impl Default for MetricsObserver {
    fn default() -> Self {
        Self::new(100)
    }
}

impl TrainingObserver for MetricsObserver {
    fn on_episode_end(&mut self, summary: &EpisodeSummary, stats: &TrainingStats) -> Result<()> {
        self.summaries.push(summary.clone());
        self.final_stats = Some(stats.clone());
        Ok(())
    }

    fn on_checkpoint(&mut self, episode: usize, new_rules: usize) -> Result<()> {
        self.checkpoints.push((episode, new_rules));
        Ok(())
    }

    fn on_training_end(&mut self, stats: &TrainingStats) -> Result<()> {
        self.final_stats = Some(stats.clone());
        Ok(())
    }
}

/// Summary of training metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub episodes: usize,
    pub successes: usize,
    pub failures: usize,
    pub truncated: usize,
    pub success_rate: f64,
    pub average_steps: f64,
    pub average_reward: f64,
    pub first_success: Option<usize>,
    pub rules_learned: usize,
    pub success_curve: Vec<(usize, f64)>,
}

/// JSONL observer - one episode summary per line
pub struct JsonlObserver {
    writer: BufWriter<File>,
}

impl JsonlObserver {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| Error::Io {
            operation: format!("create episode log {path:?}"),
            source,
        })?;
        Ok(Self {
            writer: BufWriter::new(file),
        })
    }
}

impl TrainingObserver for JsonlObserver {
    fn on_episode_end(&mut self, summary: &EpisodeSummary, _stats: &TrainingStats) -> Result<()> {
        serde_json::to_writer(&mut self.writer, summary)?;
        writeln!(&mut self.writer)?;
        Ok(())
    }

    fn on_training_end(&mut self, _stats: &TrainingStats) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

/// Shares an observer with the caller so its data can be read after the run
///
/// The session takes ownership of its observers; keep a clone of this handle
/// to inspect the wrapped observer afterwards.
pub struct SharedObserver<O> {
    inner: Arc<Mutex<O>>,
}

impl<O> SharedObserver<O> {
    pub fn new(observer: O) -> Self {
        Self {
            inner: Arc::new(Mutex::new(observer)),
        }
    }

    pub fn lock(&self) -> MutexGuard<'_, O> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<O> Clone for SharedObserver<O> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<O: TrainingObserver> TrainingObserver for SharedObserver<O> {
    fn on_training_start(&mut self, total_episodes: usize, first_episode: usize) -> Result<()> {
        self.lock().on_training_start(total_episodes, first_episode)
    }

    fn on_episode_end(&mut self, summary: &EpisodeSummary, stats: &TrainingStats) -> Result<()> {
        self.lock().on_episode_end(summary, stats)
    }

    fn on_checkpoint(&mut self, episode: usize, new_rules: usize) -> Result<()> {
        self.lock().on_checkpoint(episode, new_rules)
    }

    fn on_training_end(&mut self, stats: &TrainingStats) -> Result<()> {
        self.lock().on_training_end(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hunt::GameStatus;

    fn summary(episode: usize, status: GameStatus) -> EpisodeSummary {
        EpisodeSummary {
            episode,
            start_position: 1,
            status,
            steps: 10,
            total_reward: if status == GameStatus::Success { 91.0 } else { -109.0 },
            truncated: false,
        }
    }

    fn feed(observer: &mut dyn TrainingObserver, statuses: &[GameStatus]) -> TrainingStats {
        let mut stats = TrainingStats::default();
        for (i, &status) in statuses.iter().enumerate() {
            let s = summary(i + 1, status);
            stats.record(&s);
            observer.on_episode_end(&s, &stats).unwrap();
        }
        observer.on_training_end(&stats).unwrap();
        stats
    }

    #[test]
    fn test_metrics_observer_curve() {
        let mut observer = MetricsObserver::new(2);
        feed(
            &mut observer,
            &[
                GameStatus::Failed,
                GameStatus::Failed,
                GameStatus::Success,
                GameStatus::Failed,
                GameStatus::Success,
            ],
        );

        assert_eq!(observer.success_curve(), vec![(2, 0.0), (4, 0.5), (5, 1.0)]);
        assert_eq!(observer.first_success(), Some(3));

        let metrics = observer.summary();
        assert_eq!(metrics.episodes, 5);
        assert_eq!(metrics.successes, 2);
        assert_eq!(metrics.failures, 3);
        assert!((metrics.success_rate - 0.4).abs() < 1e-12);
        assert!((metrics.average_reward - (-29.0)).abs() < 1e-12);
    }

    #[test]
    fn test_metrics_observer_counts_rules() {
        let mut observer = MetricsObserver::default();
        observer.on_checkpoint(100, 3).unwrap();
        observer.on_checkpoint(200, 1).unwrap();

        assert_eq!(observer.checkpoints(), &[(100, 3), (200, 1)]);
        assert_eq!(observer.summary().rules_learned, 4);
        assert_eq!(observer.first_success(), None);
    }

    #[test]
    fn test_progress_observer_hidden_runs() {
        let mut observer = ProgressObserver::hidden();
        observer.on_training_start(3, 0).unwrap();
        feed(
            &mut observer,
            &[GameStatus::Success, GameStatus::Failed, GameStatus::Success],
        );
        assert!(observer.progress_bar.is_none());
    }

    #[test]
    fn test_shared_observer_is_readable_after_handoff() {
        let shared = SharedObserver::new(MetricsObserver::new(10));
        let mut handed_off: Box<dyn TrainingObserver> = Box::new(shared.clone());
        feed(handed_off.as_mut(), &[GameStatus::Success]);

        assert_eq!(shared.lock().summaries().len(), 1);
    }

    #[test]
    fn test_jsonl_observer_writes_one_line_per_episode() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("episodes.jsonl");

        let mut observer = JsonlObserver::new(&path).unwrap();
        feed(&mut observer, &[GameStatus::Success, GameStatus::Failed]);
        drop(observer);

        let contents = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = contents.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: EpisodeSummary = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.episode, 1);
        assert!(first.is_success());
    }
}
