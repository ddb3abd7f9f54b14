//! Training sessions for the predator

use std::{
    collections::BTreeMap,
    fmt,
    fs::{self, File},
    io::BufWriter,
    path::{Path, PathBuf},
    str::FromStr,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use rand::{rngs::StdRng, seq::IndexedRandom};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    Error, Result,
    adapters::PersistenceFormat,
    hunt::{GameEngine, GameMap, GameState, GameStatus, StepRecord},
    pipeline::{prey::PreyBehavior, reward::RewardShaping},
    ports::{RewardShaper, TrainingObserver},
    q_learning::{AbstractionEngine, KnowledgeBase, QLearningAgent, StateKey, agent::build_rng},
};

/// Subdirectory of the knowledge directory that holds episode logs
pub const LOG_DIR: &str = "logs";

/// Delete the episode logs under `knowledge_dir`, returning how many were removed.
pub fn purge_episode_logs(knowledge_dir: &Path) -> Result<usize> {
    let logs = knowledge_dir.join(LOG_DIR);
    if !logs.is_dir() {
        return Ok(0);
    }

    let entries = fs::read_dir(&logs).map_err(|source| Error::Io {
        operation: format!("list log directory {logs:?}"),
        source,
    })?;
    let mut removed = 0;
    for entry in entries {
        let path = entry?.path();
        if path.is_file() {
            fs::remove_file(&path).map_err(|source| Error::Io {
                operation: format!("remove episode log {path:?}"),
                source,
            })?;
            removed += 1;
        }
    }
    info!(dir = %logs.display(), removed, "episode logs purged");
    Ok(removed)
}

/// Which update the agent applies after each tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LearningMode {
    #[default]
    OneStep,
    Traces,
}

impl fmt::Display for LearningMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LearningMode::OneStep => f.write_str("one-step"),
            LearningMode::Traces => f.write_str("traces"),
        }
    }
}

impl FromStr for LearningMode {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "one-step" | "onestep" | "td" => Ok(LearningMode::OneStep),
            "traces" | "eligibility" => Ok(LearningMode::Traces),
            _ => Err(Error::ParseLearningMode {
                input: s.to_string(),
            }),
        }
    }
}

/// Training configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingConfig {
    /// Number of episodes to run
    pub episodes: usize,

    /// Start position indices (1-8) drawn uniformly per episode
    pub start_positions: Vec<usize>,

    /// Where the prey's actions come from
    pub prey: PreyBehavior,

    /// Per-tick update rule
    pub learning: LearningMode,

    /// Reward used for learning
    pub reward: RewardShaping,

    /// Replay batch applied after each episode; 0 disables replay
    pub batch_size: usize,

    /// Episodes still running after this many ticks are abandoned
    pub max_steps_per_episode: u32,

    /// Episodes between abstraction passes and checkpoints
    pub checkpoint_interval: usize,

    /// Directory for knowledge artifacts and logs; nothing is written when unset
    pub knowledge_dir: Option<PathBuf>,

    /// Artifact name for the final save
    pub knowledge_name: String,

    /// Encoding for saved knowledge
    pub format: PersistenceFormat,

    /// Write the checkpoint episode's history alongside each checkpoint
    pub log_episodes: bool,

    /// Random seed for start positions and prey behaviour
    pub seed: Option<u64>,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            episodes: 1000,
            start_positions: (1..=8).collect(),
            prey: PreyBehavior::Random,
            learning: LearningMode::OneStep,
            reward: RewardShaping::Engine,
            batch_size: 0,
            max_steps_per_episode: 200,
            checkpoint_interval: 100,
            knowledge_dir: None,
            knowledge_name: "knowledge".to_string(),
            format: PersistenceFormat::Json,
            log_episodes: true,
            seed: None,
        }
    }
}

impl TrainingConfig {
    /// Load a configuration from a JSON file; missing fields take defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| Error::Io {
            operation: format!("read training config {path:?}"),
            source,
        })?;
        serde_json::from_str(&contents).map_err(|e| Error::SerializationContext {
            operation: format!("parse training config {path:?}"),
            message: e.to_string(),
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.start_positions.is_empty() {
            return Err(Error::NoStartPositions);
        }
        for &index in &self.start_positions {
            GameMap::start_position(index)?;
        }
        self.prey.validate()?;

        if self.max_steps_per_episode == 0 {
            return Err(Error::InvalidConfiguration {
                message: "max_steps_per_episode must be greater than zero".to_string(),
            });
        }
        if self.checkpoint_interval == 0 {
            return Err(Error::InvalidConfiguration {
                message: "checkpoint_interval must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    /// Artifact name used for periodic checkpoints.
    pub fn checkpoint_name(&self) -> String {
        format!("{}_checkpoint", self.knowledge_name)
    }
}

/// Outcome of one training episode
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeSummary {
    /// 1-based episode number
    pub episode: usize,
    pub start_position: usize,
    pub status: GameStatus,
    pub steps: u32,
    pub total_reward: f64,
    /// Abandoned at the step cap before reaching a terminal status
    pub truncated: bool,
}

impl EpisodeSummary {
    pub fn is_success(&self) -> bool {
        self.status == GameStatus::Success
    }
}

/// Running statistics over a training session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrainingStats {
    pub episodes: usize,
    pub successes: usize,
    pub failures: usize,
    pub truncated: usize,
    pub total_steps: u64,
    pub position_attempts: BTreeMap<usize, usize>,
    pub position_successes: BTreeMap<usize, usize>,
    pub q_table_size: usize,
    pub abstraction_count: usize,
}

impl TrainingStats {
    pub fn record(&mut self, summary: &EpisodeSummary) {
        self.episodes += 1;
        self.total_steps += u64::from(summary.steps);
        *self
            .position_attempts
            .entry(summary.start_position)
            .or_default() += 1;

        match summary.status {
            GameStatus::Success => {
                self.successes += 1;
                *self
                    .position_successes
                    .entry(summary.start_position)
                    .or_default() += 1;
            }
            GameStatus::Failed => self.failures += 1,
            GameStatus::InProgress => self.truncated += 1,
        }
    }

    pub fn success_rate(&self) -> f64 {
        if self.episodes == 0 {
            0.0
        } else {
            self.successes as f64 / self.episodes as f64
        }
    }

    pub fn average_steps(&self) -> f64 {
        if self.episodes == 0 {
            0.0
        } else {
            self.total_steps as f64 / self.episodes as f64
        }
    }

    /// Success rate for every start position that has been tried.
    pub fn success_rate_by_position(&self) -> BTreeMap<usize, f64> {
        self.position_attempts
            .iter()
            .map(|(&position, &attempts)| {
                let successes = self.position_successes.get(&position).copied().unwrap_or(0);
                (position, successes as f64 / attempts as f64)
            })
            .collect()
    }
}

/// History of one episode as written next to checkpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeLog {
    pub episode: usize,
    pub start_position: usize,
    pub status: GameStatus,
    pub history: Vec<StepRecord>,
}

impl EpisodeLog {
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| Error::Io {
            operation: format!("create episode log {path:?}"),
            source,
        })?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Ok(serde_json::from_reader(file)?)
    }
}

/// One training run, owning the agent and everything it learns
///
/// Episodes run to completion; a stop request is honoured between episodes,
/// after which [`resume`](Self::resume) continues where the run left off.
pub struct TrainingSession {
    config: TrainingConfig,
    agent: QLearningAgent,
    engine: GameEngine,
    abstraction: AbstractionEngine,
    shaper: Box<dyn RewardShaper>,
    observers: Vec<Box<dyn TrainingObserver>>,
    stop: Arc<AtomicBool>,
    rng: StdRng,
    stats: TrainingStats,
    next_episode: usize,
}

impl TrainingSession {
    /// Create a session; the reward shaper follows `config.reward`.
    pub fn new(config: TrainingConfig, agent: QLearningAgent) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            shaper: config.reward.shaper(),
            rng: build_rng(config.seed),
            engine: GameEngine::new(),
            abstraction: AbstractionEngine::new(),
            observers: Vec::new(),
            stop: Arc::new(AtomicBool::new(false)),
            stats: TrainingStats::default(),
            next_episode: 0,
            config,
            agent,
        })
    }

    /// Replace the reward shaper chosen by the configuration.
    pub fn with_shaper(mut self, shaper: Box<dyn RewardShaper>) -> Self {
        self.shaper = shaper;
        self
    }

    pub fn with_observer(mut self, observer: Box<dyn TrainingObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Flag that, once set, ends the run after the current episode.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    pub fn request_stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }

    pub fn config(&self) -> &TrainingConfig {
        &self.config
    }

    pub fn stats(&self) -> &TrainingStats {
        &self.stats
    }

    pub fn agent(&self) -> &QLearningAgent {
        &self.agent
    }

    pub fn agent_mut(&mut self) -> &mut QLearningAgent {
        &mut self.agent
    }

    pub fn into_agent(self) -> QLearningAgent {
        self.agent
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        self.agent.knowledge()
    }

    /// Episodes completed so far.
    pub fn completed_episodes(&self) -> usize {
        self.next_episode
    }

    pub fn is_finished(&self) -> bool {
        self.next_episode >= self.config.episodes
    }

    /// Fraction of the configured episodes completed.
    pub fn progress(&self) -> f64 {
        if self.config.episodes == 0 {
            1.0
        } else {
            self.next_episode as f64 / self.config.episodes as f64
        }
    }

    /// Continue a stopped run from the next unplayed episode.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TrainingComplete`] if every episode has already run.
    pub fn resume(&mut self) -> Result<TrainingStats> {
        if self.is_finished() {
            return Err(Error::TrainingComplete {
                episodes: self.config.episodes,
            });
        }
        self.stop.store(false, Ordering::SeqCst);
        self.run()
    }

    /// Run the remaining episodes, then save the final knowledge.
    pub fn run(&mut self) -> Result<TrainingStats> {
        let total = self.config.episodes;
        let first = self.next_episode;

        info!(
            episodes = total,
            first_episode = first + 1,
            learning = %self.config.learning,
            reward = self.shaper.name(),
            prey = %self.config.prey,
            "training started"
        );
        for observer in &mut self.observers {
            observer.on_training_start(total, first)?;
        }

        while self.next_episode < total {
            if self.stop.load(Ordering::SeqCst) {
                info!(completed = self.next_episode, "training stopped on request");
                break;
            }

            let (summary, history) = self.run_episode(self.next_episode + 1)?;
            self.next_episode += 1;

            self.stats.record(&summary);
            self.refresh_knowledge_stats();
            debug!(
                episode = summary.episode,
                start = summary.start_position,
                status = %summary.status,
                steps = summary.steps,
                reward = summary.total_reward,
                epsilon = self.agent.epsilon(),
                "episode finished"
            );

            for observer in &mut self.observers {
                observer.on_episode_end(&summary, &self.stats)?;
            }

            if summary.episode % self.config.checkpoint_interval == 0 {
                self.checkpoint(&summary, history)?;
            }
        }

        if let Some(dir) = &self.config.knowledge_dir {
            let path = self.agent.knowledge().save(
                dir,
                &self.config.knowledge_name,
                self.config.format,
            )?;
            info!(path = %path.display(), states = self.stats.q_table_size, "final knowledge saved");
        }

        for observer in &mut self.observers {
            observer.on_training_end(&self.stats)?;
        }

        Ok(self.stats.clone())
    }

    fn refresh_knowledge_stats(&mut self) {
        self.stats.q_table_size = self.agent.knowledge().len();
        self.stats.abstraction_count = self.agent.knowledge().abstractions().len();
    }

    /// Play one episode to a terminal status or the step cap, learning as it goes.
    fn run_episode(&mut self, episode: usize) -> Result<(EpisodeSummary, Vec<StepRecord>)> {
        let start_position = *self
            .config
            .start_positions
            .choose(&mut self.rng)
            .ok_or(Error::NoStartPositions)?;
        let mut state = GameState::from_start_index(start_position)?;

        self.agent.reset_eligibility();

        let mut prey_action = self.config.prey.next_action(state.time_step, &mut self.rng);
        let mut total_reward = 0.0;
        let mut truncated = false;

        while !state.is_terminal() {
            if state.time_step >= self.config.max_steps_per_episode {
                truncated = true;
                break;
            }

            let key = StateKey::observe(&state, prey_action);
            let action = self.agent.choose_action(&key);
            let previous = state.frame();

            let outcome = self.engine.step(&mut state, action, prey_action)?;
            let reward = self.shaper.shape(&previous, action, &state, &outcome);
            total_reward += reward;

            let next_prey_action = self.config.prey.next_action(state.time_step, &mut self.rng);
            let next_key = StateKey::observe(&state, next_prey_action);

            match self.config.learning {
                LearningMode::OneStep => {
                    self.agent
                        .learn(&key, action, reward, &next_key, outcome.done);
                }
                LearningMode::Traces => {
                    self.agent
                        .learn_with_traces(&key, action, reward, &next_key, outcome.done);
                }
            }

            prey_action = next_prey_action;
        }

        if self.config.batch_size > 0 {
            self.agent.learn_batch(self.config.batch_size);
        }
        self.agent.decay_epsilon();

        let summary = EpisodeSummary {
            episode,
            start_position,
            status: state.status,
            steps: state.time_step,
            total_reward,
            truncated,
        };
        Ok((summary, state.history))
    }

    /// Abstraction pass, checkpoint save and episode log.
    fn checkpoint(&mut self, summary: &EpisodeSummary, history: Vec<StepRecord>) -> Result<()> {
        let new_rules = self
            .abstraction
            .abstract_knowledge(self.agent.knowledge_mut())
            .len();
        self.refresh_knowledge_stats();

        if let Some(dir) = &self.config.knowledge_dir {
            let path = self.agent.knowledge().save(
                dir,
                &self.config.checkpoint_name(),
                self.config.format,
            )?;

            if self.config.log_episodes {
                let logs = dir.join(LOG_DIR);
                fs::create_dir_all(&logs).map_err(|source| Error::Io {
                    operation: format!("create log directory {logs:?}"),
                    source,
                })?;
                let log = EpisodeLog {
                    episode: summary.episode,
                    start_position: summary.start_position,
                    status: summary.status,
                    history,
                };
                log.save(logs.join(format!("episode_{:06}.json", summary.episode)))?;
            }

            info!(
                episode = summary.episode,
                new_rules,
                success_rate = self.stats.success_rate(),
                path = %path.display(),
                "checkpoint saved"
            );
        } else {
            info!(
                episode = summary.episode,
                new_rules,
                success_rate = self.stats.success_rate(),
                "abstraction pass complete"
            );
        }

        for observer in &mut self.observers {
            observer.on_checkpoint(summary.episode, new_rules)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::{hunt::PreyAction, q_learning::AgentConfig};

    fn agent(seed: u64) -> QLearningAgent {
        QLearningAgent::new(AgentConfig::default().with_seed(seed)).unwrap()
    }

    fn config(episodes: usize) -> TrainingConfig {
        TrainingConfig {
            episodes,
            seed: Some(42),
            ..TrainingConfig::default()
        }
    }

    #[derive(Clone, Default)]
    struct Recorder {
        episodes: Arc<Mutex<Vec<usize>>>,
        checkpoints: Arc<Mutex<Vec<usize>>>,
    }

    impl TrainingObserver for Recorder {
        fn on_episode_end(&mut self, summary: &EpisodeSummary, _: &TrainingStats) -> Result<()> {
            self.episodes.lock().unwrap().push(summary.episode);
            Ok(())
        }

        fn on_checkpoint(&mut self, episode: usize, _new_rules: usize) -> Result<()> {
            self.checkpoints.lock().unwrap().push(episode);
            Ok(())
        }
    }

    struct StopAfter {
        after: usize,
        flag: Arc<AtomicBool>,
    }

    impl TrainingObserver for StopAfter {
        fn on_episode_end(&mut self, summary: &EpisodeSummary, _: &TrainingStats) -> Result<()> {
            if summary.episode == self.after {
                self.flag.store(true, Ordering::SeqCst);
            }
            Ok(())
        }
    }

    #[test]
    fn test_training_runs_every_episode() {
        let mut session = TrainingSession::new(config(30), agent(1)).unwrap();
        let stats = session.run().unwrap();

        assert_eq!(stats.episodes, 30);
        assert_eq!(stats.successes + stats.failures + stats.truncated, 30);
        assert_eq!(stats.position_attempts.values().sum::<usize>(), 30);
        assert!(stats.q_table_size > 0);
        assert!(session.is_finished());
        assert_eq!(session.progress(), 1.0);
    }

    #[test]
    fn test_episodes_respect_step_cap() {
        let config = TrainingConfig {
            max_steps_per_episode: 3,
            prey: PreyBehavior::programmed(vec![PreyAction::Drink]).unwrap(),
            ..config(10)
        };
        let mut session = TrainingSession::new(config, agent(2)).unwrap();
        let stats = session.run().unwrap();

        assert!(stats.total_steps <= 30);
    }

    #[test]
    fn test_checkpoints_follow_interval() {
        let recorder = Recorder::default();
        let config = TrainingConfig {
            checkpoint_interval: 5,
            ..config(12)
        };
        let mut session = TrainingSession::new(config, agent(3))
            .unwrap()
            .with_observer(Box::new(recorder.clone()));
        session.run().unwrap();

        assert_eq!(recorder.episodes.lock().unwrap().len(), 12);
        assert_eq!(*recorder.checkpoints.lock().unwrap(), vec![5, 10]);
    }

    #[test]
    fn test_stop_and_resume() {
        let recorder = Recorder::default();
        let session = TrainingSession::new(config(10), agent(4)).unwrap();
        let flag = session.stop_handle();
        let mut session = session
            .with_observer(Box::new(StopAfter { after: 4, flag }))
            .with_observer(Box::new(recorder.clone()));

        let stats = session.run().unwrap();
        assert_eq!(stats.episodes, 4);
        assert!(!session.is_finished());

        let stats = session.resume().unwrap();
        assert_eq!(stats.episodes, 10);
        assert_eq!(*recorder.episodes.lock().unwrap(), (1..=10).collect::<Vec<_>>());

        assert!(matches!(
            session.resume(),
            Err(Error::TrainingComplete { episodes: 10 })
        ));
    }

    #[test]
    fn test_invalid_configuration_is_rejected() {
        let no_positions = TrainingConfig {
            start_positions: Vec::new(),
            ..config(1)
        };
        assert!(matches!(
            TrainingSession::new(no_positions, agent(0)),
            Err(Error::NoStartPositions)
        ));

        let bad_position = TrainingConfig {
            start_positions: vec![1, 9],
            ..config(1)
        };
        assert!(matches!(
            TrainingSession::new(bad_position, agent(0)),
            Err(Error::InvalidStartPosition { index: 9 })
        ));
    }

    #[test]
    fn test_stats_rates() {
        let mut stats = TrainingStats::default();
        for (position, status) in [
            (1, GameStatus::Success),
            (1, GameStatus::Failed),
            (3, GameStatus::Success),
        ] {
            stats.record(&EpisodeSummary {
                episode: stats.episodes + 1,
                start_position: position,
                status,
                steps: 4,
                total_reward: 0.0,
                truncated: false,
            });
        }

        assert!((stats.success_rate() - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(stats.average_steps(), 4.0);
        let by_position = stats.success_rate_by_position();
        assert_eq!(by_position[&1], 0.5);
        assert_eq!(by_position[&3], 1.0);
    }

    #[test]
    fn test_learning_mode_parse() {
        assert_eq!("one_step".parse::<LearningMode>().unwrap(), LearningMode::OneStep);
        assert_eq!("Traces".parse::<LearningMode>().unwrap(), LearningMode::Traces);
        assert!("monte-carlo".parse::<LearningMode>().is_err());
    }
}
