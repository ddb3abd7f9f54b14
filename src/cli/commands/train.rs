//! Train command - run a training session and save what the predator learned

use std::{
    fs::File,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use serde_json::to_writer_pretty;
use tracing::info;

use crate::{
    adapters::PersistenceFormat,
    cli::{
        config::RunConfig,
        output::{format_number, format_percent, print_kv, print_section, print_subsection},
    },
    pipeline::{
        JsonlObserver, LearningMode, MetricsObserver, MetricsSummary, PreyBehavior,
        ProgressObserver, RewardShaping, SharedObserver, TrainingConfig, TrainingSession,
        TrainingStats,
    },
    q_learning::{AgentConfig, KnowledgeBase, QLearningAgent},
};

#[derive(Parser, Debug)]
#[command(about = "Train the predator")]
pub struct TrainArgs {
    /// JSON file with `agent` and `training` sections; flags override it
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,

    /// Number of training episodes
    #[arg(long, short = 'e')]
    pub episodes: Option<usize>,

    /// Comma-separated start positions (1-8)
    #[arg(long, short = 'p', value_delimiter = ',')]
    pub positions: Option<Vec<usize>>,

    /// Comma-separated programmed prey actions (e.g. drink,look_left,look_front);
    /// the prey chooses at random when omitted
    #[arg(long)]
    pub prey_sequence: Option<String>,

    /// Update rule applied after each tick (one-step or traces)
    #[arg(long, short = 'l')]
    pub learning: Option<LearningMode>,

    /// Reward used for learning (engine, distance or terminal)
    #[arg(long, short = 'r')]
    pub reward: Option<RewardShaping>,

    /// Replay batch size after each episode (0 disables replay)
    #[arg(long)]
    pub batch_size: Option<usize>,

    /// Abandon episodes still running after this many ticks
    #[arg(long)]
    pub max_steps: Option<u32>,

    /// Episodes between abstraction passes and checkpoints
    #[arg(long)]
    pub checkpoint_interval: Option<usize>,

    /// Learning rate (alpha)
    #[arg(long)]
    pub learning_rate: Option<f64>,

    /// Discount factor (gamma)
    #[arg(long)]
    pub discount: Option<f64>,

    /// Initial exploration rate
    #[arg(long)]
    pub epsilon: Option<f64>,

    /// Trace decay (lambda)
    #[arg(long)]
    pub trace_decay: Option<f64>,

    /// Directory for knowledge artifacts and logs [default: knowledge]
    #[arg(long, short = 'd')]
    pub knowledge_dir: Option<PathBuf>,

    /// Artifact name for the saved knowledge
    #[arg(long, short = 'n')]
    pub name: Option<String>,

    /// Encoding for saved knowledge (json or msgpack)
    #[arg(long, short = 'f')]
    pub format: Option<PersistenceFormat>,

    /// Start from an empty Q-table instead of the saved knowledge
    #[arg(long, default_value_t = false)]
    pub fresh: bool,

    /// Skip writing episode histories next to checkpoints
    #[arg(long, default_value_t = false)]
    pub no_episode_logs: bool,

    /// Optional file for per-episode JSONL summaries
    #[arg(long)]
    pub observations: Option<PathBuf>,

    /// Optional path for writing a summary JSON file
    #[arg(long)]
    pub summary: Option<PathBuf>,

    /// Random seed for reproducibility
    #[arg(long)]
    pub seed: Option<u64>,

    /// Hide the progress bar
    #[arg(long, short = 'q', default_value_t = false)]
    pub quiet: bool,
}

const DEFAULT_KNOWLEDGE_DIR: &str = "knowledge";

#[derive(Debug, Serialize)]
struct TrainingSummaryFile<'a> {
    training: &'a TrainingConfig,
    agent: &'a AgentConfig,
    stats: &'a TrainingStats,
    metrics: MetricsSummary,
    final_epsilon: f64,
}

impl TrainArgs {
    /// Merge the config file (if any) with the flags given on the command line.
    pub fn resolve(&self) -> Result<(AgentConfig, TrainingConfig)> {
        let RunConfig {
            mut agent,
            mut training,
        } = RunConfig::load_or_default(self.config.as_deref())?;

        if let Some(episodes) = self.episodes {
            training.episodes = episodes;
        }
        if let Some(positions) = &self.positions {
            training.start_positions = positions.clone();
        }
        if let Some(sequence) = &self.prey_sequence {
            let actions = PreyBehavior::parse_sequence(sequence)
                .with_context(|| format!("Invalid --prey-sequence '{sequence}'"))?;
            training.prey = PreyBehavior::programmed(actions)?;
        }
        if let Some(learning) = self.learning {
            training.learning = learning;
        }
        if let Some(reward) = self.reward {
            training.reward = reward;
        }
        if let Some(batch_size) = self.batch_size {
            training.batch_size = batch_size;
        }
        if let Some(max_steps) = self.max_steps {
            training.max_steps_per_episode = max_steps;
        }
        if let Some(interval) = self.checkpoint_interval {
            training.checkpoint_interval = interval;
        }
        if let Some(name) = &self.name {
            training.knowledge_name = name.clone();
        }
        if let Some(format) = self.format {
            training.format = format;
        }
        if self.no_episode_logs {
            training.log_episodes = false;
        }
        if self.seed.is_some() {
            training.seed = self.seed;
            agent.seed = self.seed.map(|seed| seed.wrapping_add(1));
        }
        training.knowledge_dir = self
            .knowledge_dir
            .clone()
            .or(training.knowledge_dir.take())
            .or_else(|| Some(PathBuf::from(DEFAULT_KNOWLEDGE_DIR)));

        if let Some(rate) = self.learning_rate {
            agent.learning_rate = rate;
        }
        if let Some(discount) = self.discount {
            agent.discount_factor = discount;
        }
        if let Some(epsilon) = self.epsilon {
            agent.epsilon_start = epsilon;
        }
        if let Some(decay) = self.trace_decay {
            agent.trace_decay = decay;
        }

        agent.validate()?;
        training.validate()?;
        Ok((agent, training))
    }
}

pub fn execute(args: TrainArgs) -> Result<()> {
    let (agent_config, training_config) = args.resolve()?;
    let knowledge_dir = training_config
        .knowledge_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_KNOWLEDGE_DIR));

    let mut knowledge = KnowledgeBase::new();
    if !args.fresh {
        match knowledge.load(&knowledge_dir, &training_config.knowledge_name)? {
            Some(format) => info!(
                %format,
                states = knowledge.len(),
                rules = knowledge.abstractions().len(),
                "continuing from saved knowledge"
            ),
            None => info!("starting from an empty Q-table"),
        }
    }

    let agent = QLearningAgent::with_knowledge(agent_config.clone(), knowledge)?;
    let metrics = SharedObserver::new(MetricsObserver::new(
        (training_config.episodes / 20).max(1),
    ));
    let progress = if args.quiet {
        ProgressObserver::hidden()
    } else {
        ProgressObserver::new()
    };

    let mut session = TrainingSession::new(training_config.clone(), agent)?
        .with_observer(Box::new(progress))
        .with_observer(Box::new(metrics.clone()));
    if let Some(path) = &args.observations {
        session = session.with_observer(Box::new(JsonlObserver::new(path)?));
    }

    let stats = session.run().context("Training failed")?;
    let final_epsilon = session.agent().epsilon();
    let metrics = metrics.lock().summary();

    print_report(&training_config, &stats, &metrics, &knowledge_dir);

    if let Some(path) = &args.summary {
        let summary = TrainingSummaryFile {
            training: &training_config,
            agent: &agent_config,
            stats: &stats,
            metrics,
            final_epsilon,
        };
        write_summary(path, &summary)?;
    }

    Ok(())
}

fn print_report(
    config: &TrainingConfig,
    stats: &TrainingStats,
    metrics: &MetricsSummary,
    dir: &Path,
) {
    print_section("Training complete");
    print_kv("Episodes", &format_number(stats.episodes));
    print_kv("Caught", &format_number(stats.successes));
    print_kv("Escaped", &format_number(stats.failures));
    if stats.truncated > 0 {
        print_kv("Abandoned", &format_number(stats.truncated));
    }
    print_kv("Success rate", &format_percent(stats.success_rate()));
    print_kv("Average steps", &format!("{:.1}", stats.average_steps()));
    print_kv("Average reward", &format!("{:.2}", metrics.average_reward));
    if let Some(first) = metrics.first_success {
        print_kv("First catch", &format!("episode {first}"));
    }
    print_kv("Q-table states", &format_number(stats.q_table_size));
    print_kv("Rules", &format_number(stats.abstraction_count));

    print_subsection("Success rate by start position");
    for (position, rate) in stats.success_rate_by_position() {
        let attempts = stats.position_attempts.get(&position).copied().unwrap_or(0);
        print_kv(
            &format!("Position {position}"),
            &format!("{} ({attempts} episodes)", format_percent(rate)),
        );
    }

    let artifact = KnowledgeBase::artifact_path(dir, &config.knowledge_name, config.format);
    println!("\nKnowledge saved to {}", artifact.display());
}

fn write_summary<T: Serialize>(path: &Path, summary: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    let file = File::create(path)
        .with_context(|| format!("Failed to create summary file {}", path.display()))?;
    to_writer_pretty(file, summary).context("Failed to write training summary")?;
    info!(path = %path.display(), "training summary written");
    Ok(())
}
