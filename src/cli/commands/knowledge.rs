//! Knowledge command - inspect and maintain saved predator knowledge

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use tracing::info;

use crate::{
    adapters::PersistenceFormat,
    cli::output::{format_number, format_q_row, print_kv, print_section, print_subsection},
    pipeline::purge_episode_logs,
    q_learning::{AbstractionEngine, KnowledgeBase, StateKey, abstraction::best_action},
};

#[derive(Parser, Debug)]
#[command(about = "Inspect or maintain saved knowledge")]
pub struct KnowledgeArgs {
    #[command(flatten)]
    pub location: Location,

    #[command(subcommand)]
    pub command: KnowledgeCommand,
}

/// Where the artifact lives
#[derive(Args, Debug, Clone)]
pub struct Location {
    /// Directory holding knowledge artifacts
    #[arg(long, short = 'd', default_value = "knowledge", global = true)]
    pub knowledge_dir: PathBuf,

    /// Artifact name
    #[arg(long, short = 'n', default_value = "knowledge", global = true)]
    pub name: String,
}

#[derive(Subcommand, Debug)]
pub enum KnowledgeCommand {
    /// Print table size, rules and the strongest states
    Show {
        /// Number of states to list, ordered by their best value
        #[arg(long, default_value_t = 10)]
        top: usize,
    },

    /// Run the abstraction pass and save the result
    Abstract {
        /// Encoding for the saved artifact (defaults to the format read)
        #[arg(long, short = 'f')]
        format: Option<PersistenceFormat>,
    },

    /// Replace the artifact with empty knowledge
    Clear {
        /// Encoding for the saved artifact (defaults to the format read)
        #[arg(long, short = 'f')]
        format: Option<PersistenceFormat>,
    },

    /// Show what the predator knows about one state, e.g. "8,9|drink|hidden"
    Query { key: StateKey },

    /// List every knowledge artifact in the directory
    Files,

    /// Delete every knowledge artifact in the directory
    Reset {
        /// Also delete the episode logs
        #[arg(long, default_value_t = false)]
        logs: bool,
    },

    /// Delete the episode logs written during training
    PurgeLogs,
}

pub fn execute(args: KnowledgeArgs) -> Result<()> {
    let Location {
        knowledge_dir: dir,
        name,
    } = args.location;

    match args.command {
        KnowledgeCommand::Files => return list_files(&dir),
        KnowledgeCommand::Reset { logs } => {
            let removed = KnowledgeBase::remove_artifacts(&dir)
                .with_context(|| format!("Failed to reset knowledge in {}", dir.display()))?;
            println!("Deleted {} knowledge file(s)", format_number(removed.len()));
            if logs {
                purge_logs(&dir)?;
            }
            return Ok(());
        }
        KnowledgeCommand::PurgeLogs => return purge_logs(&dir),
        _ => {}
    }

    let mut knowledge = KnowledgeBase::new();
    let found = knowledge
        .load(&dir, &name)
        .with_context(|| format!("Failed to load knowledge '{name}' from {}", dir.display()))?;

    match args.command {
        KnowledgeCommand::Show { top } => {
            if found.is_none() {
                bail!("no knowledge named '{name}' in {}", dir.display());
            }
            show(&knowledge, top);
        }
        KnowledgeCommand::Abstract { format } => {
            let format = format.or(found).unwrap_or_default();
            let rules = AbstractionEngine::new().abstract_knowledge(&mut knowledge);
            let path = knowledge.save(&dir, &name, format)?;
            info!(new_rules = rules.len(), path = %path.display(), "abstraction saved");

            println!("{} new rule(s)", rules.len());
            for rule in &rules {
                println!("  {rule}");
            }
        }
        KnowledgeCommand::Clear { format } => {
            let format = format.or(found).unwrap_or_default();
            let states = knowledge.len();
            knowledge.clear();
            let path = knowledge.save(&dir, &name, format)?;
            println!(
                "Cleared {} state(s) from {}",
                format_number(states),
                path.display()
            );
        }
        KnowledgeCommand::Query { key } => {
            println!("State {key}");
            match knowledge.q_values(&key) {
                Some(row) => {
                    let (action, value) = best_action(&row);
                    print_kv("Q-values", &format_q_row(&row));
                    print_kv("Best action", &format!("{action} ({value:.3})"));
                }
                None => print_kv("Q-values", "never visited"),
            }
            let rules = knowledge.rules_matching(&key);
            if rules.is_empty() {
                print_kv("Rules", "none");
            }
            for rule in rules {
                print_kv("Rule", &rule.to_string());
            }
        }
        KnowledgeCommand::Files | KnowledgeCommand::Reset { .. } | KnowledgeCommand::PurgeLogs => {}
    }
    Ok(())
}

fn list_files(dir: &Path) -> Result<()> {
    let artifacts = KnowledgeBase::list_artifacts(dir)
        .with_context(|| format!("Failed to list knowledge in {}", dir.display()))?;
    if artifacts.is_empty() {
        println!("No knowledge files in {}", dir.display());
        return Ok(());
    }

    print_section("Knowledge files");
    for (path, format) in artifacts {
        let size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        println!(
            "  {:32} {:8} {} bytes",
            path.file_name().unwrap_or_default().to_string_lossy(),
            format.to_string(),
            format_number(size as usize)
        );
    }
    Ok(())
}

fn purge_logs(dir: &Path) -> Result<()> {
    let removed = purge_episode_logs(dir)
        .with_context(|| format!("Failed to purge logs in {}", dir.display()))?;
    println!("Deleted {} episode log(s)", format_number(removed));
    Ok(())
}

fn show(knowledge: &KnowledgeBase, top: usize) {
    print_section("Knowledge");
    print_kv("States", &format_number(knowledge.len()));
    print_kv("Rules", &format_number(knowledge.abstractions().len()));

    if top > 0 && !knowledge.is_empty() {
        let mut ranked: Vec<(&StateKey, &[f64; 3])> = knowledge.entries().collect();
        ranked.sort_by(|a, b| {
            best_action(b.1)
                .1
                .total_cmp(&best_action(a.1).1)
                .then_with(|| a.0.cmp(b.0))
        });

        print_subsection("Strongest states");
        for (key, row) in ranked.into_iter().take(top) {
            println!("  {:28} {}", key.to_string(), format_q_row(row));
        }
    }

    if !knowledge.abstractions().is_empty() {
        print_subsection("Rules");
        for rule in knowledge.abstractions() {
            println!("  {rule}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        geometry::GridPoint,
        hunt::{PredatorAction, PredatorState, PreyAction},
    };

    fn run(dir: &std::path::Path, argv: &[&str]) -> Result<()> {
        let dir = dir.to_str().unwrap();
        let argv = ["knowledge", "--knowledge-dir", dir]
            .into_iter()
            .chain(argv.iter().copied());
        execute(KnowledgeArgs::try_parse_from(argv)?)
    }

    fn seed_knowledge(dir: &std::path::Path) {
        let mut knowledge = KnowledgeBase::new();
        for prey_action in [PreyAction::Drink, PreyAction::LookLeft] {
            let key = StateKey::new(GridPoint::new(4, 9), prey_action, PredatorState::Hidden);
            knowledge.update_q_value(&key, PredatorAction::Advance, 2.0);
        }
        knowledge
            .save(dir, "knowledge", PersistenceFormat::Json)
            .unwrap();
    }

    #[test]
    fn test_show_requires_an_artifact() {
        let dir = tempfile::tempdir().unwrap();
        assert!(run(dir.path(), &["show"]).is_err());

        seed_knowledge(dir.path());
        run(dir.path(), &["show", "--top", "3"]).unwrap();
    }

    #[test]
    fn test_abstract_saves_rules() {
        let dir = tempfile::tempdir().unwrap();
        seed_knowledge(dir.path());

        run(dir.path(), &["abstract"]).unwrap();

        let mut knowledge = KnowledgeBase::new();
        knowledge.load(dir.path(), "knowledge").unwrap();
        assert_eq!(knowledge.abstractions().len(), 1);
    }

    #[test]
    fn test_clear_empties_the_artifact() {
        let dir = tempfile::tempdir().unwrap();
        seed_knowledge(dir.path());

        run(dir.path(), &["clear"]).unwrap();

        let mut knowledge = KnowledgeBase::new();
        assert_eq!(
            knowledge.load(dir.path(), "knowledge").unwrap(),
            Some(PersistenceFormat::Json)
        );
        assert!(knowledge.is_empty());
    }

    #[test]
    fn test_files_and_reset_cover_every_artifact() {
        let dir = tempfile::tempdir().unwrap();
        run(dir.path(), &["files"]).unwrap();

        seed_knowledge(dir.path());
        KnowledgeBase::new()
            .save(dir.path(), "checkpoint_100", PersistenceFormat::MsgPack)
            .unwrap();
        let logs = dir.path().join(crate::pipeline::LOG_DIR);
        std::fs::create_dir_all(&logs).unwrap();
        std::fs::write(logs.join("episode_000001.json"), "{}").unwrap();

        run(dir.path(), &["files"]).unwrap();
        assert_eq!(KnowledgeBase::list_artifacts(dir.path()).unwrap().len(), 2);

        run(dir.path(), &["reset"]).unwrap();
        assert!(KnowledgeBase::list_artifacts(dir.path()).unwrap().is_empty());
        assert!(logs.join("episode_000001.json").exists());

        run(dir.path(), &["reset", "--logs"]).unwrap();
        assert!(!logs.join("episode_000001.json").exists());
    }

    #[test]
    fn test_purge_logs_keeps_knowledge() {
        let dir = tempfile::tempdir().unwrap();
        seed_knowledge(dir.path());
        let logs = dir.path().join(crate::pipeline::LOG_DIR);
        std::fs::create_dir_all(&logs).unwrap();
        std::fs::write(logs.join("episode_000010.json"), "{}").unwrap();

        run(dir.path(), &["purge-logs"]).unwrap();

        assert!(!logs.join("episode_000010.json").exists());
        assert_eq!(KnowledgeBase::list_artifacts(dir.path()).unwrap().len(), 1);
    }

    #[test]
    fn test_query_parses_state_key() {
        let dir = tempfile::tempdir().unwrap();
        seed_knowledge(dir.path());

        run(dir.path(), &["query", "4,9|drink|hidden"]).unwrap();
        assert!(run(dir.path(), &["query", "not-a-key"]).is_err());
    }
}
