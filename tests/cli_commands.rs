//! Driving the CLI commands against a temporary knowledge directory

use clap::Parser;
use savanna::{
    cli::commands::{
        hunt::{self, HuntArgs},
        knowledge::{self, KnowledgeArgs},
        train::{self, TrainArgs},
    },
    q_learning::KnowledgeBase,
};
use tempfile::TempDir;

#[test]
fn test_train_then_hunt_then_inspect() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path().to_str().unwrap();
    let summary = temp_dir.path().join("summary.json");

    let args = TrainArgs::parse_from([
        "train",
        "--knowledge-dir",
        dir,
        "--episodes",
        "30",
        "--checkpoint-interval",
        "15",
        "--seed",
        "5",
        "--quiet",
        "--summary",
        summary.to_str().unwrap(),
    ]);
    train::execute(args).unwrap();

    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&summary).unwrap()).unwrap();
    assert_eq!(written["stats"]["episodes"], 30);
    assert_eq!(written["training"]["episodes"], 30);

    let mut saved = KnowledgeBase::new();
    assert!(saved.load(temp_dir.path(), "knowledge").unwrap().is_some());
    assert!(!saved.is_empty());

    let args = HuntArgs::parse_from(["hunt", "--knowledge-dir", dir, "--seed", "6", "--explain"]);
    hunt::execute(args).unwrap();

    let args = KnowledgeArgs::parse_from(["knowledge", "--knowledge-dir", dir, "show"]);
    knowledge::execute(args).unwrap();

    let args = KnowledgeArgs::parse_from(["knowledge", "--knowledge-dir", dir, "clear"]);
    knowledge::execute(args).unwrap();

    let mut cleared = KnowledgeBase::new();
    cleared.load(temp_dir.path(), "knowledge").unwrap();
    assert!(cleared.is_empty());
}

#[test]
fn test_training_continues_from_saved_knowledge() {
    let temp_dir = TempDir::new().unwrap();
    let dir = temp_dir.path().to_str().unwrap();

    let run = |extra: &[&str]| {
        let mut argv = vec!["train", "--knowledge-dir", dir, "--episodes", "10", "--quiet"];
        argv.extend_from_slice(extra);
        train::execute(TrainArgs::parse_from(argv)).unwrap();

        let mut saved = KnowledgeBase::new();
        saved.load(temp_dir.path(), "knowledge").unwrap();
        saved
    };
    // The predator only ever closes in, so a run from the south never sees row 0.
    let northern = |knowledge: &KnowledgeBase| {
        knowledge
            .entries()
            .filter(|(key, _)| key.position.row == 0)
            .count()
    };

    let first = run(&["--seed", "1", "--positions", "1"]);
    assert!(northern(&first) > 0);

    let second = run(&["--seed", "2", "--positions", "5"]);
    assert!(second.len() >= first.len());
    assert_eq!(northern(&second), northern(&first));

    let fresh = run(&["--seed", "2", "--positions", "5", "--fresh"]);
    assert_eq!(northern(&fresh), 0);
}

#[test]
fn test_train_reads_config_file() {
    let temp_dir = TempDir::new().unwrap();
    let config = temp_dir.path().join("run.json");
    std::fs::write(
        &config,
        r#"{ "agent": { "epsilon_start": 0.5 }, "training": { "episodes": 7, "start_positions": [2] } }"#,
    )
    .unwrap();

    let args = TrainArgs::parse_from([
        "train",
        "--config",
        config.to_str().unwrap(),
        "--knowledge-dir",
        temp_dir.path().to_str().unwrap(),
    ]);
    let (agent, training) = args.resolve().unwrap();

    assert_eq!(agent.epsilon_start, 0.5);
    assert_eq!(training.episodes, 7);
    assert_eq!(training.start_positions, vec![2]);
}
