//! Hunt command - watch the trained predator hunt, one tick at a time

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;

use crate::{
    cli::output::{format_q_row, format_step, print_kv, print_section, render_map},
    hunt::GameStatus,
    pipeline::{Explanation, HuntSession, PreyBehavior},
    q_learning::KnowledgeBase,
};

#[derive(Parser, Debug)]
#[command(about = "Run one hunt with the trained predator")]
pub struct HuntArgs {
    /// Predator start position (1-8)
    #[arg(long, short = 'p', default_value_t = 1)]
    pub position: usize,

    /// Directory holding knowledge artifacts
    #[arg(long, short = 'd', default_value = "knowledge")]
    pub knowledge_dir: PathBuf,

    /// Artifact name to load
    #[arg(long, short = 'n', default_value = "knowledge")]
    pub name: String,

    /// Comma-separated programmed prey actions; the prey chooses at random when omitted
    #[arg(long)]
    pub prey_sequence: Option<String>,

    /// Stop after this many ticks if the hunt has not ended
    #[arg(long, default_value_t = 200)]
    pub max_steps: u32,

    /// Explain every decision
    #[arg(long, short = 'x', default_value_t = false)]
    pub explain: bool,

    /// Draw the map after every tick
    #[arg(long, default_value_t = false)]
    pub map: bool,

    /// Random seed for the prey
    #[arg(long)]
    pub seed: Option<u64>,
}

impl HuntArgs {
    fn prey(&self) -> Result<PreyBehavior> {
        match &self.prey_sequence {
            Some(sequence) => {
                let actions = PreyBehavior::parse_sequence(sequence)
                    .with_context(|| format!("Invalid --prey-sequence '{sequence}'"))?;
                Ok(PreyBehavior::programmed(actions)?)
            }
            None => Ok(PreyBehavior::Random),
        }
    }
}

pub fn execute(args: HuntArgs) -> Result<()> {
    if args.max_steps == 0 {
        bail!("--max-steps must be greater than zero");
    }

    let mut knowledge = KnowledgeBase::new();
    if knowledge.load(&args.knowledge_dir, &args.name)?.is_none() {
        println!("No trained knowledge found; the predator acts on untrained values.");
    }

    let mut hunt = HuntSession::new(knowledge, args.position, args.prey()?, args.seed)?;

    print_section(&format!("Hunt from start position {}", hunt.start_position()));
    if args.map {
        print!("{}", render_map(hunt.state()));
    }

    while !hunt.is_over() && hunt.state().time_step < args.max_steps {
        hunt.step()?;
        if let Some(record) = hunt.last_record() {
            println!("{}", format_step(record));
        }
        if args.explain {
            print_explanation(&hunt.explain(hunt.state().time_step)?);
        }
        if args.map {
            print!("{}", render_map(hunt.state()));
        }
    }

    println!();
    let verdict = match hunt.result() {
        GameStatus::Success => "the lion caught the impala",
        GameStatus::Failed => "the impala escaped",
        GameStatus::InProgress => "no result before the step limit",
    };
    print_kv("Result", verdict);
    print_kv("Ticks", &hunt.state().time_step.to_string());
    print_kv("Final distance", &format!("{:.2}", hunt.state().distance()));
    Ok(())
}

fn print_explanation(explanation: &Explanation) {
    println!("      {}", explanation.summary);
    match &explanation.q_values {
        Some(row) => println!("      Q: {}", format_q_row(row)),
        None => println!("      Q: no learned values for {}", explanation.state_key),
    }
    for rule in &explanation.rules {
        println!("      rule: {rule}");
    }
    let sight: Vec<String> = explanation
        .line_of_sight
        .iter()
        .map(ToString::to_string)
        .collect();
    println!("      line of sight: {}", sight.join(" "));
}
