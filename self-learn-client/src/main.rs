use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use env_logger::Env;
use log::info;

use common::ConfigLoader;
use self_learn::{learn_distributed, SelfLearnOptions};
use tictactoe::{Engine as TicTacToeEngine, TabularPredictor};

#[derive(Parser, Debug)]
#[command(about = "Iterative self-play training for tictactoe")]
struct Args {
    /// HOCON run configuration.
    #[arg(long, default_value = "run.conf")]
    config: PathBuf,

    /// Examples file from a previous run to restore the replay window from.
    #[arg(long)]
    load_examples: Option<PathBuf>,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let options: SelfLearnOptions = ConfigLoader::new(&args.config)?.load()?;
    info!("Run options: {:?}", options);

    let engine = TicTacToeEngine::new();

    let summary = learn_distributed(
        &engine,
        &options,
        args.load_examples.as_deref(),
        |_rank| TabularPredictor::new(),
    )?;

    info!(
        "Finished {} iterations: {} accepted, {} rejected, {} examples in the window",
        summary.iterations, summary.accepted, summary.rejected, summary.num_training_examples
    );

    Ok(())
}
