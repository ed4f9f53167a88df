use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{anyhow, bail, ensure, Result};
use log::{info, warn};
use rand::seq::SliceRandom;
use serde::de::DeserializeOwned;
use serde::Serialize;

use arena::{play_games, GateDecision};
use engine::GameEngine;
use model::{CheckpointTag, PolicySource, Predictor};
use replay_buffer::{IterationBatch, ReplayHistory, ReplayPersistance};
use self_play::run_episode;
use sync::Collective;

use super::options::SelfLearnOptions;

/// Coordinator-side account of a finished run.
#[derive(Debug)]
pub struct LearnSummary {
    pub iterations: usize,
    pub accepted: usize,
    pub rejected: usize,
    /// Example count of each iteration batch retained in the window.
    pub history_iteration_sizes: Vec<usize>,
    /// Size of the flattened window at the end of the run.
    pub num_training_examples: usize,
}

/// One rank of the iterative self-play training loop.
///
/// Every rank executes the same iteration sequence; the collectives keep
/// them in lockstep. Only the coordinator owns the replay window, writes
/// checkpoints and examples files, and arbitrates accept/reject. The
/// checkpoint directory is the single source of truth for the deployed
/// model: workers read `best` only after the post-decision barrier.
pub struct SelfLearn<'a, E, M>
where
    E: GameEngine,
    M: Predictor<State = E::State>,
{
    engine: &'a E,
    predictor: M,
    collective: Collective,
    options: &'a SelfLearnOptions,
    checkpoint_dir: PathBuf,
    history: ReplayHistory<E::State>,
    persistance: ReplayPersistance,
    skip_first_self_play: bool,
}

impl<'a, E, M> SelfLearn<'a, E, M>
where
    E: GameEngine,
    E::State: Serialize + DeserializeOwned,
    M: Predictor<State = E::State> + PolicySource + Clone,
{
    pub fn new(
        engine: &'a E,
        predictor: M,
        collective: Collective,
        options: &'a SelfLearnOptions,
    ) -> Result<Self> {
        ensure!(
            options.history_iterations > 0,
            "history_iterations must be at least 1"
        );
        ensure!(
            options.max_examples_per_iteration > 0,
            "max_examples_per_iteration must be at least 1"
        );

        let checkpoint_dir = PathBuf::from(&options.checkpoint_dir);
        fs::create_dir_all(&checkpoint_dir)?;

        let persistance = ReplayPersistance::new(&checkpoint_dir)?;

        let mut learner = Self {
            engine,
            predictor,
            collective,
            options,
            checkpoint_dir,
            history: ReplayHistory::new(options.history_iterations),
            persistance,
            skip_first_self_play: false,
        };

        learner.converge_on_best()?;

        Ok(learner)
    }

    /// Ensures a `best` checkpoint exists and that every rank starts from
    /// it. Without this, the very first rejected candidate would leave
    /// workers with nothing to reload.
    fn converge_on_best(&mut self) -> Result<()> {
        let best_path = CheckpointTag::Best.path(&self.checkpoint_dir);

        if self.collective.is_coordinator() && !best_path.is_file() {
            info!("No best checkpoint found; bootstrapping one from the initial predictor");
            self.predictor
                .save_checkpoint(&self.checkpoint_dir, &CheckpointTag::Best)?;
        }

        self.collective.barrier()?;
        self.predictor
            .load_checkpoint(&self.checkpoint_dir, &CheckpointTag::Best)
    }

    /// Restores the replay window from a previous run's examples file. The
    /// coordinator reads the file and the resulting skip-first-self-play
    /// flag is broadcast so all ranks skip together.
    pub fn restore_examples(&mut self, examples_file: &Path) -> Result<()> {
        let restored = if self.collective.is_coordinator() {
            if examples_file.is_file() {
                info!("Restoring replay history from {:?}", examples_file);
                self.history = ReplayPersistance::read(examples_file)?;
                info!(
                    "Restored {} iterations ({} examples)",
                    self.history.num_iterations(),
                    self.history.num_examples()
                );
                true
            } else if self.options.resume_without_examples {
                warn!(
                    "Examples file {:?} not found; continuing with an empty history",
                    examples_file
                );
                false
            } else {
                bail!(
                    "Examples file {:?} not found; set resume_without_examples to continue without it",
                    examples_file
                );
            }
        } else {
            false
        };

        self.skip_first_self_play = self
            .collective
            .broadcast(self.collective.is_coordinator().then_some(restored))?;

        Ok(())
    }

    pub fn history(&self) -> &ReplayHistory<E::State> {
        &self.history
    }

    pub fn predictor(&self) -> &M {
        &self.predictor
    }

    pub fn learn(&mut self) -> Result<LearnSummary> {
        let mut accepted = 0;
        let mut rejected = 0;

        if self.collective.is_coordinator() {
            info!(
                "Training {} iterations across {} ranks",
                self.options.num_iters,
                self.collective.world_size()
            );
        }

        for i in 1..=self.options.num_iters {
            if self.collective.is_coordinator() {
                info!("Starting iteration #{}", i);
            }

            if !self.skip_first_self_play || i > 1 {
                self.self_play_and_aggregate(i)?;
            }

            let training_set = self.broadcast_training_set()?;

            if self.collective.is_coordinator() {
                self.predictor
                    .save_checkpoint(&self.checkpoint_dir, &CheckpointTag::Temp)?;
            }

            self.predictor.train(&training_set)?;

            if self.collective.is_coordinator() {
                match self.evaluate_candidate(i)? {
                    GateDecision::Accept => accepted += 1,
                    GateDecision::Reject => rejected += 1,
                }
            }

            // Every rank converges on the arbitrated model before the next
            // iteration's self play begins.
            self.collective.barrier()?;
            self.predictor
                .load_checkpoint(&self.checkpoint_dir, &CheckpointTag::Best)?;
        }

        Ok(LearnSummary {
            iterations: self.options.num_iters,
            accepted,
            rejected,
            history_iteration_sizes: self.history.iterations().map(|b| b.len()).collect(),
            num_training_examples: self.history.num_examples(),
        })
    }

    /// SELF_PLAY and AGGREGATE: every rank plays its partitioned share of
    /// episodes, the coordinator folds the union into the window and
    /// persists it.
    fn self_play_and_aggregate(&mut self, iteration: usize) -> Result<()> {
        let episodes = self.collective.partition(self.options.num_episodes);
        let started = Instant::now();
        let mut batch = IterationBatch::new(self.options.max_examples_per_iteration);

        for _ in 0..episodes {
            let mut policy = self.predictor.fresh_policy();
            let examples = run_episode(self.engine, &mut policy, &self.options.self_play_options)?;
            batch.extend(examples);
        }

        if self.collective.is_coordinator() {
            info!(
                "Self play: {} episodes on this rank, {} examples, {:.1}s",
                episodes,
                batch.len(),
                started.elapsed().as_secs_f32()
            );
        }

        if let Some(all_examples) = self.collective.gather(batch.into_examples())? {
            self.history.add_iteration(IterationBatch::from_examples(
                all_examples,
                self.options.max_examples_per_iteration,
            ));

            info!(
                "Window now spans {} iterations, {} examples",
                self.history.num_iterations(),
                self.history.num_examples()
            );

            self.persistance.write(&self.history, iteration - 1)?;
        }

        Ok(())
    }

    /// TRAIN setup: the coordinator flattens and shuffles the window and
    /// replicates the result so every rank trains on the same set.
    fn broadcast_training_set(&mut self) -> Result<Vec<model::TrainingExample<E::State>>> {
        let local = if self.collective.is_coordinator() {
            let mut training_set = self.history.flatten();
            training_set.shuffle(&mut rand::thread_rng());
            Some(training_set)
        } else {
            None
        };

        self.collective.broadcast(local)
    }

    /// EVALUATE and the accept/reject decision, coordinator only. The
    /// incumbent is the pre-training snapshot reloaded from `temp`.
    fn evaluate_candidate(&mut self, iteration: usize) -> Result<GateDecision> {
        let mut incumbent = self.predictor.clone();
        incumbent.load_checkpoint(&self.checkpoint_dir, &CheckpointTag::Temp)?;

        info!("Pitting candidate against the previous version");
        let result = play_games(
            self.engine,
            &self.predictor,
            &incumbent,
            self.options.arena_games,
        )?;
        info!(
            "Candidate/previous wins: {} / {}; draws: {}",
            result.candidate_wins, result.incumbent_wins, result.draws
        );

        let decision = GateDecision::from_match(&result, self.options.update_threshold);

        match decision {
            GateDecision::Accept => {
                info!("Accepting new model");
                self.predictor
                    .save_checkpoint(&self.checkpoint_dir, &CheckpointTag::Iteration(iteration))?;
                self.predictor
                    .save_checkpoint(&self.checkpoint_dir, &CheckpointTag::Best)?;
            }
            GateDecision::Reject => {
                info!("Rejecting new model");
                self.predictor
                    .load_checkpoint(&self.checkpoint_dir, &CheckpointTag::Temp)?;
            }
        }

        Ok(decision)
    }
}

/// Spawns one worker thread per rank and runs the full loop on each,
/// returning the coordinator's summary. A rank that fails drops its
/// collective endpoints, which unblocks and fails the remaining ranks
/// rather than leaving them parked at a collective.
pub fn learn_distributed<E, M, F>(
    engine: &E,
    options: &SelfLearnOptions,
    examples_file: Option<&Path>,
    make_predictor: F,
) -> Result<LearnSummary>
where
    E: GameEngine + Sync,
    E::State: Serialize + DeserializeOwned + Send,
    M: Predictor<State = E::State> + PolicySource + Clone + Send,
    F: Fn(usize) -> M + Sync,
{
    ensure!(options.world_size >= 1, "world_size must be at least 1");

    let endpoints = Collective::group(options.world_size);
    let make_predictor = &make_predictor;

    let result = crossbeam::scope(|s| {
        let mut handles = Vec::new();

        for collective in endpoints {
            handles.push(s.spawn(move |_| -> Result<LearnSummary> {
                let rank = collective.rank();
                let mut learner =
                    SelfLearn::new(engine, make_predictor(rank), collective, options)?;

                if let Some(path) = examples_file {
                    learner.restore_examples(path)?;
                }

                learner.learn()
            }));
        }

        let mut coordinator_summary = None;

        for (rank, handle) in handles.into_iter().enumerate() {
            let summary = handle
                .join()
                .map_err(|_| anyhow!("worker {} panicked", rank))??;

            if rank == 0 {
                coordinator_summary = Some(summary);
            }
        }

        coordinator_summary.ok_or_else(|| anyhow!("coordinator produced no summary"))
    })
    .map_err(|_| anyhow!("worker scope panicked"))?;

    result
}
