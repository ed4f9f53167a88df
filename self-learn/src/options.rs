use anyhow::Result;
use common::Config;
use self_play::SelfPlayOptions;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct SelfLearnOptions {
    pub self_play_options: SelfPlayOptions,
    /// Training iterations to run.
    pub num_iters: usize,
    /// Self-play episodes per iteration, across all workers.
    pub num_episodes: usize,
    /// Worker count; rank 0 coordinates.
    pub world_size: usize,
    /// Per-iteration example cap; the oldest examples within an iteration
    /// are evicted beyond this.
    pub max_examples_per_iteration: usize,
    /// Iterations retained in the replay window.
    pub history_iterations: usize,
    /// Head-to-head games per evaluation.
    pub arena_games: usize,
    /// Minimum candidate win rate over decisive games for acceptance.
    pub update_threshold: f32,
    /// Directory holding checkpoints and examples files.
    pub checkpoint_dir: String,
    /// When resuming and the examples file is missing: abort (false) or
    /// continue with an empty window (true).
    pub resume_without_examples: bool,
}

impl Config for SelfLearnOptions {
    fn load(config: &common::ConfigLoader) -> Result<Self> {
        Ok(Self {
            self_play_options: SelfPlayOptions::load(config)?,
            num_iters: config
                .get("num_iters")
                .and_then(|v| v.as_usize())
                .unwrap_or(50),
            num_episodes: config
                .get("num_episodes")
                .and_then(|v| v.as_usize())
                .unwrap_or(100),
            world_size: config
                .get("world_size")
                .and_then(|v| v.as_usize())
                .unwrap_or(1),
            max_examples_per_iteration: config
                .get("max_examples_per_iteration")
                .and_then(|v| v.as_usize())
                .unwrap_or(200_000),
            history_iterations: config
                .get("history_iterations")
                .and_then(|v| v.as_usize())
                .unwrap_or(20),
            arena_games: config
                .get("arena_games")
                .and_then(|v| v.as_usize())
                .unwrap_or(40),
            update_threshold: config
                .get("update_threshold")
                .and_then(|v| v.as_f32())
                .unwrap_or(0.55),
            checkpoint_dir: config
                .get("checkpoint_dir")
                .and_then(|v| v.as_string())
                .unwrap_or_else(|| "./checkpoints".to_string()),
            resume_without_examples: config
                .get("resume_without_examples")
                .and_then(|v| v.as_bool())
                .unwrap_or(false),
        })
    }
}
