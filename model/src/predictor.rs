use std::path::Path;

use anyhow::Result;
use engine::GameState;

use super::checkpoint::CheckpointTag;
use super::training_example::TrainingExample;

/// The learnable position evaluator. The training loop depends on a
/// predictor only through these four operations; any architecture
/// satisfying them is substitutable.
///
/// `save_checkpoint` followed by `load_checkpoint` of the same tag must
/// round-trip all learnable and optimizer state: `predict` outputs after
/// the load must equal those before the save.
pub trait Predictor {
    type State: GameState;

    /// Prior action probabilities and a scalar value estimate in [-1, 1]
    /// for a canonical state.
    fn predict(&self, state: &Self::State) -> Result<(Vec<f32>, f32)>;

    /// Runs the predictor's own optimization loop over `examples`.
    fn train(&mut self, examples: &[TrainingExample<Self::State>]) -> Result<()>;

    fn save_checkpoint(&self, checkpoint_dir: &Path, tag: &CheckpointTag) -> Result<()>;

    fn load_checkpoint(&mut self, checkpoint_dir: &Path, tag: &CheckpointTag) -> Result<()>;
}
