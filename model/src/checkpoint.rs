use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Names a predictor snapshot within the checkpoint directory.
///
/// `Temp` is the transient pre-training snapshot used as the incumbent
/// during evaluation. `Best` is the single deployed model; it is the only
/// tag ever loaded to start an iteration's self-play. `Iteration(i)` is the
/// archival copy written when iteration `i`'s candidate is accepted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckpointTag {
    Temp,
    Best,
    Iteration(usize),
}

impl CheckpointTag {
    pub fn path(&self, checkpoint_dir: &Path) -> PathBuf {
        checkpoint_dir.join(format!("{}.ckpt", self))
    }
}

impl fmt::Display for CheckpointTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckpointTag::Temp => write!(f, "temp"),
            CheckpointTag::Best => write!(f, "best"),
            CheckpointTag::Iteration(i) => write!(f, "checkpoint_{}", i),
        }
    }
}
