use std::fs;
use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::history::ReplayHistory;

/// Durable storage for the replay window, one gzipped JSON file per
/// iteration. Restoring the latest file reconstructs the exact window the
/// orchestrator held when it was written.
pub struct ReplayPersistance {
    examples_dir: PathBuf,
}

impl ReplayPersistance {
    pub fn new(examples_dir: impl Into<PathBuf>) -> Result<Self> {
        let examples_dir = examples_dir.into();
        fs::create_dir_all(&examples_dir)?;

        Ok(Self { examples_dir })
    }

    /// The examples file for `iteration`, named after the checkpoint the
    /// window belongs to.
    pub fn examples_path(&self, iteration: usize) -> PathBuf {
        self.examples_dir
            .join(format!("checkpoint_{}.examples", iteration))
    }

    pub fn write<S: Serialize>(
        &self,
        history: &ReplayHistory<S>,
        iteration: usize,
    ) -> Result<()> {
        let file_path = self.examples_path(iteration);
        let file = File::create(&file_path)
            .with_context(|| format!("Failed to create examples file at {:?}", file_path))?;
        let compressor = GzEncoder::new(file, Compression::default());
        serde_json::to_writer(compressor, history)?;

        Ok(())
    }

    pub fn read<S: DeserializeOwned>(path: &Path) -> Result<ReplayHistory<S>> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open examples file at {:?}", path))?;
        let content = GzDecoder::new(file);
        let history = serde_json::from_reader(content)?;

        Ok(history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::iteration_batch::IterationBatch;
    use model::TrainingExample;

    fn unique_temp_dir(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("replay-{}-{}", name, std::process::id()))
    }

    #[test]
    fn test_write_then_read_reconstructs_the_window() {
        let dir = unique_temp_dir("roundtrip");
        let persistance = ReplayPersistance::new(&dir).unwrap();

        let mut history = ReplayHistory::new(3);
        history.add_iteration(IterationBatch::from_examples(
            (0..5).map(|i| TrainingExample::new(vec![i as i8], vec![0.5, 0.5], -1.0)),
            10,
        ));
        history.add_iteration(IterationBatch::from_examples(
            (0..2).map(|i| TrainingExample::new(vec![i as i8], vec![1.0, 0.0], 1.0)),
            10,
        ));

        persistance.write(&history, 7).unwrap();
        let restored: ReplayHistory<Vec<i8>> =
            ReplayPersistance::read(&persistance.examples_path(7)).unwrap();

        assert_eq!(restored.num_iterations(), 2);
        assert_eq!(restored.flatten(), history.flatten());

        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_read_missing_file_is_an_error() {
        let res = ReplayPersistance::read::<Vec<i8>>(Path::new("/nonexistent/file.examples"));

        assert!(res.is_err());
    }
}
