use std::collections::VecDeque;

use log::warn;
use model::TrainingExample;
use serde::{Deserialize, Serialize};

use super::iteration_batch::IterationBatch;

/// Sliding window over the most recent iterations' example batches.
/// Eviction is FIFO at iteration granularity: when more than
/// `max_iterations` batches are held, the oldest batch is dropped
/// wholesale. The flattened window therefore never exceeds
/// `max_iterations * max_examples_per_iteration` examples.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReplayHistory<S> {
    iterations: VecDeque<IterationBatch<S>>,
    max_iterations: usize,
}

impl<S> ReplayHistory<S> {
    pub fn new(max_iterations: usize) -> Self {
        assert!(max_iterations > 0, "history must retain at least one iteration");

        Self {
            iterations: VecDeque::new(),
            max_iterations,
        }
    }

    pub fn add_iteration(&mut self, batch: IterationBatch<S>) {
        self.iterations.push_back(batch);

        if self.iterations.len() > self.max_iterations {
            warn!(
                "Removing the oldest iteration of examples. Retained iterations: {}",
                self.iterations.len()
            );
            self.iterations.pop_front();
        }
    }

    pub fn num_iterations(&self) -> usize {
        self.iterations.len()
    }

    pub fn iterations(&self) -> impl Iterator<Item = &IterationBatch<S>> {
        self.iterations.iter()
    }

    pub fn num_examples(&self) -> usize {
        self.iterations.iter().map(|b| b.len()).sum()
    }
}

impl<S: Clone> ReplayHistory<S> {
    /// Concatenates all retained iterations into one training set. The
    /// order is oldest iteration first; callers shuffle before use.
    pub fn flatten(&self) -> Vec<TrainingExample<S>> {
        self.iterations
            .iter()
            .flat_map(|batch| batch.iter().cloned())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn batch_of(ids: std::ops::Range<usize>) -> IterationBatch<u8> {
        IterationBatch::from_examples(
            ids.map(|i| TrainingExample::new(0, vec![i as f32], 0.0)),
            100,
        )
    }

    #[test]
    fn test_eviction_is_fifo_at_iteration_granularity() {
        let mut history = ReplayHistory::new(3);

        history.add_iteration(batch_of(0..2));
        history.add_iteration(batch_of(2..4));
        history.add_iteration(batch_of(4..6));
        history.add_iteration(batch_of(6..8));

        assert_eq!(history.num_iterations(), 3);

        // Oldest gone, remaining batches in original relative order.
        let ids: Vec<f32> = history.flatten().iter().map(|e| e.policy[0]).collect();
        assert_eq!(ids, vec![2.0, 3.0, 4.0, 5.0, 6.0, 7.0]);
    }

    #[test]
    fn test_flatten_matches_sum_of_batch_sizes() {
        let mut history = ReplayHistory::new(5);

        history.add_iteration(batch_of(0..3));
        history.add_iteration(batch_of(0..7));

        assert_eq!(history.num_examples(), 10);
        assert_eq!(history.flatten().len(), 10);
    }

    #[test]
    fn test_flattened_window_is_bounded() {
        let max_iterations = 3;
        let per_iteration = 4;
        let mut history = ReplayHistory::new(max_iterations);

        for _ in 0..10 {
            history.add_iteration(IterationBatch::from_examples(
                (0..20).map(|i| TrainingExample::new(0u8, vec![i as f32], 0.0)),
                per_iteration,
            ));
        }

        assert!(history.flatten().len() <= max_iterations * per_iteration);
    }
}
