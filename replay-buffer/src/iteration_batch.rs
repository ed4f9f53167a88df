use std::collections::VecDeque;

use model::TrainingExample;
use serde::{Deserialize, Serialize};

/// The examples produced within one self-play iteration. Bounded: once
/// `capacity` examples are held, pushing another evicts the oldest.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IterationBatch<S> {
    examples: VecDeque<TrainingExample<S>>,
    capacity: usize,
}

impl<S> IterationBatch<S> {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "batch capacity must be positive");

        Self {
            examples: VecDeque::new(),
            capacity,
        }
    }

    pub fn from_examples(
        examples: impl IntoIterator<Item = TrainingExample<S>>,
        capacity: usize,
    ) -> Self {
        let mut batch = Self::new(capacity);
        batch.extend(examples);
        batch
    }

    pub fn push(&mut self, example: TrainingExample<S>) {
        if self.examples.len() == self.capacity {
            self.examples.pop_front();
        }

        self.examples.push_back(example);
    }

    pub fn extend(&mut self, examples: impl IntoIterator<Item = TrainingExample<S>>) {
        for example in examples {
            self.push(example);
        }
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrainingExample<S>> {
        self.examples.iter()
    }

    pub fn into_examples(self) -> Vec<TrainingExample<S>> {
        self.examples.into()
    }
}
