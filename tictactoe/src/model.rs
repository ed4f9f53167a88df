use std::collections::HashMap;
use std::fs;
use std::fs::File;
use std::path::Path;

use anyhow::{ensure, Context, Result};
use model::{CheckpointTag, PolicySource, Predictor, SearchPolicy, TrainingExample};

use super::engine::GameState;

/// A lookup-table predictor: running averages of the search policies and
/// outcomes seen for each canonical state, uniform priors for states never
/// trained on. Deliberately the simplest thing that honors the full
/// `Predictor` contract, exact checkpoint round-trip included.
#[derive(Clone, Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct TabularPredictor {
    table: HashMap<String, StateStats>,
}

#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
struct StateStats {
    policy_sum: Vec<f32>,
    value_sum: f32,
    visits: f32,
}

fn state_key(state: &GameState) -> String {
    state
        .cells
        .iter()
        .map(|c| c.to_string())
        .collect::<Vec<_>>()
        .join(",")
}

impl TabularPredictor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn num_known_states(&self) -> usize {
        self.table.len()
    }
}

impl Predictor for TabularPredictor {
    type State = GameState;

    fn predict(&self, state: &GameState) -> Result<(Vec<f32>, f32)> {
        match self.table.get(&state_key(state)) {
            Some(stats) => {
                let policy = stats
                    .policy_sum
                    .iter()
                    .map(|p| p / stats.visits)
                    .collect();
                Ok((policy, stats.value_sum / stats.visits))
            }
            None => Ok((vec![1.0 / 9.0; 9], 0.0)),
        }
    }

    fn train(&mut self, examples: &[TrainingExample<GameState>]) -> Result<()> {
        for example in examples {
            ensure!(
                example.policy.len() == 9,
                "expected a policy over 9 actions, got {}",
                example.policy.len()
            );

            let stats = self
                .table
                .entry(state_key(&example.state))
                .or_insert_with(|| StateStats {
                    policy_sum: vec![0.0; 9],
                    value_sum: 0.0,
                    visits: 0.0,
                });

            for (sum, p) in stats.policy_sum.iter_mut().zip(&example.policy) {
                *sum += p;
            }
            stats.value_sum += example.outcome;
            stats.visits += 1.0;
        }

        Ok(())
    }

    fn save_checkpoint(&self, checkpoint_dir: &Path, tag: &CheckpointTag) -> Result<()> {
        fs::create_dir_all(checkpoint_dir)?;

        let path = tag.path(checkpoint_dir);
        let file = File::create(&path)
            .with_context(|| format!("Failed to create checkpoint at {:?}", path))?;
        serde_json::to_writer(file, self)?;

        Ok(())
    }

    fn load_checkpoint(&mut self, checkpoint_dir: &Path, tag: &CheckpointTag) -> Result<()> {
        let path = tag.path(checkpoint_dir);
        let file = File::open(&path)
            .with_context(|| format!("Failed to open checkpoint at {:?}", path))?;
        *self = serde_json::from_reader(file)?;

        Ok(())
    }
}

impl PolicySource for TabularPredictor {
    type Policy<'a> = PriorPolicy<'a> where Self: 'a;

    fn fresh_policy(&self) -> PriorPolicy<'_> {
        PriorPolicy { predictor: self }
    }
}

/// The trivial search policy: the predictor's prior masked to legal moves
/// and sharpened by temperature. Stands in for a tree search behind the
/// same seam.
pub struct PriorPolicy<'a> {
    predictor: &'a TabularPredictor,
}

impl SearchPolicy for PriorPolicy<'_> {
    type State = GameState;

    fn action_probabilities(&mut self, state: &GameState, temperature: f32) -> Result<Vec<f32>> {
        let (prior, _value) = self.predictor.predict(state)?;

        let mut masked: Vec<f32> = prior
            .iter()
            .enumerate()
            .map(|(action, &p)| if state.cells[action] == 0 { p } else { 0.0 })
            .collect();

        let num_valid = state.valid_actions().count();
        ensure!(num_valid > 0, "no legal actions in state {:?}", state);

        let total: f32 = masked.iter().sum();
        if total <= 0.0 {
            // The prior put all its mass on occupied cells; fall back to
            // uniform over what is actually playable, then sharpen as
            // usual so temperature 0 still yields a one-hot.
            for action in state.valid_actions() {
                masked[action] = 1.0 / num_valid as f32;
            }
        }

        if temperature == 0.0 {
            let best = masked
                .iter()
                .enumerate()
                .fold((0, f32::NEG_INFINITY), |best, (action, &p)| {
                    if p > best.1 {
                        (action, p)
                    } else {
                        best
                    }
                })
                .0;

            let mut one_hot = vec![0.0; 9];
            one_hot[best] = 1.0;
            return Ok(one_hot);
        }

        if (temperature - 1.0).abs() > f32::EPSILON {
            for p in masked.iter_mut() {
                *p = p.powf(1.0 / temperature);
            }
        }

        let total: f32 = masked.iter().sum();
        for p in masked.iter_mut() {
            *p /= total;
        }

        Ok(masked)
    }
}
