use anyhow::Result;

use super::predictor::Predictor;

/// A policy-improvement operator over canonical states, typically a tree
/// search guided by a predictor.
///
/// At temperature 1 the returned distribution samples actions
/// proportionally; at temperature 0 it is nearly one-hot on the
/// best-looking action. The vector always spans the full action space and
/// sums to 1.
pub trait SearchPolicy {
    type State;

    fn action_probabilities(&mut self, state: &Self::State, temperature: f32)
        -> Result<Vec<f32>>;
}

/// Stands up a fresh search policy over this predictor. Episode generation
/// and arena play request a new policy per game so that no search state
/// leaks between games.
pub trait PolicySource: Predictor {
    type Policy<'a>: SearchPolicy<State = Self::State>
    where
        Self: 'a;

    fn fresh_policy(&self) -> Self::Policy<'_>;
}
