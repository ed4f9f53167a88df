use serde::{Deserialize, Serialize};

/// One labeled self-play position. `policy` is the search-improved
/// action-probability vector over the full action space and sums to 1.
/// `outcome` is the final game result relative to the player who was to
/// move in `state`: one of -1.0, 0.0 or 1.0.
///
/// Examples are only ever constructed after their episode has resolved, so
/// an instance is never observed with an unknown outcome.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainingExample<S> {
    pub state: S,
    pub policy: Vec<f32>,
    pub outcome: f32,
}

impl<S> TrainingExample<S> {
    pub fn new(state: S, policy: Vec<f32>, outcome: f32) -> Self {
        Self {
            state,
            policy,
            outcome,
        }
    }
}
