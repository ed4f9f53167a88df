use anyhow::Result;
use log::debug;
use serde::Serialize;

use engine::{GameEngine, GameState, Player};
use model::{PolicySource, SearchPolicy};

/// Head-to-head totals from the candidate's perspective.
#[derive(Clone, Debug, Serialize)]
pub struct MatchResult {
    pub candidate_wins: usize,
    pub incumbent_wins: usize,
    pub draws: usize,
}

impl MatchResult {
    pub fn num_games(&self) -> usize {
        self.candidate_wins + self.incumbent_wins + self.draws
    }
}

/// Pits the candidate against the incumbent for `num_games` games, greedy
/// (temperature 0) action selection on both sides. Seats alternate each
/// game so first-move advantage cancels out. A fresh search policy is
/// stood up per side per game.
pub fn play_games<E, C, I>(
    engine: &E,
    candidate: &C,
    incumbent: &I,
    num_games: usize,
) -> Result<MatchResult>
where
    E: GameEngine,
    C: PolicySource<State = E::State>,
    I: PolicySource<State = E::State>,
{
    let mut candidate_wins = 0;
    let mut incumbent_wins = 0;
    let mut draws = 0;

    for game in 0..num_games {
        let mut candidate_policy = candidate.fresh_policy();
        let mut incumbent_policy = incumbent.fresh_policy();
        let candidate_moves_first = game % 2 == 0;

        let first_mover_score = if candidate_moves_first {
            play_one(engine, &mut candidate_policy, &mut incumbent_policy)?
        } else {
            play_one(engine, &mut incumbent_policy, &mut candidate_policy)?
        };

        let candidate_score = if candidate_moves_first {
            first_mover_score
        } else {
            -first_mover_score
        };

        if candidate_score > 0.0 {
            candidate_wins += 1;
        } else if candidate_score < 0.0 {
            incumbent_wins += 1;
        } else {
            draws += 1;
        }

        debug!(
            "Arena game {}: candidate as {}, score {}",
            game + 1,
            if candidate_moves_first { "first" } else { "second" },
            candidate_score
        );
    }

    Ok(MatchResult {
        candidate_wins,
        incumbent_wins,
        draws,
    })
}

/// Plays a single game; returns the result for the first mover.
fn play_one<E>(
    engine: &E,
    first: &mut dyn SearchPolicy<State = E::State>,
    second: &mut dyn SearchPolicy<State = E::State>,
) -> Result<f32>
where
    E: GameEngine,
{
    let mut state = E::State::initial();
    let mut player: Player = 1;

    loop {
        let canonical = engine.canonical_form(&state, player);

        let distribution = if player == 1 {
            first.action_probabilities(&canonical, 0.0)?
        } else {
            second.action_probabilities(&canonical, 0.0)?
        };

        let action = arg_max(&distribution);
        let (next_state, next_player) = engine.next_state(&state, player, action);
        state = next_state;
        player = next_player;

        if let Some(result) = engine.game_ended(&state, player) {
            // Re-express the result, given relative to the player now to
            // move, from the first mover's perspective.
            return Ok(result * player as f32);
        }
    }
}

fn arg_max(distribution: &[f32]) -> usize {
    distribution
        .iter()
        .enumerate()
        .fold((0, f32::NEG_INFINITY), |best, (action, &p)| {
            if p > best.1 {
                (action, p)
            } else {
                best
            }
        })
        .0
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use model::{CheckpointTag, Predictor, TrainingExample};
    use std::path::Path;

    #[derive(Clone, Debug)]
    struct CountState {
        moves: usize,
    }

    impl GameState for CountState {
        fn initial() -> Self {
            Self { moves: 0 }
        }
    }

    /// Ends after `target` moves. The last mover wins unless `drawn`.
    struct CountdownEngine {
        target: usize,
        drawn: bool,
    }

    impl GameEngine for CountdownEngine {
        type State = CountState;

        fn action_size(&self) -> usize {
            1
        }

        fn canonical_form(&self, state: &CountState, _player: Player) -> CountState {
            state.clone()
        }

        fn next_state(
            &self,
            state: &CountState,
            player: Player,
            _action: usize,
        ) -> (CountState, Player) {
            (
                CountState {
                    moves: state.moves + 1,
                },
                -player,
            )
        }

        fn game_ended(&self, state: &CountState, _player: Player) -> Option<f32> {
            if state.moves < self.target {
                None
            } else if self.drawn {
                Some(0.0)
            } else {
                Some(-1.0)
            }
        }

        fn symmetries(&self, state: &CountState, policy: &[f32]) -> Vec<(CountState, Vec<f32>)> {
            vec![(state.clone(), policy.to_vec())]
        }
    }

    #[derive(Clone)]
    struct StubPredictor;

    struct StubPolicy;

    impl SearchPolicy for StubPolicy {
        type State = CountState;

        fn action_probabilities(
            &mut self,
            _state: &CountState,
            _temperature: f32,
        ) -> Result<Vec<f32>> {
            Ok(vec![1.0])
        }
    }

    impl Predictor for StubPredictor {
        type State = CountState;

        fn predict(&self, _state: &CountState) -> Result<(Vec<f32>, f32)> {
            Ok((vec![1.0], 0.0))
        }

        fn train(&mut self, _examples: &[TrainingExample<CountState>]) -> Result<()> {
            Ok(())
        }

        fn save_checkpoint(&self, _dir: &Path, _tag: &CheckpointTag) -> Result<()> {
            Ok(())
        }

        fn load_checkpoint(&mut self, _dir: &Path, _tag: &CheckpointTag) -> Result<()> {
            Ok(())
        }
    }

    impl PolicySource for StubPredictor {
        type Policy<'a> = StubPolicy where Self: 'a;

        fn fresh_policy(&self) -> StubPolicy {
            StubPolicy
        }
    }

    #[test]
    fn test_first_mover_wins_split_by_alternating_seats() {
        // Odd target: whoever moves first wins. The candidate takes the
        // first seat in games 0, 2, 4.
        let engine = CountdownEngine {
            target: 3,
            drawn: false,
        };

        let result = play_games(&engine, &StubPredictor, &StubPredictor, 5).unwrap();

        assert_eq!(result.candidate_wins, 3);
        assert_eq!(result.incumbent_wins, 2);
        assert_eq!(result.draws, 0);
        assert_eq!(result.num_games(), 5);
    }

    #[test]
    fn test_all_draws_are_counted_as_draws() {
        let engine = CountdownEngine {
            target: 4,
            drawn: true,
        };

        let result = play_games(&engine, &StubPredictor, &StubPredictor, 6).unwrap();

        assert_eq!(result.candidate_wins, 0);
        assert_eq!(result.incumbent_wins, 0);
        assert_eq!(result.draws, 6);
    }
}
