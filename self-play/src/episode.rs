use anyhow::{ensure, Context, Result};
use rand::distributions::WeightedIndex;
use rand::prelude::*;

use engine::{GameEngine, GameState, Player};
use model::{SearchPolicy, TrainingExample};

use super::options::SelfPlayOptions;

/// A decision point whose outcome is not yet known. Buffered until the
/// episode resolves; `TrainingExample`s are materialized in one pass at
/// the end so no partially labeled record ever escapes.
struct PendingExample<S> {
    state: S,
    player: Player,
    policy: Vec<f32>,
}

/// Plays one game to termination with the given search policy, returning
/// one fully labeled example per symmetry variant of every decision point.
///
/// Actions are sampled from the search distribution rather than taken by
/// arg-max, preserving exploration even after the temperature drops to 0.
/// Termination is a liveness assumption on the game; an engine that never
/// reaches a terminal state stalls the episode.
pub fn run_episode<E, P>(
    engine: &E,
    policy: &mut P,
    options: &SelfPlayOptions,
) -> Result<Vec<TrainingExample<E::State>>>
where
    E: GameEngine,
    P: SearchPolicy<State = E::State>,
{
    let mut state = E::State::initial();
    let mut player: Player = 1;
    let mut ply: usize = 0;
    let mut pending: Vec<PendingExample<E::State>> = Vec::new();
    let mut rng = rand::thread_rng();

    loop {
        let canonical = engine.canonical_form(&state, player);
        let temperature = if ply < options.temp_threshold { 1.0 } else { 0.0 };

        let distribution = policy.action_probabilities(&canonical, temperature)?;
        ensure!(
            distribution.len() == engine.action_size(),
            "search policy returned {} action probabilities, expected {}",
            distribution.len(),
            engine.action_size()
        );

        for (sym_state, sym_policy) in engine.symmetries(&canonical, &distribution) {
            pending.push(PendingExample {
                state: sym_state,
                player,
                policy: sym_policy,
            });
        }

        let action = WeightedIndex::new(&distribution)
            .context("search policy returned a degenerate distribution")?
            .sample(&mut rng);

        let (next_state, next_player) = engine.next_state(&state, player, action);
        state = next_state;
        player = next_player;
        ply += 1;

        if let Some(result) = engine.game_ended(&state, player) {
            // `result` is relative to the player now to move; flip it for
            // every recorded decision point of the other player.
            return Ok(pending
                .into_iter()
                .map(|p| {
                    let outcome = if p.player == player { result } else { -result };
                    TrainingExample::new(p.state, p.policy, outcome)
                })
                .collect());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A race to `target` moves; the player who makes the last move wins.
    /// With two interchangeable actions the game is fully deterministic in
    /// length, which pins down every example's mover and outcome.
    #[derive(Clone, Debug)]
    struct CountState {
        moves: usize,
    }

    impl GameState for CountState {
        fn initial() -> Self {
            Self { moves: 0 }
        }
    }

    struct CountdownEngine {
        target: usize,
        drawn: bool,
    }

    impl GameEngine for CountdownEngine {
        type State = CountState;

        fn action_size(&self) -> usize {
            2
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
                // The player who just moved won; the player now to move lost.
                Some(-1.0)
            }
        }

        fn symmetries(&self, state: &CountState, policy: &[f32]) -> Vec<(CountState, Vec<f32>)> {
            let mirrored: Vec<f32> = policy.iter().rev().cloned().collect();
            vec![(state.clone(), policy.to_vec()), (state.clone(), mirrored)]
        }
    }

    struct FixedPolicy {
        seen_temperatures: Vec<f32>,
    }

    impl SearchPolicy for FixedPolicy {
        type State = CountState;

        fn action_probabilities(
            &mut self,
            _state: &CountState,
            temperature: f32,
        ) -> Result<Vec<f32>> {
            self.seen_temperatures.push(temperature);
            Ok(vec![0.5, 0.5])
        }
    }

    fn options(temp_threshold: usize) -> SelfPlayOptions {
        SelfPlayOptions { temp_threshold }
    }

    struct WrongSizePolicy;

    impl SearchPolicy for WrongSizePolicy {
        type State = CountState;

        fn action_probabilities(
            &mut self,
            _state: &CountState,
            _temperature: f32,
        ) -> Result<Vec<f32>> {
            Ok(vec![0.5, 0.3, 0.2])
        }
    }

    #[test]
    fn test_policy_must_span_the_action_space() {
        let engine = CountdownEngine {
            target: 3,
            drawn: false,
        };
        let mut policy = WrongSizePolicy;

        let res = run_episode(&engine, &mut policy, &options(10));

        assert!(res.is_err());
    }

    #[test]
    fn test_outcomes_follow_the_sign_flip_law() {
        // Three moves: first mover also makes the final, winning move.
        let engine = CountdownEngine {
            target: 3,
            drawn: false,
        };
        let mut policy = FixedPolicy {
            seen_temperatures: Vec::new(),
        };

        let examples = run_episode(&engine, &mut policy, &options(10)).unwrap();

        // 3 plies, 2 symmetry variants each.
        assert_eq!(examples.len(), 6);
        let outcomes: Vec<f32> = examples.iter().map(|e| e.outcome).collect();
        assert_eq!(outcomes, vec![1.0, 1.0, -1.0, -1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_second_mover_win_flips_every_sign() {
        let engine = CountdownEngine {
            target: 4,
            drawn: false,
        };
        let mut policy = FixedPolicy {
            seen_temperatures: Vec::new(),
        };

        let examples = run_episode(&engine, &mut policy, &options(10)).unwrap();

        let outcomes: Vec<f32> = examples.iter().map(|e| e.outcome).collect();
        assert_eq!(
            outcomes,
            vec![-1.0, -1.0, 1.0, 1.0, -1.0, -1.0, 1.0, 1.0]
        );
    }

    #[test]
    fn test_drawn_game_labels_every_example_zero() {
        let engine = CountdownEngine {
            target: 5,
            drawn: true,
        };
        let mut policy = FixedPolicy {
            seen_temperatures: Vec::new(),
        };

        let examples = run_episode(&engine, &mut policy, &options(10)).unwrap();

        assert!(examples.iter().all(|e| e.outcome == 0.0));
    }

    #[test]
    fn test_symmetry_variants_share_their_outcome() {
        let engine = CountdownEngine {
            target: 7,
            drawn: false,
        };
        let mut policy = FixedPolicy {
            seen_temperatures: Vec::new(),
        };

        let examples = run_episode(&engine, &mut policy, &options(10)).unwrap();

        for variants in examples.chunks(2) {
            assert_eq!(variants[0].outcome, variants[1].outcome);
        }
    }

    #[test]
    fn test_temperature_drops_to_zero_after_threshold() {
        let engine = CountdownEngine {
            target: 4,
            drawn: false,
        };
        let mut policy = FixedPolicy {
            seen_temperatures: Vec::new(),
        };

        run_episode(&engine, &mut policy, &options(2)).unwrap();

        assert_eq!(policy.seen_temperatures, vec![1.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_outcomes_are_valid_results() {
        let engine = CountdownEngine {
            target: 6,
            drawn: false,
        };
        let mut policy = FixedPolicy {
            seen_temperatures: Vec::new(),
        };

        let examples = run_episode(&engine, &mut policy, &options(3)).unwrap();

        assert!(examples
            .iter()
            .all(|e| e.outcome == -1.0 || e.outcome == 0.0 || e.outcome == 1.0));
    }
}
