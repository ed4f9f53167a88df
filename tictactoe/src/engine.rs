use engine::{GameEngine, Player};
use serde::{Deserialize, Serialize};

/// 3x3 board in row-major order; `1` and `-1` are the players' marks, `0`
/// an empty cell. In canonical form the player to move always holds the
/// `1` marks.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GameState {
    pub cells: [i8; 9],
}

impl engine::GameState for GameState {
    fn initial() -> Self {
        Self { cells: [0; 9] }
    }
}

impl GameState {
    pub fn valid_actions(&self) -> impl Iterator<Item = usize> + '_ {
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, &c)| c == 0)
            .map(|(i, _)| i)
    }
}

const LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

#[derive(Default)]
pub struct Engine;

impl Engine {
    pub fn new() -> Self {
        Self
    }
}

impl GameEngine for Engine {
    type State = GameState;

    fn action_size(&self) -> usize {
        9
    }

    fn canonical_form(&self, state: &GameState, player: Player) -> GameState {
        let mut cells = state.cells;

        for cell in cells.iter_mut() {
            *cell *= player;
        }

        GameState { cells }
    }

    fn next_state(&self, state: &GameState, player: Player, action: usize) -> (GameState, Player) {
        debug_assert_eq!(state.cells[action], 0, "cell {} already taken", action);

        let mut cells = state.cells;
        cells[action] = player;

        (GameState { cells }, -player)
    }

    fn game_ended(&self, state: &GameState, player: Player) -> Option<f32> {
        for line in &LINES {
            let marks = line.map(|i| state.cells[i]);

            if marks[0] != 0 && marks[0] == marks[1] && marks[1] == marks[2] {
                return Some(if marks[0] == player { 1.0 } else { -1.0 });
            }
        }

        if state.cells.iter().all(|&c| c != 0) {
            return Some(0.0);
        }

        None
    }

    fn symmetries(&self, state: &GameState, policy: &[f32]) -> Vec<(GameState, Vec<f32>)> {
        dihedral_permutations()
            .iter()
            .map(|perm| {
                let mut cells = [0i8; 9];
                let mut permuted_policy = vec![0.0; 9];

                for (target, &source) in perm.iter().enumerate() {
                    cells[target] = state.cells[source];
                    permuted_policy[target] = policy[source];
                }

                (GameState { cells }, permuted_policy)
            })
            .collect()
    }
}

/// The eight symmetries of the square: four rotations, each with and
/// without a horizontal mirror. `perm[target] = source` index maps applied
/// identically to cells and policy, so variants stay outcome-consistent.
fn dihedral_permutations() -> [[usize; 9]; 8] {
    let identity: [usize; 9] = [0, 1, 2, 3, 4, 5, 6, 7, 8];

    let rotate = |perm: &[usize; 9]| {
        let mut out = [0usize; 9];
        for r in 0..3 {
            for c in 0..3 {
                out[r * 3 + c] = perm[(2 - c) * 3 + r];
            }
        }
        out
    };

    let mirror = |perm: &[usize; 9]| {
        let mut out = [0usize; 9];
        for r in 0..3 {
            for c in 0..3 {
                out[r * 3 + c] = perm[r * 3 + (2 - c)];
            }
        }
        out
    };

    let r0 = identity;
    let r1 = rotate(&r0);
    let r2 = rotate(&r1);
    let r3 = rotate(&r2);

    [
        r0,
        r1,
        r2,
        r3,
        mirror(&r0),
        mirror(&r1),
        mirror(&r2),
        mirror(&r3),
    ]
}
