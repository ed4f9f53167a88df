use super::game_state::GameState;

/// Player identity. The first mover is `1`, the opponent `-1`.
pub type Player = i8;

/// Terminal score of a finished game from the perspective of the player to
/// move: `1.0` that player won, `-1.0` they lost, `0.0` a draw.
pub type GameResult = f32;

/// Rules of a two-player, turn-based, perfect-information game. Actions are
/// indices into a fixed-size policy vector of length `action_size`.
pub trait GameEngine {
    type State: GameState;

    /// Length of the action-probability vector.
    fn action_size(&self) -> usize;

    /// The state as seen from `player`'s perspective. Search and training
    /// always operate on canonical states.
    fn canonical_form(&self, state: &Self::State, player: Player) -> Self::State;

    /// Applies `action` for `player`, returning the successor state and the
    /// next player to move.
    fn next_state(&self, state: &Self::State, player: Player, action: usize)
        -> (Self::State, Player);

    /// `None` while the game is ongoing, otherwise the result relative to
    /// `player`.
    fn game_ended(&self, state: &Self::State, player: Player) -> Option<GameResult>;

    /// All transformations of `(state, policy)` that preserve game
    /// semantics, such as board rotations and reflections. The identity is
    /// included.
    fn symmetries(&self, state: &Self::State, policy: &[f32]) -> Vec<(Self::State, Vec<f32>)>;
}
