use super::evaluate::MatchResult;

/// Whether a freshly trained candidate replaces the deployed model.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GateDecision {
    Accept,
    Reject,
}

impl GateDecision {
    /// One-shot gate over head-to-head results: accept iff decisive games
    /// were played and the candidate took at least `update_threshold` of
    /// them. An all-draw match rejects; the candidate must show a
    /// measurable edge, not merely avoid losing.
    pub fn from_match(result: &MatchResult, update_threshold: f32) -> Self {
        let decisive_games = result.candidate_wins + result.incumbent_wins;

        if decisive_games == 0 {
            return GateDecision::Reject;
        }

        let win_rate = result.candidate_wins as f32 / decisive_games as f32;

        if win_rate >= update_threshold {
            GateDecision::Accept
        } else {
            GateDecision::Reject
        }
    }
}
