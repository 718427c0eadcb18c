//! Match outcomes as reported by the oracle.

use serde::{Deserialize, Serialize};

/// The result of a wagered match, reported by the trusted oracle.
///
/// "First" and "Second" refer to the participant order fixed at match
/// creation; the order matters only for result reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchOutcome {
    /// The first participant takes the full pot.
    FirstWins,
    /// The second participant takes the full pot.
    SecondWins,
    /// Each participant gets their stake back.
    Draw,
}

impl MatchOutcome {
    /// Index of the winning participant, or `None` for a draw.
    #[must_use]
    pub fn winner_index(&self) -> Option<usize> {
        match self {
            Self::FirstWins => Some(0),
            Self::SecondWins => Some(1),
            Self::Draw => None,
        }
    }
}

impl std::fmt::Display for MatchOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::FirstWins => write!(f, "FIRST_WINS"),
            Self::SecondWins => write!(f, "SECOND_WINS"),
            Self::Draw => write!(f, "DRAW"),
        }
    }
}
