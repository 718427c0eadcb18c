//! The per-match escrow record and its lifecycle state machine.
//!
//! ## State Machine
//!
//! ```text
//!   ┌───────────────────┐  2nd deposit   ┌───────┐  submit_result  ┌─────────┐
//!   │ AWAITING_DEPOSITS ├───────────────▶│ READY ├────────────────▶│ SETTLED │
//!   └─────────┬─────────┘                └───────┘                 └─────────┘
//!             │ cancel
//!             ▼
//!   ┌───────────┐
//!   │ CANCELLED │
//!   └───────────┘
//! ```
//!
//! `Settled` and `Cancelled` are terminal. There is deliberately no
//! `Ready → Cancelled` edge: once both stakes are locked, the only way out
//! is settlement by the oracle.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{EscrowError, MatchId, MatchOutcome, PlayerId};

/// The lifecycle state of an escrowed match.
///
/// Transitions are **monotonic** (never go backwards):
/// - `AwaitingDeposits → Ready` (second stake locked)
/// - `AwaitingDeposits → Cancelled` (cancelled before both stakes locked)
/// - `Ready → Settled` (oracle reported an outcome)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchState {
    /// Waiting for one or both stakes. At least one deposit flag is false.
    AwaitingDeposits,
    /// Both stakes locked. Only the oracle's settlement can end the match.
    Ready,
    /// Funds distributed per the reported outcome. **Irreversible.**
    Settled,
    /// Ended before activation; any locked stake was refunded. **Irreversible.**
    Cancelled,
}

impl MatchState {
    /// Can a match in this state transition to the given target state?
    #[must_use]
    pub fn can_transition_to(&self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::AwaitingDeposits, Self::Ready | Self::Cancelled)
                | (Self::Ready, Self::Settled)
        )
    }

    /// Whether this state accepts no further operations.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Settled | Self::Cancelled)
    }
}

impl std::fmt::Display for MatchState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AwaitingDeposits => write!(f, "AWAITING_DEPOSITS"),
            Self::Ready => write!(f, "READY"),
            Self::Settled => write!(f, "SETTLED"),
            Self::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// One escrowed, two-party wagered match.
///
/// The record is the unit of escrow: both participants lock exactly `stake`,
/// and the full held balance is distributed on settlement or cancellation.
/// Terminal records are retained for audit but accept no further mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRecord {
    /// Caller-supplied unique identifier.
    pub id: MatchId,
    /// The two participants. Index 0 is "first" for result reporting only;
    /// order carries no fund entitlement.
    pub players: [PlayerId; 2],
    /// The fixed amount each participant must lock. Identical for both.
    pub stake: Decimal,
    /// Current lifecycle state.
    pub state: MatchState,
    /// Per-player deposit flags, same indexing as `players`.
    pub deposited: [bool; 2],
    /// Sum of confirmed deposits: `stake × count(deposited)`.
    pub held: Decimal,
    /// The reported outcome. `Some` exactly when `state` is `Settled`.
    pub outcome: Option<MatchOutcome>,
    /// When the match was created.
    pub created_at: DateTime<Utc>,
}

impl MatchRecord {
    /// Record a fresh match awaiting both deposits.
    #[must_use]
    pub fn new(id: MatchId, first: PlayerId, second: PlayerId, stake: Decimal) -> Self {
        Self {
            id,
            players: [first, second],
            stake,
            state: MatchState::AwaitingDeposits,
            deposited: [false, false],
            held: Decimal::ZERO,
            outcome: None,
            created_at: Utc::now(),
        }
    }

    /// The participant index (0 or 1) of `player`, if they belong to
    /// this match.
    #[must_use]
    pub fn participant_index(&self, player: PlayerId) -> Option<usize> {
        self.players.iter().position(|p| *p == player)
    }

    /// Whether both deposit flags are set.
    #[must_use]
    pub fn fully_funded(&self) -> bool {
        self.deposited.iter().all(|d| *d)
    }

    /// Attempt a state transition, enforcing the lifecycle edges.
    ///
    /// # Errors
    /// Returns [`EscrowError::WrongState`] if the edge does not exist.
    pub fn transition(&mut self, target: MatchState) -> crate::Result<()> {
        if !self.state.can_transition_to(target) {
            return Err(EscrowError::WrongState {
                expected: self.state,
                actual: target,
            });
        }
        self.state = target;
        Ok(())
    }

    /// Check the per-match holdings invariant: held balance equals
    /// stake times the number of confirmed deposits.
    #[must_use]
    pub fn holdings_consistent(&self) -> bool {
        let funded = self.deposited.iter().filter(|d| **d).count();
        self.held == self.stake * Decimal::from(funded)
    }
}
