//! Notifications emitted by the escrow engine.
//!
//! Events are the engine's only output channel: the backend listens for
//! them to drive its own game-progress state. The engine never calls out
//! into the backend directly.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{MatchId, MatchOutcome, PlayerId};

/// A single (recipient, amount) leg of a settlement or refund schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    pub recipient: PlayerId,
    pub amount: Decimal,
}

/// What happened. One variant per observable engine action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    /// A new match was recorded, awaiting both deposits.
    MatchCreated {
        match_id: MatchId,
        players: [PlayerId; 2],
        stake: Decimal,
    },
    /// A participant's stake was locked.
    DepositConfirmed {
        match_id: MatchId,
        player: PlayerId,
        held: Decimal,
    },
    /// Both stakes are locked; only settlement can end the match now.
    MatchReady { match_id: MatchId },
    /// The oracle reported an outcome and the pot was distributed.
    Settled {
        match_id: MatchId,
        outcome: MatchOutcome,
        payouts: Vec<Payout>,
    },
    /// The match ended before activation; locked stakes were refunded.
    Cancelled {
        match_id: MatchId,
        refunds: Vec<Payout>,
    },
    /// An outbound payout was rejected by the recipient side and was
    /// routed into the pending-credit book instead.
    PayoutDeferred {
        match_id: MatchId,
        recipient: PlayerId,
        amount: Decimal,
    },
    /// The owner replaced the oracle identity.
    OracleRotated {
        previous: PlayerId,
        next: PlayerId,
    },
    /// A recipient withdrew their pending credit.
    CreditWithdrawn {
        recipient: PlayerId,
        amount: Decimal,
    },
}

/// A timestamped engine notification, appended to the audit log in
/// emission order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowEvent {
    pub kind: EventKind,
    pub emitted_at: DateTime<Utc>,
}

impl EscrowEvent {
    #[must_use]
    pub fn now(kind: EventKind) -> Self {
        Self {
            kind,
            emitted_at: Utc::now(),
        }
    }
}
