//! Error types for the StakeMatch escrow engine.
//!
//! All errors use the `SM_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Match lifecycle errors
//! - 2xx: Deposit errors
//! - 3xx: Payout / credit errors
//! - 4xx: Authorization errors
//! - 9xx: Safety invariant errors

use rust_decimal::Decimal;
use thiserror::Error;

use crate::{MatchId, MatchState, PlayerId};

/// Central error enum for all escrow operations.
///
/// Every failure is exactly one of these kinds — there is no generic
/// catch-all. A failing precondition check aborts the whole operation with
/// no partial state mutation.
#[derive(Debug, Error)]
pub enum EscrowError {
    // =================================================================
    // Match lifecycle errors (1xx)
    // =================================================================
    /// No match exists under this identifier.
    #[error("SM_ERR_100: Match not found: {0}")]
    MatchNotFound(MatchId),

    /// A match with this identifier already exists.
    #[error("SM_ERR_101: Match already exists: {0}")]
    DuplicateMatch(MatchId),

    /// The two participant identities are equal, or one is the null identity.
    #[error("SM_ERR_102: Invalid participants: {reason}")]
    InvalidParticipants { reason: String },

    /// The stake is not strictly positive.
    #[error("SM_ERR_103: Invalid stake: {stake}")]
    InvalidStake { stake: Decimal },

    /// The operation is not permitted in the match's current state.
    #[error("SM_ERR_104: Wrong match state: expected {expected}, got {actual}")]
    WrongState {
        expected: MatchState,
        actual: MatchState,
    },

    // =================================================================
    // Deposit errors (2xx)
    // =================================================================
    /// The caller is not one of the match's two participants.
    #[error("SM_ERR_200: Not a participant of match {match_id}: {caller}")]
    NotAParticipant { match_id: MatchId, caller: PlayerId },

    /// The caller's stake has already been deposited.
    #[error("SM_ERR_201: Already deposited for match {0}")]
    AlreadyDeposited(MatchId),

    /// The transferred value does not exactly equal the stake.
    #[error("SM_ERR_202: Wrong deposit amount: expected {expected}, got {actual}")]
    WrongAmount { expected: Decimal, actual: Decimal },

    // =================================================================
    // Payout / credit errors (3xx)
    // =================================================================
    /// An outbound value transfer was rejected by the recipient side.
    #[error("SM_ERR_300: Transfer of {amount} to {recipient} failed: {reason}")]
    TransferFailed {
        recipient: PlayerId,
        amount: Decimal,
        reason: String,
    },

    /// The caller has no pending credit to withdraw.
    #[error("SM_ERR_301: No pending credit for {0}")]
    NoPendingCredit(PlayerId),

    // =================================================================
    // Authorization errors (4xx)
    // =================================================================
    /// Result submission attempted by an identity other than the oracle.
    #[error("SM_ERR_400: Caller {0} is not the oracle")]
    NotOracle(PlayerId),

    /// The caller holds no capability for this operation.
    #[error("SM_ERR_401: Caller {0} is not authorized")]
    NotAuthorized(PlayerId),

    // =================================================================
    // Safety invariant errors (9xx)
    // =================================================================
    /// Holdings conservation invariant violated — critical safety alert.
    #[error("SM_ERR_900: Holdings invariant violation: {reason}")]
    HoldingsInvariantViolation { reason: String },
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, EscrowError>;
