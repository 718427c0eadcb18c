//! The value-transfer seam.
//!
//! Settlement and cancellation end with an outbound transfer to a
//! recipient. The engine performs that transfer through [`ValueTransfer`]
//! so the funds mechanism stays pluggable — a multi-asset strategy can
//! slot in later without touching settlement logic. The trait reports
//! success or failure explicitly; a payout is never silently lost.

use std::collections::HashMap;

use rust_decimal::Decimal;
use stakematch_types::PlayerId;
use thiserror::Error;

/// An outbound transfer was rejected by the recipient side.
#[derive(Debug, Clone, Error)]
#[error("transfer rejected: {reason}")]
pub struct TransferError {
    pub reason: String,
}

impl TransferError {
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Strategy for moving value out of the engine to a recipient.
///
/// Implementations must be atomic per call: either the full amount is
/// delivered and `Ok(())` returned, or nothing moved and an error
/// returned. The engine invokes `pay` only after all of its own
/// bookkeeping is committed, so implementations can never observe a
/// half-transitioned match.
pub trait ValueTransfer {
    /// Deliver `amount` to `recipient`.
    ///
    /// # Errors
    /// Returns [`TransferError`] if the recipient cannot receive.
    fn pay(&mut self, recipient: PlayerId, amount: Decimal) -> Result<(), TransferError>;
}

/// In-memory per-player cash book.
///
/// The reference [`ValueTransfer`] implementation: payouts credit the
/// recipient's balance. Also tracks the inbound side (`fund` / `debit`)
/// so tests and demos can model a player's wallet end to end.
#[derive(Debug, Default)]
pub struct CashLedger {
    balances: HashMap<PlayerId, Decimal>,
}

impl CashLedger {
    #[must_use]
    pub fn new() -> Self {
        Self {
            balances: HashMap::new(),
        }
    }

    /// Add funds to a player's balance.
    pub fn fund(&mut self, player: PlayerId, amount: Decimal) {
        *self.balances.entry(player).or_insert(Decimal::ZERO) += amount;
    }

    /// Remove funds from a player's balance, e.g. to attach value to a
    /// deposit call.
    ///
    /// # Errors
    /// Returns [`TransferError`] if the balance is insufficient.
    pub fn debit(&mut self, player: PlayerId, amount: Decimal) -> Result<(), TransferError> {
        let balance = self.balances.entry(player).or_insert(Decimal::ZERO);
        if *balance < amount {
            return Err(TransferError::new(format!(
                "insufficient balance: need {amount}, have {balance}"
            )));
        }
        *balance -= amount;
        Ok(())
    }

    /// Current balance of a player (zero if unknown).
    #[must_use]
    pub fn balance_of(&self, player: PlayerId) -> Decimal {
        self.balances.get(&player).copied().unwrap_or(Decimal::ZERO)
    }

    /// Sum of all player balances.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.balances.values().copied().sum()
    }
}

impl ValueTransfer for CashLedger {
    fn pay(&mut self, recipient: PlayerId, amount: Decimal) -> Result<(), TransferError> {
        self.fund(recipient, amount);
        Ok(())
    }
}
