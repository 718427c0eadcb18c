//! Pending-credit book for deferred payouts.
//!
//! When an outbound transfer fails after settlement has already committed,
//! the recipient's share is parked here instead of reverting the whole
//! operation. One uncooperative recipient therefore cannot block the other
//! party's already-computed share. Credits are withdrawn explicitly and
//! exactly once.

use std::collections::HashMap;

use rust_decimal::Decimal;
use stakematch_types::PlayerId;

/// Per-recipient withdrawable credits.
///
/// Credited value still counts as engine-held until it is withdrawn, so
/// the holdings conservation invariant spans this book too.
#[derive(Debug, Default)]
pub struct PendingCredits {
    credits: HashMap<PlayerId, Decimal>,
}

impl PendingCredits {
    #[must_use]
    pub fn new() -> Self {
        Self {
            credits: HashMap::new(),
        }
    }

    /// Park a failed payout for `recipient`.
    pub fn add(&mut self, recipient: PlayerId, amount: Decimal) {
        *self.credits.entry(recipient).or_insert(Decimal::ZERO) += amount;
    }

    /// Remove and return the full credit of `recipient`, if any.
    ///
    /// The caller is responsible for either delivering the amount or
    /// putting it back with [`add`](Self::add) — taking is not spending.
    pub fn take(&mut self, recipient: PlayerId) -> Option<Decimal> {
        self.credits.remove(&recipient)
    }

    /// Current credit of a recipient (zero if none).
    #[must_use]
    pub fn balance_of(&self, recipient: PlayerId) -> Decimal {
        self.credits
            .get(&recipient)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// Sum of all outstanding credits.
    #[must_use]
    pub fn total(&self) -> Decimal {
        self.credits.values().copied().sum()
    }

    /// Number of recipients with an outstanding credit.
    #[must_use]
    pub fn len(&self) -> usize {
        self.credits.len()
    }

    /// Whether no credits are outstanding.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.credits.is_empty()
    }
}
