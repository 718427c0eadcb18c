//! The escrow settlement engine.
//!
//! One cohesive ledger of per-match escrow state plus a set of guarded
//! transitions. Each operation is atomic: it either completes fully
//! (state mutated, funds moved, event appended) or fails with no state
//! change. Outbound transfers are always the *last* effect of a settling
//! or cancelling operation — all bookkeeping is committed first, so a
//! malicious or failing recipient can never re-enter and observe a stale
//! pre-transition state.

use std::collections::HashMap;

use rust_decimal::Decimal;
use stakematch_types::{
    EngineConfig, EscrowError, EscrowEvent, EventKind, MatchId, MatchOutcome, MatchRecord,
    MatchState, Payout, PlayerId, Result,
};

use crate::credits::PendingCredits;
use crate::transfer::ValueTransfer;

/// Deterministic state machine keyed by match identifier.
///
/// Generic over the outbound [`ValueTransfer`] strategy so the funds
/// mechanism stays pluggable (see the crate docs). All operations take
/// `&mut self`: the engine is single-writer by construction, which gives
/// every match a total order of operations.
pub struct EscrowEngine<T: ValueTransfer> {
    config: EngineConfig,
    /// All matches ever created, terminal records included (audit).
    matches: HashMap<MatchId, MatchRecord>,
    /// Engine-wide held balance. Invariant: equals Σ match.held.
    held_total: Decimal,
    /// Deferred payouts awaiting explicit withdrawal.
    credits: PendingCredits,
    /// Append-only notification log, in emission order.
    events: Vec<EscrowEvent>,
    /// The outbound funds mechanism.
    transfer: T,
    /// Lifetime value accepted through deposits.
    total_in: Decimal,
    /// Lifetime value successfully delivered to recipients.
    total_out: Decimal,
}

impl<T: ValueTransfer> EscrowEngine<T> {
    /// Create an engine with the given owner/oracle configuration and
    /// transfer strategy.
    #[must_use]
    pub fn new(config: EngineConfig, transfer: T) -> Self {
        Self {
            config,
            matches: HashMap::new(),
            held_total: Decimal::ZERO,
            credits: PendingCredits::new(),
            events: Vec::new(),
            transfer,
            total_in: Decimal::ZERO,
            total_out: Decimal::ZERO,
        }
    }

    // =====================================================================
    // State-changing operations
    // =====================================================================

    /// Record a new match in `AwaitingDeposits`.
    ///
    /// The identifier is caller-supplied and must be fresh. Identifiers of
    /// settled or cancelled matches are never reusable either: terminal
    /// records stay in the ledger.
    ///
    /// # Errors
    /// `DuplicateMatch`, `InvalidParticipants`, `InvalidStake`.
    pub fn create_match(
        &mut self,
        id: MatchId,
        first: PlayerId,
        second: PlayerId,
        stake: Decimal,
    ) -> Result<()> {
        if self.matches.contains_key(&id) {
            return Err(EscrowError::DuplicateMatch(id));
        }
        if first.is_nil() || second.is_nil() {
            return Err(EscrowError::InvalidParticipants {
                reason: "null identity".to_string(),
            });
        }
        if first == second {
            return Err(EscrowError::InvalidParticipants {
                reason: format!("both participants are {first}"),
            });
        }
        if stake <= Decimal::ZERO {
            return Err(EscrowError::InvalidStake { stake });
        }

        self.matches
            .insert(id, MatchRecord::new(id, first, second, stake));
        tracing::info!(match_id = %id, %stake, "match created");
        self.emit(EventKind::MatchCreated {
            match_id: id,
            players: [first, second],
            stake,
        });
        Ok(())
    }

    /// Lock a participant's stake.
    ///
    /// `value` is the amount the caller attached; it must equal the stake
    /// exactly — no partial deposits, no change-making. The second deposit
    /// transitions the match to `Ready`.
    ///
    /// # Errors
    /// `MatchNotFound`, `WrongState`, `NotAParticipant`,
    /// `AlreadyDeposited`, `WrongAmount`.
    pub fn deposit(&mut self, id: MatchId, caller: PlayerId, value: Decimal) -> Result<()> {
        let record = self
            .matches
            .get_mut(&id)
            .ok_or(EscrowError::MatchNotFound(id))?;

        if record.state != MatchState::AwaitingDeposits {
            return Err(EscrowError::WrongState {
                expected: MatchState::AwaitingDeposits,
                actual: record.state,
            });
        }
        let idx = record
            .participant_index(caller)
            .ok_or(EscrowError::NotAParticipant {
                match_id: id,
                caller,
            })?;
        if record.deposited[idx] {
            return Err(EscrowError::AlreadyDeposited(id));
        }
        if value != record.stake {
            return Err(EscrowError::WrongAmount {
                expected: record.stake,
                actual: value,
            });
        }

        record.deposited[idx] = true;
        record.held += value;
        let held = record.held;
        let ready = record.fully_funded();
        if ready {
            record.transition(MatchState::Ready)?;
        }
        self.held_total += value;
        self.total_in += value;

        tracing::info!(match_id = %id, player = %caller, %held, "deposit confirmed");
        self.emit(EventKind::DepositConfirmed {
            match_id: id,
            player: caller,
            held,
        });
        if ready {
            tracing::info!(match_id = %id, "match ready");
            self.emit(EventKind::MatchReady { match_id: id });
        }
        Ok(())
    }

    /// Settle a `Ready` match with the oracle-reported outcome.
    ///
    /// A decisive outcome pays the winner the full pot (2×stake); a draw
    /// returns each participant their stake. Transfers happen after the
    /// transition and balance zeroing are committed; a failed transfer
    /// defers to the pending-credit book and never reverts settlement.
    ///
    /// # Errors
    /// `MatchNotFound`, `NotOracle`, `WrongState`.
    pub fn submit_result(
        &mut self,
        id: MatchId,
        caller: PlayerId,
        outcome: MatchOutcome,
    ) -> Result<()> {
        let record = self
            .matches
            .get_mut(&id)
            .ok_or(EscrowError::MatchNotFound(id))?;
        if caller != self.config.oracle {
            return Err(EscrowError::NotOracle(caller));
        }
        if record.state != MatchState::Ready {
            return Err(EscrowError::WrongState {
                expected: MatchState::Ready,
                actual: record.state,
            });
        }

        let payouts: Vec<Payout> = match outcome.winner_index() {
            Some(winner) => vec![Payout {
                recipient: record.players[winner],
                amount: record.held,
            }],
            None => record
                .players
                .iter()
                .map(|p| Payout {
                    recipient: *p,
                    amount: record.stake,
                })
                .collect(),
        };

        // Commit all bookkeeping before any external transfer.
        record.transition(MatchState::Settled)?;
        record.outcome = Some(outcome);
        let released = record.held;
        record.held = Decimal::ZERO;
        self.held_total -= released;

        tracing::info!(match_id = %id, %outcome, pot = %released, "match settled");
        self.emit(EventKind::Settled {
            match_id: id,
            outcome,
            payouts: payouts.clone(),
        });

        for payout in payouts {
            self.pay_or_defer(id, payout.recipient, payout.amount);
        }
        Ok(())
    }

    /// Cancel a match that is not yet `Ready`.
    ///
    /// The oracle or either participant may cancel. Every participant
    /// whose stake is locked is refunded; since `Ready` is unreachable
    /// here that is zero or one refund, never two.
    ///
    /// # Errors
    /// `MatchNotFound`, `NotAuthorized`, `WrongState`.
    pub fn cancel_match(&mut self, id: MatchId, caller: PlayerId) -> Result<()> {
        let record = self
            .matches
            .get_mut(&id)
            .ok_or(EscrowError::MatchNotFound(id))?;

        let is_participant = record.participant_index(caller).is_some();
        if caller != self.config.oracle && !is_participant {
            return Err(EscrowError::NotAuthorized(caller));
        }
        if record.state != MatchState::AwaitingDeposits {
            return Err(EscrowError::WrongState {
                expected: MatchState::AwaitingDeposits,
                actual: record.state,
            });
        }

        let refunds: Vec<Payout> = record
            .players
            .iter()
            .zip(record.deposited)
            .filter(|(_, deposited)| *deposited)
            .map(|(p, _)| Payout {
                recipient: *p,
                amount: record.stake,
            })
            .collect();

        // Commit all bookkeeping before any external transfer.
        record.transition(MatchState::Cancelled)?;
        let released = record.held;
        record.held = Decimal::ZERO;
        self.held_total -= released;

        tracing::info!(match_id = %id, by = %caller, refunded = %released, "match cancelled");
        self.emit(EventKind::Cancelled {
            match_id: id,
            refunds: refunds.clone(),
        });

        for refund in refunds {
            self.pay_or_defer(id, refund.recipient, refund.amount);
        }
        Ok(())
    }

    /// Replace the oracle identity. Owner only.
    ///
    /// # Errors
    /// `NotAuthorized`, `InvalidParticipants` (nil replacement).
    pub fn rotate_oracle(&mut self, caller: PlayerId, new_oracle: PlayerId) -> Result<()> {
        if caller != self.config.owner {
            return Err(EscrowError::NotAuthorized(caller));
        }
        if new_oracle.is_nil() {
            return Err(EscrowError::InvalidParticipants {
                reason: "oracle identity is nil".to_string(),
            });
        }
        let previous = self.config.oracle;
        self.config.oracle = new_oracle;
        tracing::info!(%previous, next = %new_oracle, "oracle rotated");
        self.emit(EventKind::OracleRotated {
            previous,
            next: new_oracle,
        });
        Ok(())
    }

    /// Withdraw the caller's full pending credit.
    ///
    /// If the transfer fails again the credit is retained in full and the
    /// failure is surfaced; nothing is lost and nothing double-spends.
    ///
    /// # Errors
    /// `NoPendingCredit`, `TransferFailed`.
    pub fn withdraw_credit(&mut self, caller: PlayerId) -> Result<Decimal> {
        let amount = self
            .credits
            .take(caller)
            .ok_or(EscrowError::NoPendingCredit(caller))?;

        if let Err(err) = self.transfer.pay(caller, amount) {
            self.credits.add(caller, amount);
            return Err(EscrowError::TransferFailed {
                recipient: caller,
                amount,
                reason: err.reason,
            });
        }
        self.total_out += amount;

        tracing::info!(recipient = %caller, %amount, "credit withdrawn");
        self.emit(EventKind::CreditWithdrawn {
            recipient: caller,
            amount,
        });
        Ok(amount)
    }

    // =====================================================================
    // Read-only queries
    // =====================================================================

    /// Look up a match record.
    #[must_use]
    pub fn get(&self, id: MatchId) -> Option<&MatchRecord> {
        self.matches.get(&id)
    }

    /// Current lifecycle state of a match.
    #[must_use]
    pub fn state_of(&self, id: MatchId) -> Option<MatchState> {
        self.matches.get(&id).map(|r| r.state)
    }

    /// Held balance of a single match.
    #[must_use]
    pub fn held_of(&self, id: MatchId) -> Option<Decimal> {
        self.matches.get(&id).map(|r| r.held)
    }

    /// Engine-wide held balance across all matches.
    #[must_use]
    pub fn held_total(&self) -> Decimal {
        self.held_total
    }

    /// Pending credit of a recipient.
    #[must_use]
    pub fn credit_of(&self, player: PlayerId) -> Decimal {
        self.credits.balance_of(player)
    }

    /// Sum of all outstanding pending credits.
    #[must_use]
    pub fn credit_total(&self) -> Decimal {
        self.credits.total()
    }

    /// The configured oracle identity.
    #[must_use]
    pub fn oracle(&self) -> PlayerId {
        self.config.oracle
    }

    /// The configured owner identity.
    #[must_use]
    pub fn owner(&self) -> PlayerId {
        self.config.owner
    }

    /// Number of matches ever created (terminal records included).
    #[must_use]
    pub fn match_count(&self) -> usize {
        self.matches.len()
    }

    /// The notification log, in emission order.
    #[must_use]
    pub fn events(&self) -> &[EscrowEvent] {
        &self.events
    }

    /// Drain the notification log, handing events to a consumer.
    pub fn drain_events(&mut self) -> Vec<EscrowEvent> {
        std::mem::take(&mut self.events)
    }

    /// Access the transfer strategy.
    #[must_use]
    pub fn transfer(&self) -> &T {
        &self.transfer
    }

    /// Mutable access to the transfer strategy.
    pub fn transfer_mut(&mut self) -> &mut T {
        &mut self.transfer
    }

    /// Verify the holdings conservation invariant:
    ///
    /// ```text
    /// held_total == Σ match.held
    /// held_total + credit_total == total_in - total_out
    /// ```
    ///
    /// # Errors
    /// Returns [`EscrowError::HoldingsInvariantViolation`] on any breach.
    pub fn verify_holdings(&self) -> Result<()> {
        let per_match: Decimal = self.matches.values().map(|r| r.held).sum();
        if per_match != self.held_total {
            return Err(EscrowError::HoldingsInvariantViolation {
                reason: format!(
                    "held_total {} != sum of per-match held {per_match}",
                    self.held_total
                ),
            });
        }
        if let Some(bad) = self.matches.values().find(|r| !r.holdings_consistent()) {
            return Err(EscrowError::HoldingsInvariantViolation {
                reason: format!(
                    "match {} holds {} with flags {:?} at stake {}",
                    bad.id, bad.held, bad.deposited, bad.stake
                ),
            });
        }
        let retained = self.held_total + self.credits.total();
        let expected = self.total_in - self.total_out;
        if retained != expected {
            return Err(EscrowError::HoldingsInvariantViolation {
                reason: format!(
                    "retained {retained} != accepted {} - delivered {}",
                    self.total_in, self.total_out
                ),
            });
        }
        Ok(())
    }

    // =====================================================================
    // Internals
    // =====================================================================

    /// Deliver a payout, parking it as a pending credit if the recipient
    /// rejects. Called only after the owning operation's bookkeeping is
    /// committed; never fails the operation.
    fn pay_or_defer(&mut self, match_id: MatchId, recipient: PlayerId, amount: Decimal) {
        match self.transfer.pay(recipient, amount) {
            Ok(()) => self.total_out += amount,
            Err(err) => {
                tracing::warn!(
                    %match_id,
                    %recipient,
                    %amount,
                    reason = %err.reason,
                    "payout deferred to pending credit"
                );
                self.credits.add(recipient, amount);
                self.emit(EventKind::PayoutDeferred {
                    match_id,
                    recipient,
                    amount,
                });
            }
        }
    }

    fn emit(&mut self, kind: EventKind) {
        self.events.push(EscrowEvent::now(kind));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transfer::{CashLedger, TransferError};

    fn dec(n: i64) -> Decimal {
        Decimal::new(n, 0)
    }

    struct Harness {
        engine: EscrowEngine<CashLedger>,
        oracle: PlayerId,
        owner: PlayerId,
        alice: PlayerId,
        bob: PlayerId,
    }

    fn setup() -> Harness {
        let owner = PlayerId::new();
        let oracle = PlayerId::new();
        let config = EngineConfig::new(owner, oracle).unwrap();
        Harness {
            engine: EscrowEngine::new(config, CashLedger::new()),
            oracle,
            owner,
            alice: PlayerId::new(),
            bob: PlayerId::new(),
        }
    }

    fn funded_match(h: &mut Harness, stake: i64) -> MatchId {
        let id = MatchId::new();
        h.engine.create_match(id, h.alice, h.bob, dec(stake)).unwrap();
        h.engine.deposit(id, h.alice, dec(stake)).unwrap();
        h.engine.deposit(id, h.bob, dec(stake)).unwrap();
        id
    }

    // --- create_match -----------------------------------------------------

    #[test]
    fn create_match_records_awaiting() {
        let mut h = setup();
        let id = MatchId::new();
        h.engine.create_match(id, h.alice, h.bob, dec(10)).unwrap();

        let rec = h.engine.get(id).unwrap();
        assert_eq!(rec.state, MatchState::AwaitingDeposits);
        assert_eq!(rec.held, Decimal::ZERO);
        assert_eq!(rec.deposited, [false, false]);
        assert!(matches!(
            h.engine.events().last().unwrap().kind,
            EventKind::MatchCreated { .. }
        ));
    }

    #[test]
    fn duplicate_match_rejected() {
        let mut h = setup();
        let id = MatchId::new();
        h.engine.create_match(id, h.alice, h.bob, dec(10)).unwrap();
        let err = h
            .engine
            .create_match(id, h.alice, h.bob, dec(10))
            .unwrap_err();
        assert!(matches!(err, EscrowError::DuplicateMatch(d) if d == id));
    }

    #[test]
    fn identical_participants_rejected() {
        let mut h = setup();
        let err = h
            .engine
            .create_match(MatchId::new(), h.alice, h.alice, dec(10))
            .unwrap_err();
        assert!(matches!(err, EscrowError::InvalidParticipants { .. }));
    }

    #[test]
    fn nil_participant_rejected() {
        let mut h = setup();
        let err = h
            .engine
            .create_match(MatchId::new(), PlayerId::nil(), h.bob, dec(10))
            .unwrap_err();
        assert!(matches!(err, EscrowError::InvalidParticipants { .. }));
    }

    #[test]
    fn non_positive_stake_rejected() {
        let mut h = setup();
        for stake in [Decimal::ZERO, dec(-5)] {
            let err = h
                .engine
                .create_match(MatchId::new(), h.alice, h.bob, stake)
                .unwrap_err();
            assert!(matches!(err, EscrowError::InvalidStake { .. }));
        }
        assert_eq!(h.engine.match_count(), 0);
    }

    // --- deposit ----------------------------------------------------------

    #[test]
    fn first_deposit_stays_awaiting() {
        let mut h = setup();
        let id = MatchId::new();
        h.engine.create_match(id, h.alice, h.bob, dec(10)).unwrap();
        h.engine.deposit(id, h.alice, dec(10)).unwrap();

        let rec = h.engine.get(id).unwrap();
        assert_eq!(rec.state, MatchState::AwaitingDeposits);
        assert_eq!(rec.deposited, [true, false]);
        assert_eq!(rec.held, dec(10));
        assert_eq!(h.engine.held_total(), dec(10));
    }

    #[test]
    fn second_deposit_reaches_ready() {
        let mut h = setup();
        let id = funded_match(&mut h, 10);

        let rec = h.engine.get(id).unwrap();
        assert_eq!(rec.state, MatchState::Ready);
        assert_eq!(rec.held, dec(20));
        assert!(h
            .engine
            .events()
            .iter()
            .any(|e| matches!(e.kind, EventKind::MatchReady { match_id } if match_id == id)));
    }

    #[test]
    fn deposit_wrong_amount_rejected() {
        let mut h = setup();
        let id = MatchId::new();
        h.engine.create_match(id, h.alice, h.bob, dec(10)).unwrap();

        for value in [dec(9), dec(11), Decimal::ZERO] {
            let err = h.engine.deposit(id, h.alice, value).unwrap_err();
            assert!(matches!(err, EscrowError::WrongAmount { .. }));
        }
        // Held balance untouched by the rejections.
        assert_eq!(h.engine.held_of(id), Some(Decimal::ZERO));
        assert_eq!(h.engine.held_total(), Decimal::ZERO);
    }

    #[test]
    fn deposit_by_stranger_rejected() {
        let mut h = setup();
        let id = MatchId::new();
        h.engine.create_match(id, h.alice, h.bob, dec(10)).unwrap();
        let err = h.engine.deposit(id, PlayerId::new(), dec(10)).unwrap_err();
        assert!(matches!(err, EscrowError::NotAParticipant { .. }));
    }

    #[test]
    fn double_deposit_rejected() {
        let mut h = setup();
        let id = MatchId::new();
        h.engine.create_match(id, h.alice, h.bob, dec(10)).unwrap();
        h.engine.deposit(id, h.alice, dec(10)).unwrap();
        let err = h.engine.deposit(id, h.alice, dec(10)).unwrap_err();
        assert!(matches!(err, EscrowError::AlreadyDeposited(d) if d == id));
        assert_eq!(h.engine.held_of(id), Some(dec(10)));
    }

    #[test]
    fn deposit_on_unknown_match_rejected() {
        let mut h = setup();
        let err = h
            .engine
            .deposit(MatchId::new(), h.alice, dec(10))
            .unwrap_err();
        assert!(matches!(err, EscrowError::MatchNotFound(_)));
    }

    // --- submit_result ----------------------------------------------------

    #[test]
    fn decisive_outcome_pays_winner_full_pot() {
        let mut h = setup();
        let id = funded_match(&mut h, 10);
        let oracle = h.oracle;
        h.engine
            .submit_result(id, oracle, MatchOutcome::FirstWins)
            .unwrap();

        let rec = h.engine.get(id).unwrap();
        assert_eq!(rec.state, MatchState::Settled);
        assert_eq!(rec.outcome, Some(MatchOutcome::FirstWins));
        assert_eq!(rec.held, Decimal::ZERO);
        assert_eq!(h.engine.held_total(), Decimal::ZERO);
        assert_eq!(h.engine.transfer().balance_of(h.alice), dec(20));
        assert_eq!(h.engine.transfer().balance_of(h.bob), Decimal::ZERO);
    }

    #[test]
    fn draw_refunds_both_stakes() {
        let mut h = setup();
        let id = funded_match(&mut h, 10);
        let oracle = h.oracle;
        h.engine.submit_result(id, oracle, MatchOutcome::Draw).unwrap();

        assert_eq!(h.engine.transfer().balance_of(h.alice), dec(10));
        assert_eq!(h.engine.transfer().balance_of(h.bob), dec(10));
        assert_eq!(h.engine.held_total(), Decimal::ZERO);
    }

    #[test]
    fn non_oracle_cannot_settle() {
        let mut h = setup();
        let id = funded_match(&mut h, 10);
        for caller in [h.alice, h.owner, PlayerId::new()] {
            let err = h
                .engine
                .submit_result(id, caller, MatchOutcome::FirstWins)
                .unwrap_err();
            assert!(matches!(err, EscrowError::NotOracle(c) if c == caller));
        }
        assert_eq!(h.engine.state_of(id), Some(MatchState::Ready));
    }

    #[test]
    fn settle_before_ready_rejected() {
        let mut h = setup();
        let id = MatchId::new();
        h.engine.create_match(id, h.alice, h.bob, dec(5)).unwrap();
        h.engine.deposit(id, h.alice, dec(5)).unwrap();

        let oracle = h.oracle;
        let err = h
            .engine
            .submit_result(id, oracle, MatchOutcome::FirstWins)
            .unwrap_err();
        assert!(matches!(
            err,
            EscrowError::WrongState {
                expected: MatchState::Ready,
                actual: MatchState::AwaitingDeposits,
            }
        ));
    }

    #[test]
    fn double_settlement_rejected() {
        let mut h = setup();
        let id = funded_match(&mut h, 10);
        let oracle = h.oracle;
        h.engine
            .submit_result(id, oracle, MatchOutcome::SecondWins)
            .unwrap();
        let err = h
            .engine
            .submit_result(id, oracle, MatchOutcome::FirstWins)
            .unwrap_err();
        assert!(matches!(
            err,
            EscrowError::WrongState {
                actual: MatchState::Settled,
                ..
            }
        ));
        // The first settlement stands.
        assert_eq!(h.engine.transfer().balance_of(h.bob), dec(20));
    }

    // --- cancel_match -----------------------------------------------------

    #[test]
    fn cancel_refunds_sole_depositor() {
        let mut h = setup();
        let id = MatchId::new();
        h.engine.create_match(id, h.alice, h.bob, dec(5)).unwrap();
        h.engine.deposit(id, h.alice, dec(5)).unwrap();

        let alice = h.alice;
        h.engine.cancel_match(id, alice).unwrap();

        let rec = h.engine.get(id).unwrap();
        assert_eq!(rec.state, MatchState::Cancelled);
        assert_eq!(rec.held, Decimal::ZERO);
        assert_eq!(h.engine.transfer().balance_of(h.alice), dec(5));
        assert_eq!(h.engine.transfer().balance_of(h.bob), Decimal::ZERO);
        assert_eq!(h.engine.held_total(), Decimal::ZERO);
    }

    #[test]
    fn cancel_with_no_deposits_refunds_nothing() {
        let mut h = setup();
        let id = MatchId::new();
        h.engine.create_match(id, h.alice, h.bob, dec(5)).unwrap();
        let oracle = h.oracle;
        h.engine.cancel_match(id, oracle).unwrap();

        assert_eq!(h.engine.state_of(id), Some(MatchState::Cancelled));
        assert_eq!(h.engine.transfer().total(), Decimal::ZERO);
    }

    #[test]
    fn oracle_may_cancel_awaiting() {
        let mut h = setup();
        let id = MatchId::new();
        h.engine.create_match(id, h.alice, h.bob, dec(5)).unwrap();
        let oracle = h.oracle;
        assert!(h.engine.cancel_match(id, oracle).is_ok());
    }

    #[test]
    fn stranger_cannot_cancel() {
        let mut h = setup();
        let id = MatchId::new();
        h.engine.create_match(id, h.alice, h.bob, dec(5)).unwrap();
        let stranger = PlayerId::new();
        let err = h.engine.cancel_match(id, stranger).unwrap_err();
        assert!(matches!(err, EscrowError::NotAuthorized(c) if c == stranger));
    }

    #[test]
    fn ready_match_cannot_be_cancelled() {
        let mut h = setup();
        let id = funded_match(&mut h, 10);
        for caller in [h.alice, h.bob, h.oracle] {
            let err = h.engine.cancel_match(id, caller).unwrap_err();
            assert!(matches!(
                err,
                EscrowError::WrongState {
                    actual: MatchState::Ready,
                    ..
                }
            ));
        }
        // Pot still locked.
        assert_eq!(h.engine.held_of(id), Some(dec(20)));
    }

    #[test]
    fn terminal_states_reject_everything() {
        let mut h = setup();
        let id = funded_match(&mut h, 10);
        let (oracle, alice) = (h.oracle, h.alice);
        h.engine.submit_result(id, oracle, MatchOutcome::Draw).unwrap();

        assert!(matches!(
            h.engine.deposit(id, alice, dec(10)).unwrap_err(),
            EscrowError::WrongState { .. }
        ));
        assert!(matches!(
            h.engine
                .submit_result(id, oracle, MatchOutcome::Draw)
                .unwrap_err(),
            EscrowError::WrongState { .. }
        ));
        assert!(matches!(
            h.engine.cancel_match(id, alice).unwrap_err(),
            EscrowError::WrongState { .. }
        ));

        // Same for Cancelled.
        let id2 = MatchId::new();
        h.engine.create_match(id2, h.alice, h.bob, dec(5)).unwrap();
        h.engine.cancel_match(id2, alice).unwrap();
        assert!(matches!(
            h.engine
                .submit_result(id2, oracle, MatchOutcome::FirstWins)
                .unwrap_err(),
            EscrowError::WrongState {
                actual: MatchState::Cancelled,
                ..
            }
        ));
    }

    // --- oracle rotation --------------------------------------------------

    #[test]
    fn owner_rotates_oracle() {
        let mut h = setup();
        let (owner, old_oracle) = (h.owner, h.oracle);
        let new_oracle = PlayerId::new();
        h.engine.rotate_oracle(owner, new_oracle).unwrap();
        assert_eq!(h.engine.oracle(), new_oracle);

        // Old oracle loses the capability, new one gains it.
        let id = funded_match(&mut h, 10);
        assert!(matches!(
            h.engine
                .submit_result(id, old_oracle, MatchOutcome::Draw)
                .unwrap_err(),
            EscrowError::NotOracle(_)
        ));
        assert!(h
            .engine
            .submit_result(id, new_oracle, MatchOutcome::Draw)
            .is_ok());
    }

    #[test]
    fn non_owner_cannot_rotate() {
        let mut h = setup();
        for caller in [h.oracle, h.alice, PlayerId::new()] {
            let err = h.engine.rotate_oracle(caller, PlayerId::new()).unwrap_err();
            assert!(matches!(err, EscrowError::NotAuthorized(_)));
        }
    }

    #[test]
    fn nil_oracle_rejected() {
        let mut h = setup();
        let owner = h.owner;
        let err = h.engine.rotate_oracle(owner, PlayerId::nil()).unwrap_err();
        assert!(matches!(err, EscrowError::InvalidParticipants { .. }));
    }

    // --- failed payouts / credits ----------------------------------------

    /// Transfer strategy that rejects payouts to a configured blocklist.
    struct Blocklist {
        inner: CashLedger,
        blocked: Vec<PlayerId>,
    }

    impl ValueTransfer for Blocklist {
        fn pay(
            &mut self,
            recipient: PlayerId,
            amount: Decimal,
        ) -> std::result::Result<(), TransferError> {
            if self.blocked.contains(&recipient) {
                return Err(TransferError::new("recipient rejects payment"));
            }
            self.inner.pay(recipient, amount)
        }
    }

    fn blocklist_engine(blocked: Vec<PlayerId>) -> (EscrowEngine<Blocklist>, PlayerId, PlayerId) {
        let owner = PlayerId::new();
        let oracle = PlayerId::new();
        let config = EngineConfig::new(owner, oracle).unwrap();
        let transfer = Blocklist {
            inner: CashLedger::new(),
            blocked,
        };
        (EscrowEngine::new(config, transfer), owner, oracle)
    }

    #[test]
    fn failed_payout_becomes_credit_without_reverting() {
        let alice = PlayerId::new();
        let bob = PlayerId::new();
        let (mut engine, _owner, oracle) = blocklist_engine(vec![alice]);

        let id = MatchId::new();
        engine.create_match(id, alice, bob, dec(10)).unwrap();
        engine.deposit(id, alice, dec(10)).unwrap();
        engine.deposit(id, bob, dec(10)).unwrap();
        engine
            .submit_result(id, oracle, MatchOutcome::Draw)
            .unwrap();

        // Settlement committed even though alice's leg failed.
        assert_eq!(engine.state_of(id), Some(MatchState::Settled));
        assert_eq!(engine.transfer().inner.balance_of(bob), dec(10));
        assert_eq!(engine.credit_of(alice), dec(10));
        assert!(engine
            .events()
            .iter()
            .any(|e| matches!(e.kind, EventKind::PayoutDeferred { recipient, .. } if recipient == alice)));
        engine.verify_holdings().unwrap();
    }

    #[test]
    fn credit_withdrawal_after_unblock() {
        let alice = PlayerId::new();
        let bob = PlayerId::new();
        let (mut engine, _owner, oracle) = blocklist_engine(vec![alice]);

        let id = MatchId::new();
        engine.create_match(id, alice, bob, dec(10)).unwrap();
        engine.deposit(id, alice, dec(10)).unwrap();
        engine.deposit(id, bob, dec(10)).unwrap();
        engine
            .submit_result(id, oracle, MatchOutcome::FirstWins)
            .unwrap();
        assert_eq!(engine.credit_of(alice), dec(20));

        // Still blocked: withdrawal fails, credit retained.
        let err = engine.withdraw_credit(alice).unwrap_err();
        assert!(matches!(err, EscrowError::TransferFailed { .. }));
        assert_eq!(engine.credit_of(alice), dec(20));

        engine.transfer_mut().blocked.clear();
        let amount = engine.withdraw_credit(alice).unwrap();
        assert_eq!(amount, dec(20));
        assert_eq!(engine.credit_of(alice), Decimal::ZERO);
        assert_eq!(engine.transfer().inner.balance_of(alice), dec(20));
        engine.verify_holdings().unwrap();
    }

    #[test]
    fn withdraw_without_credit_rejected() {
        let mut h = setup();
        let alice = h.alice;
        let err = h.engine.withdraw_credit(alice).unwrap_err();
        assert!(matches!(err, EscrowError::NoPendingCredit(c) if c == alice));
    }

    // --- conservation -----------------------------------------------------

    #[test]
    fn holdings_conserved_through_lifecycle() {
        let mut h = setup();
        h.engine.verify_holdings().unwrap();

        let id = MatchId::new();
        h.engine.create_match(id, h.alice, h.bob, dec(10)).unwrap();
        h.engine.verify_holdings().unwrap();

        let (alice, bob, oracle) = (h.alice, h.bob, h.oracle);
        h.engine.deposit(id, alice, dec(10)).unwrap();
        h.engine.verify_holdings().unwrap();

        h.engine.deposit(id, bob, dec(10)).unwrap();
        h.engine.verify_holdings().unwrap();

        h.engine
            .submit_result(id, oracle, MatchOutcome::SecondWins)
            .unwrap();
        h.engine.verify_holdings().unwrap();
        assert_eq!(h.engine.held_total(), Decimal::ZERO);
    }
}
